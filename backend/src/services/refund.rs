//! Refund service
//!
//! Refunds are requested against a bill and decided by an admin. Stock comes
//! back only on approval.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    plan_full_refund, plan_partial_refund, validate_admin_remarks, PaymentCategory,
    RefundRequestLine, RefundStatus, RefundType, SoldLine,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use super::stock;
use crate::error::{AppError, AppResult};

/// Refund service
#[derive(Clone)]
pub struct RefundService {
    db: PgPool,
}

/// Refund record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Refund {
    pub id: i64,
    pub client_id: i64,
    pub refund_no: String,
    pub sale_id: i64,
    #[sqlx(try_from = "String")]
    pub refund_type: RefundType,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_category: PaymentCategory,
    pub reason: String,
    pub reason_notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: RefundStatus,
    pub requested_by: Option<i64>,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub admin_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Refund line record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RefundItem {
    pub id: i64,
    pub refund_id: i64,
    pub sale_item_id: i64,
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Refund with its lines
#[derive(Debug, Clone, Serialize)]
pub struct RefundWithItems {
    #[serde(flatten)]
    pub refund: Refund,
    pub items: Vec<RefundItem>,
}

/// Input for requesting a refund
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRefundInput {
    pub bill_id: i64,
    pub refund_type: RefundType,
    /// Required for PARTIAL refunds
    pub items: Option<Vec<RefundItemInput>>,
    #[validate(length(min = 1, max = 255, message = "Reason is required"))]
    pub reason: String,
    pub reason_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundItemInput {
    pub sale_item_id: i64,
    pub quantity: i32,
}

/// Input for rejecting a refund
#[derive(Debug, Deserialize)]
pub struct RejectRefundInput {
    pub admin_remarks: Option<String>,
}

#[derive(Debug, FromRow)]
struct LockedSale {
    id: i64,
    grand_total: Decimal,
    #[sqlx(try_from = "String")]
    payment_category: PaymentCategory,
}

#[derive(Debug, FromRow)]
struct SoldRow {
    id: i64,
    medicine_id: i64,
    batch_number: String,
    quantity: i32,
    unit_price: Decimal,
}

const REFUND_COLUMNS: &str = "id, client_id, refund_no, sale_id, refund_type, amount, \
                              payment_category, reason, reason_notes, status, requested_by, \
                              decided_by, decided_at, admin_remarks, created_at";

fn refund_number(id: i64) -> String {
    format!("REF-{:06}", id)
}

impl RefundService {
    /// Create a new RefundService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Request a refund against a bill.
    ///
    /// Partial quantities are checked against what was sold less what pending
    /// or approved refunds already claim. Nothing is stored when any line fails.
    #[tracing::instrument(skip(self, input), fields(bill_id = input.bill_id, refund_type = %input.refund_type))]
    pub async fn create_refund(
        &self,
        client_id: i64,
        user_id: i64,
        input: CreateRefundInput,
    ) -> AppResult<RefundWithItems> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        // Serializes refund requests for the same bill
        let sale = sqlx::query_as::<_, LockedSale>(
            "SELECT id, grand_total, payment_category FROM sales WHERE id = $1 AND client_id = $2 FOR UPDATE",
        )
        .bind(input.bill_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Bill".to_string()))?;

        let sold: Vec<SoldLine> = sqlx::query_as::<_, SoldRow>(
            r#"
            SELECT id, medicine_id, batch_number, quantity, unit_price
            FROM sale_items
            WHERE sale_id = $1
            ORDER BY id
            "#,
        )
        .bind(sale.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| SoldLine {
            sale_item_id: row.id,
            medicine_id: row.medicine_id,
            batch_number: row.batch_number,
            quantity: row.quantity,
            unit_price: row.unit_price,
        })
        .collect();

        let claimed = claimed_quantities(&mut tx, sale.id).await?;

        let plan = match input.refund_type {
            RefundType::Full => plan_full_refund(&sold, sale.grand_total, &claimed)?,
            RefundType::Partial => {
                let requested: Vec<RefundRequestLine> = input
                    .items
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|i| RefundRequestLine {
                        sale_item_id: i.sale_item_id,
                        quantity: i.quantity,
                    })
                    .collect();
                plan_partial_refund(&sold, &requested, &claimed)?
            }
        };

        let refund_id = sqlx::query_scalar::<_, i64>(
            "SELECT nextval(pg_get_serial_sequence('refunds', 'id'))",
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO refunds (id, client_id, refund_no, sale_id, refund_type, amount,
                                 payment_category, reason, reason_notes, status, requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDING', $10)
            "#,
        )
        .bind(refund_id)
        .bind(client_id)
        .bind(refund_number(refund_id))
        .bind(sale.id)
        .bind(plan.refund_type.as_str())
        .bind(plan.amount)
        .bind(sale.payment_category.as_str())
        .bind(input.reason.trim())
        .bind(&input.reason_notes)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        for line in &plan.lines {
            sqlx::query(
                r#"
                INSERT INTO refund_items (refund_id, sale_item_id, medicine_id, batch_number,
                                          quantity, unit_price, amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(refund_id)
            .bind(line.sale_item_id)
            .bind(line.medicine_id)
            .bind(&line.batch_number)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(refund_id, sale_id = sale.id, amount = %plan.amount, "Refund requested");

        self.get_refund(client_id, refund_id).await
    }

    /// Approve a pending refund and put its quantities back into stock
    #[tracing::instrument(skip(self))]
    pub async fn approve_refund(
        &self,
        client_id: i64,
        admin_id: i64,
        refund_id: i64,
    ) -> AppResult<RefundWithItems> {
        let mut tx = self.db.begin().await?;

        let status = lock_refund_status(&mut tx, client_id, refund_id).await?;
        let next = status.transition(RefundStatus::Approved)?;

        mark_decided(&mut tx, refund_id, next, admin_id, None).await?;

        let items = load_items(&mut tx, refund_id).await?;
        for item in &items {
            stock::restock(
                &mut tx,
                client_id,
                item.medicine_id,
                &item.batch_number,
                i64::from(item.quantity),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(refund_id, lines = items.len(), "Refund approved and stock restored");

        self.get_refund(client_id, refund_id).await
    }

    /// Reject a pending refund; the admin must say why
    #[tracing::instrument(skip(self, input))]
    pub async fn reject_refund(
        &self,
        client_id: i64,
        admin_id: i64,
        refund_id: i64,
        input: RejectRefundInput,
    ) -> AppResult<RefundWithItems> {
        let remarks = validate_admin_remarks(input.admin_remarks.as_deref())?;

        let mut tx = self.db.begin().await?;

        let status = lock_refund_status(&mut tx, client_id, refund_id).await?;
        let next = status.transition(RefundStatus::Rejected)?;

        mark_decided(&mut tx, refund_id, next, admin_id, Some(remarks)).await?;

        tx.commit().await?;

        tracing::info!(refund_id, "Refund rejected");

        self.get_refund(client_id, refund_id).await
    }

    /// Get a refund with its lines
    pub async fn get_refund(&self, client_id: i64, refund_id: i64) -> AppResult<RefundWithItems> {
        let refund = sqlx::query_as::<_, Refund>(&format!(
            "SELECT {} FROM refunds WHERE id = $1 AND client_id = $2",
            REFUND_COLUMNS
        ))
        .bind(refund_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Refund".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let items = load_items(&mut conn, refund_id).await?;

        Ok(RefundWithItems { refund, items })
    }
}

/// Quantities per sale item already held by pending or approved refunds
#[derive(Debug, FromRow)]
struct ClaimedRow {
    sale_item_id: i64,
    #[sqlx(try_from = "String")]
    status: RefundStatus,
    quantity: i64,
}

async fn claimed_quantities(
    conn: &mut PgConnection,
    sale_id: i64,
) -> AppResult<HashMap<i64, i32>> {
    let rows = sqlx::query_as::<_, ClaimedRow>(
        r#"
        SELECT ri.sale_item_id, r.status, SUM(ri.quantity)::BIGINT AS quantity
        FROM refund_items ri
        JOIN refunds r ON r.id = ri.refund_id
        WHERE r.sale_id = $1
        GROUP BY ri.sale_item_id, r.status
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut claimed: HashMap<i64, i64> = HashMap::new();
    for row in rows.into_iter().filter(|r| r.status.holds_quantity()) {
        *claimed.entry(row.sale_item_id).or_insert(0) += row.quantity;
    }

    claimed
        .into_iter()
        .map(|(sale_item_id, quantity)| {
            i32::try_from(quantity)
                .map(|q| (sale_item_id, q))
                .map_err(|_| AppError::Internal("Refunded quantity out of range".to_string()))
        })
        .collect()
}

async fn lock_refund_status(
    conn: &mut PgConnection,
    client_id: i64,
    refund_id: i64,
) -> AppResult<RefundStatus> {
    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM refunds WHERE id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(refund_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Refund".to_string()))?;

    Ok(status.parse()?)
}

async fn mark_decided(
    conn: &mut PgConnection,
    refund_id: i64,
    status: RefundStatus,
    admin_id: i64,
    admin_remarks: Option<&str>,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE refunds
        SET status = $1, decided_by = $2, decided_at = NOW(),
            admin_remarks = COALESCE($3, admin_remarks)
        WHERE id = $4 AND status = 'PENDING'
        "#,
    )
    .bind(status.as_str())
    .bind(admin_id)
    .bind(admin_remarks)
    .bind(refund_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvalidStateTransition(
            "Refund is no longer pending".to_string(),
        ));
    }
    Ok(())
}

async fn load_items(conn: &mut PgConnection, refund_id: i64) -> AppResult<Vec<RefundItem>> {
    let items = sqlx::query_as::<_, RefundItem>(
        r#"
        SELECT id, refund_id, sale_item_id, medicine_id, batch_number, quantity, unit_price, amount
        FROM refund_items
        WHERE refund_id = $1
        ORDER BY id
        "#,
    )
    .bind(refund_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_number_is_zero_padded() {
        assert_eq!(refund_number(42), "REF-000042");
        assert_eq!(refund_number(1234567), "REF-1234567");
    }
}
