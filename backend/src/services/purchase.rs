//! Purchase (GRN) service
//!
//! Saving a GRN as CONFIRMED receives every line into stock, re-blends the
//! medicine's weighted-average cost and books the unpaid part on the supplier
//! ledger. All of it happens in the same transaction as the header and item
//! writes.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    check_return_quantities, purchase_due, received_qty, return_total, validate_money_scale,
    LedgerPosting, PaymentType, PurchaseStatus, ReturnRequestLine, ReturnableLine,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use super::stock::{self, BatchReceipt};
use super::supplier_ledger::append_entry;
use super::{batch_key, document_number, line_quantity};
use crate::error::{AppError, AppResult};

/// Purchase service for GRNs and purchase returns
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Purchase header record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: i64,
    pub client_id: i64,
    pub grn_no: String,
    pub supplier_id: i64,
    pub invoice_no: Option<String>,
    pub purchase_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub payment_type: PaymentType,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase line record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: i64,
    pub medicine_id: i64,
    pub batch_no: String,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub qty: i32,
    pub free_qty: i32,
    pub purchase_rate: Decimal,
    pub mrp: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

/// Purchase with its lines
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

/// Input for saving a GRN
#[derive(Debug, Deserialize, Validate)]
pub struct SavePurchaseInput {
    #[validate(length(min = 1, max = 100, message = "GRN number must be 1-100 characters"))]
    pub grn_no: Option<String>,
    pub supplier_id: i64,
    pub invoice_no: Option<String>,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount_total: Decimal,
    #[serde(default)]
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<PurchaseItemInput>,
}

/// One GRN line
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PurchaseItemInput {
    pub medicine_id: i64,
    #[validate(length(min = 1, max = 50, message = "Batch number is required"))]
    pub batch_no: String,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub qty: i32,
    #[serde(default)]
    pub free_qty: i32,
    #[serde(default)]
    pub purchase_rate: Decimal,
    #[serde(default)]
    pub mrp: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub line_total: Option<Decimal>,
}

/// Result of saving a GRN
#[derive(Debug, Clone, Serialize)]
pub struct SavePurchaseResult {
    pub purchase_id: i64,
    pub grn_no: String,
    pub status: PurchaseStatus,
}

/// Input for returning goods to the supplier
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseReturnInput {
    pub purchase_id: i64,
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<PurchaseReturnItemInput>,
}

/// One returned line
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PurchaseReturnItemInput {
    pub medicine_id: i64,
    #[validate(length(min = 1, max = 50, message = "Batch number is required"))]
    pub batch_no: String,
    #[validate(range(min = 1, message = "Return quantity must be greater than zero"))]
    pub qty: i32,
    #[serde(default)]
    pub rate: Decimal,
    pub line_total: Option<Decimal>,
}

/// Result of a purchase return
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReturnResult {
    pub return_id: i64,
    pub return_no: String,
    pub total_amount: Decimal,
}

#[derive(Debug, FromRow)]
struct LockedPurchase {
    id: i64,
    grn_no: String,
    supplier_id: i64,
    #[sqlx(try_from = "String")]
    status: PurchaseStatus,
}

#[derive(Debug, FromRow)]
struct QuantityByBatch {
    medicine_id: i64,
    batch_no: String,
    quantity: i64,
}

const PURCHASE_COLUMNS: &str = "id, client_id, grn_no, supplier_id, invoice_no, purchase_date, \
                                payment_type, subtotal, discount_total, tax_total, grand_total, \
                                paid_amount, status, notes, created_by, confirmed_at, created_at, \
                                updated_at";

fn generate_grn_no() -> String {
    document_number("GRN")
}

fn generate_return_no() -> String {
    document_number("PR")
}

/// Line total as sent, or rate times paid quantity
fn purchase_line_total(item: &PurchaseItemInput) -> Decimal {
    item.line_total.unwrap_or_else(|| Decimal::from(item.qty) * item.purchase_rate)
}

/// Reject malformed GRN input before any transaction opens
fn validate_purchase_input(input: &SavePurchaseInput) -> AppResult<Decimal> {
    input.validate()?;
    for item in &input.items {
        item.validate()?;
        batch_key(&item.batch_no)?;
        received_qty(item.qty, item.free_qty)?;
        for (field, value) in [
            ("purchase_rate", item.purchase_rate),
            ("mrp", item.mrp),
            ("discount_amount", item.discount_amount),
            ("tax_amount", item.tax_amount),
        ] {
            if value < Decimal::ZERO {
                return Err(AppError::validation(field, "Amount cannot be negative"));
            }
        }
        if let (Some(mfg), Some(expiry)) = (item.mfg_date, item.expiry_date) {
            if expiry < mfg {
                return Err(AppError::validation(
                    "expiry_date",
                    "Expiry date cannot be before manufacturing date",
                ));
            }
        }
    }
    for (field, value) in [
        ("subtotal", input.subtotal),
        ("discount_total", input.discount_total),
        ("tax_total", input.tax_total),
        ("grand_total", input.grand_total),
        ("paid_amount", input.paid_amount),
    ] {
        validate_money_scale(value).map_err(|msg| AppError::validation(field, msg))?;
    }
    Ok(purchase_due(input.grand_total, input.paid_amount)?)
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Save a GRN, replacing its lines, and apply stock, cost and ledger
    /// effects when it is saved as CONFIRMED.
    #[tracing::instrument(skip(self, input), fields(grn_no = ?input.grn_no, status = %input.status))]
    pub async fn save_purchase(
        &self,
        client_id: i64,
        user_id: i64,
        input: SavePurchaseInput,
    ) -> AppResult<SavePurchaseResult> {
        let due = validate_purchase_input(&input)?;
        let grn_no = input
            .grn_no
            .clone()
            .map(|g| g.trim().to_string())
            .unwrap_or_else(generate_grn_no);

        let mut tx = self.db.begin().await?;

        let supplier_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vendors WHERE id = $1 AND client_id = $2)",
        )
        .bind(input.supplier_id)
        .bind(client_id)
        .fetch_one(&mut *tx)
        .await?;

        if !supplier_exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        let existing = sqlx::query_as::<_, LockedPurchase>(
            r#"
            SELECT id, grn_no, supplier_id, status
            FROM purchases
            WHERE grn_no = $1 AND client_id = $2
            FOR UPDATE
            "#,
        )
        .bind(&grn_no)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?;

        let purchase_id = match existing {
            Some(current) => {
                current.status.ensure_can_save_as(input.status)?;

                // Conditional on DRAFT so a concurrent confirmation cannot be applied twice
                let result = sqlx::query(
                    r#"
                    UPDATE purchases
                    SET supplier_id = $1, invoice_no = $2, purchase_date = $3, payment_type = $4,
                        subtotal = $5, discount_total = $6, tax_total = $7, grand_total = $8,
                        paid_amount = $9, status = $10, notes = $11,
                        confirmed_at = CASE WHEN $10 = 'CONFIRMED' THEN NOW() END,
                        updated_at = NOW()
                    WHERE id = $12 AND client_id = $13 AND status = 'DRAFT'
                    "#,
                )
                .bind(input.supplier_id)
                .bind(&input.invoice_no)
                .bind(input.purchase_date)
                .bind(input.payment_type.as_str())
                .bind(input.subtotal)
                .bind(input.discount_total)
                .bind(input.tax_total)
                .bind(input.grand_total)
                .bind(input.paid_amount)
                .bind(input.status.as_str())
                .bind(&input.notes)
                .bind(current.id)
                .bind(client_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::InvalidStateTransition(format!(
                        "GRN {} is no longer a draft",
                        current.grn_no
                    )));
                }

                sqlx::query("DELETE FROM purchase_items WHERE purchase_id = $1")
                    .bind(current.id)
                    .execute(&mut *tx)
                    .await?;

                current.id
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO purchases (client_id, grn_no, supplier_id, invoice_no, purchase_date,
                                           payment_type, subtotal, discount_total, tax_total,
                                           grand_total, paid_amount, status, notes, created_by,
                                           confirmed_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                            CASE WHEN $12 = 'CONFIRMED' THEN NOW() END)
                    RETURNING id
                    "#,
                )
                .bind(client_id)
                .bind(&grn_no)
                .bind(input.supplier_id)
                .bind(&input.invoice_no)
                .bind(input.purchase_date)
                .bind(input.payment_type.as_str())
                .bind(input.subtotal)
                .bind(input.discount_total)
                .bind(input.tax_total)
                .bind(input.grand_total)
                .bind(input.paid_amount)
                .bind(input.status.as_str())
                .bind(&input.notes)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let mut item_ids = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let item_id = insert_purchase_item(&mut tx, purchase_id, item).await?;
            item_ids.push(item_id);
        }

        if input.status.applies_effects() {
            // Medicines are locked in id order so concurrent GRNs cannot deadlock
            let mut order: Vec<usize> = (0..input.items.len()).collect();
            order.sort_by_key(|&i| input.items[i].medicine_id);
            for i in order {
                receive_item(&mut tx, client_id, input.supplier_id, &input.items[i], item_ids[i])
                    .await?;
            }

            let posting = LedgerPosting::purchase(due, &grn_no, input.invoice_no.as_deref());
            append_entry(&mut tx, client_id, input.supplier_id, &posting, Some(user_id)).await?;
        }

        tx.commit().await?;

        if input.status.applies_effects() {
            tracing::info!(
                purchase_id,
                grn_no = %grn_no,
                items = input.items.len(),
                %due,
                "GRN confirmed"
            );
        } else {
            tracing::debug!(purchase_id, grn_no = %grn_no, "GRN saved");
        }

        Ok(SavePurchaseResult {
            purchase_id,
            grn_no,
            status: input.status,
        })
    }

    /// Get a purchase with its lines
    pub async fn get_purchase(
        &self,
        client_id: i64,
        purchase_id: i64,
    ) -> AppResult<PurchaseWithItems> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases WHERE id = $1 AND client_id = $2",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, medicine_id, batch_no, mfg_date, expiry_date, qty, free_qty,
                   purchase_rate, mrp, discount_amount, tax_amount, line_total
            FROM purchase_items
            WHERE purchase_id = $1
            ORDER BY id
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseWithItems { purchase, items })
    }

    /// Send goods from a confirmed GRN back to the supplier.
    ///
    /// Stock is taken out of the named batches and the return value is debited
    /// on the supplier ledger. If any batch cannot cover its line nothing is
    /// written.
    #[tracing::instrument(skip(self, input), fields(purchase_id = input.purchase_id))]
    pub async fn return_purchase(
        &self,
        client_id: i64,
        user_id: i64,
        input: PurchaseReturnInput,
    ) -> AppResult<PurchaseReturnResult> {
        input.validate()?;
        let mut requested = Vec::with_capacity(input.items.len());
        for item in &input.items {
            item.validate()?;
            line_quantity(item.qty)?;
            requested.push(ReturnRequestLine {
                medicine_id: item.medicine_id,
                batch_no: batch_key(&item.batch_no)?.to_string(),
                qty: item.qty,
            });
        }

        let line_totals: Vec<Decimal> = input
            .items
            .iter()
            .map(|i| i.line_total.unwrap_or_else(|| Decimal::from(i.qty) * i.rate))
            .collect();
        let total_amount = return_total(&line_totals)?;

        let mut tx = self.db.begin().await?;

        let purchase = sqlx::query_as::<_, LockedPurchase>(
            r#"
            SELECT id, grn_no, supplier_id, status
            FROM purchases
            WHERE id = $1 AND client_id = $2
            FOR UPDATE
            "#,
        )
        .bind(input.purchase_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        if purchase.status != PurchaseStatus::Confirmed {
            return Err(AppError::InvalidStateTransition(format!(
                "Only confirmed GRNs can be returned; {} is {}",
                purchase.grn_no, purchase.status
            )));
        }

        let returnable = load_returnable(&mut tx, purchase.id).await?;
        check_return_quantities(&returnable, &requested)?;

        let return_no = generate_return_no();
        let return_date = input.return_date.unwrap_or_else(|| Utc::now().date_naive());

        let return_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO purchase_returns (client_id, return_no, purchase_id, supplier_id,
                                          return_date, total_amount, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(&return_no)
        .bind(purchase.id)
        .bind(purchase.supplier_id)
        .bind(return_date)
        .bind(total_amount)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for ((item, line), line_total) in input.items.iter().zip(&requested).zip(&line_totals) {
            sqlx::query(
                r#"
                INSERT INTO purchase_return_items (return_id, medicine_id, batch_no, qty, rate,
                                                   line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(return_id)
            .bind(line.medicine_id)
            .bind(&line.batch_no)
            .bind(line.qty)
            .bind(item.rate)
            .bind(line_total)
            .execute(&mut *tx)
            .await?;

            stock::deduct(
                &mut tx,
                client_id,
                line.medicine_id,
                &line.batch_no,
                i64::from(line.qty),
            )
            .await?;
        }

        let posting = LedgerPosting::purchase_return(total_amount, &return_no, &purchase.grn_no);
        append_entry(&mut tx, client_id, purchase.supplier_id, &posting, Some(user_id)).await?;

        tx.commit().await?;

        tracing::info!(
            return_id,
            return_no = %return_no,
            grn_no = %purchase.grn_no,
            %total_amount,
            "Purchase return recorded"
        );

        Ok(PurchaseReturnResult {
            return_id,
            return_no,
            total_amount,
        })
    }
}

async fn insert_purchase_item(
    conn: &mut PgConnection,
    purchase_id: i64,
    item: &PurchaseItemInput,
) -> AppResult<i64> {
    let item_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO purchase_items (purchase_id, medicine_id, batch_no, mfg_date, expiry_date,
                                    qty, free_qty, purchase_rate, mrp, discount_amount,
                                    tax_amount, line_total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(purchase_id)
    .bind(item.medicine_id)
    .bind(item.batch_no.trim())
    .bind(item.mfg_date)
    .bind(item.expiry_date)
    .bind(item.qty)
    .bind(item.free_qty)
    .bind(item.purchase_rate)
    .bind(item.mrp)
    .bind(item.discount_amount)
    .bind(item.tax_amount)
    .bind(purchase_line_total(item))
    .fetch_one(&mut *conn)
    .await?;

    Ok(item_id)
}

/// Receive one confirmed line: blend cost under lock, then add to its batch
async fn receive_item(
    conn: &mut PgConnection,
    client_id: i64,
    supplier_id: i64,
    item: &PurchaseItemInput,
    purchase_item_id: i64,
) -> AppResult<()> {
    let received = received_qty(item.qty, item.free_qty)?;

    let snapshot = stock::lock_cost_snapshot(&mut *conn, client_id, item.medicine_id).await?;
    let update = snapshot.receive(received, item.purchase_rate);

    stock::store_cost(
        &mut *conn,
        client_id,
        item.medicine_id,
        update.avg_cost,
        update.last_purchase_rate,
    )
    .await?;

    let batch = stock::receive_batch(
        &mut *conn,
        client_id,
        &BatchReceipt {
            medicine_id: item.medicine_id,
            batch_number: item.batch_no.trim(),
            expiry_date: item.expiry_date,
            mfg_date: item.mfg_date,
            quantity: received,
            purchase_price: item.purchase_rate,
            selling_price: item.mrp,
            vendor_id: Some(supplier_id),
            purchase_item_id: Some(purchase_item_id),
        },
    )
    .await?;

    tracing::debug!(
        medicine_id = item.medicine_id,
        stock_id = batch.id,
        received,
        old_stock = snapshot.stock_on_hand,
        old_avg_cost = %snapshot.avg_cost,
        new_avg_cost = %update.avg_cost,
        "Purchase line received"
    );

    Ok(())
}

/// Received and already-returned quantities per medicine batch of a GRN
async fn load_returnable(
    conn: &mut PgConnection,
    purchase_id: i64,
) -> AppResult<Vec<ReturnableLine>> {
    let received = sqlx::query_as::<_, QuantityByBatch>(
        r#"
        SELECT medicine_id, batch_no, SUM(qty + free_qty)::BIGINT AS quantity
        FROM purchase_items
        WHERE purchase_id = $1
        GROUP BY medicine_id, batch_no
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    let returned = sqlx::query_as::<_, QuantityByBatch>(
        r#"
        SELECT ri.medicine_id, ri.batch_no, SUM(ri.qty)::BIGINT AS quantity
        FROM purchase_return_items ri
        JOIN purchase_returns r ON r.id = ri.return_id
        WHERE r.purchase_id = $1
        GROUP BY ri.medicine_id, ri.batch_no
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    let returned: HashMap<(i64, String), i64> = returned
        .into_iter()
        .map(|r| ((r.medicine_id, r.batch_no), r.quantity))
        .collect();

    Ok(received
        .into_iter()
        .map(|r| ReturnableLine {
            returned: returned
                .get(&(r.medicine_id, r.batch_no.clone()))
                .copied()
                .unwrap_or(0),
            medicine_id: r.medicine_id,
            batch_no: r.batch_no,
            received: r.quantity,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(qty: i32, free_qty: i32) -> PurchaseItemInput {
        PurchaseItemInput {
            medicine_id: 1,
            batch_no: "B001".to_string(),
            mfg_date: None,
            expiry_date: None,
            qty,
            free_qty,
            purchase_rate: dec("50"),
            mrp: dec("65"),
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            line_total: None,
        }
    }

    fn input(items: Vec<PurchaseItemInput>) -> SavePurchaseInput {
        SavePurchaseInput {
            grn_no: None,
            supplier_id: 1,
            invoice_no: Some("INV-1".to_string()),
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            payment_type: PaymentType::Credit,
            subtotal: dec("5000"),
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            grand_total: dec("5000"),
            paid_amount: dec("1000"),
            status: PurchaseStatus::Confirmed,
            notes: None,
            items,
        }
    }

    #[test]
    fn test_valid_input_returns_due() {
        assert_eq!(validate_purchase_input(&input(vec![item(100, 0)])).unwrap(), dec("4000"));
    }

    #[test]
    fn test_empty_line_rejected() {
        assert!(validate_purchase_input(&input(vec![item(0, 0)])).is_err());
        assert!(validate_purchase_input(&input(vec![item(-5, 10)])).is_err());
        assert!(validate_purchase_input(&input(vec![])).is_err());
    }

    #[test]
    fn test_blank_batch_number_rejected() {
        let mut line = item(10, 0);
        line.batch_no = "   ".to_string();
        assert!(matches!(
            validate_purchase_input(&input(vec![line])),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_expiry_before_mfg_rejected() {
        let mut line = item(10, 0);
        line.mfg_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        line.expiry_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(validate_purchase_input(&input(vec![line])).is_err());
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut grn = input(vec![item(1, 0)]);
        grn.paid_amount = dec("6000");
        assert!(matches!(
            validate_purchase_input(&grn),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_line_total_defaults_to_paid_quantity() {
        assert_eq!(purchase_line_total(&item(10, 2)), dec("500"));
    }

    #[test]
    fn test_generated_numbers_have_prefixes() {
        assert!(generate_grn_no().starts_with("GRN-"));
        assert!(generate_return_no().starts_with("PR-"));
    }
}
