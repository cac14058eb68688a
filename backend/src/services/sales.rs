//! Sales (billing) service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{sale_line_total, validate_non_negative_amount, PaymentCategory};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use super::{batch_key, document_number, stock};
use crate::error::{AppError, AppResult};

/// Sales service
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

/// Sale header record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: i64,
    pub client_id: i64,
    pub cashier_id: Option<i64>,
    pub bill_number: String,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_category: PaymentCategory,
    pub paid_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Sale line record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Sale with its lines
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Input for recording a sale
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSaleInput {
    #[validate(length(max = 255, message = "Customer name is too long"))]
    pub customer_name: Option<String>,
    #[validate(length(max = 50, message = "Customer contact is too long"))]
    pub customer_contact: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub vat_amount: Decimal,
    /// Defaults to the sum of line totals less discount plus VAT
    pub grand_total: Option<Decimal>,
    #[serde(default)]
    pub payment_category: PaymentCategory,
    /// Defaults to the grand total
    pub paid_amount: Option<Decimal>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<SaleItemInput>,
}

/// One sold line
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaleItemInput {
    pub medicine_id: i64,
    #[validate(length(min = 1, max = 50, message = "Batch number is required"))]
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Option<Decimal>,
}

/// Result of recording a sale
#[derive(Debug, Clone, Serialize)]
pub struct RecordSaleResult {
    pub sale_id: i64,
    pub bill_number: String,
    pub grand_total: Decimal,
}

/// Bill amounts after validation
#[derive(Debug, Clone, PartialEq)]
struct BillTotals {
    line_totals: Vec<Decimal>,
    total_amount: Decimal,
    grand_total: Decimal,
    paid_amount: Decimal,
}

fn compute_totals(input: &RecordSaleInput) -> AppResult<BillTotals> {
    input.validate()?;

    let mut line_totals = Vec::with_capacity(input.items.len());
    for item in &input.items {
        item.validate()?;
        batch_key(&item.batch_number)?;
        line_totals.push(sale_line_total(item.quantity, item.unit_price, item.total_price)?);
    }

    for (field, value) in [
        ("discount_amount", input.discount_amount),
        ("vat_amount", input.vat_amount),
    ] {
        validate_non_negative_amount(value).map_err(|msg| AppError::validation(field, msg))?;
    }

    let total_amount: Decimal = line_totals.iter().sum();
    let grand_total = input
        .grand_total
        .unwrap_or(total_amount - input.discount_amount + input.vat_amount);
    validate_non_negative_amount(grand_total)
        .map_err(|msg| AppError::validation("grand_total", msg))?;

    let paid_amount = input.paid_amount.unwrap_or(grand_total);
    validate_non_negative_amount(paid_amount)
        .map_err(|msg| AppError::validation("paid_amount", msg))?;

    Ok(BillTotals {
        line_totals,
        total_amount,
        grand_total,
        paid_amount,
    })
}

fn generate_bill_number() -> String {
    document_number("INV")
}

const SALE_COLUMNS: &str = "id, client_id, cashier_id, bill_number, customer_name, \
                            customer_contact, invoice_date, total_amount, discount_amount, \
                            vat_amount, grand_total, payment_category, paid_amount, created_at";

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale and take its quantities out of stock.
    ///
    /// If any line cannot be covered by its batch the whole bill is rolled back.
    #[tracing::instrument(skip(self, input), fields(items = input.items.len()))]
    pub async fn record_sale(
        &self,
        client_id: i64,
        cashier_id: i64,
        input: RecordSaleInput,
    ) -> AppResult<RecordSaleResult> {
        let totals = compute_totals(&input)?;
        let bill_number = generate_bill_number();
        let invoice_date = input.invoice_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let sale_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sales (client_id, cashier_id, bill_number, customer_name, customer_contact,
                               invoice_date, total_amount, discount_amount, vat_amount, grand_total,
                               payment_category, paid_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(cashier_id)
        .bind(&bill_number)
        .bind(&input.customer_name)
        .bind(&input.customer_contact)
        .bind(invoice_date)
        .bind(totals.total_amount)
        .bind(input.discount_amount)
        .bind(input.vat_amount)
        .bind(totals.grand_total)
        .bind(input.payment_category.as_str())
        .bind(totals.paid_amount)
        .fetch_one(&mut *tx)
        .await?;

        for (item, line_total) in input.items.iter().zip(&totals.line_totals) {
            let batch_number = item.batch_number.trim();

            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, medicine_id, batch_number, quantity, unit_price,
                                        total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(sale_id)
            .bind(item.medicine_id)
            .bind(batch_number)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(line_total)
            .execute(&mut *tx)
            .await?;

            stock::deduct(
                &mut tx,
                client_id,
                item.medicine_id,
                batch_number,
                i64::from(item.quantity),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            sale_id,
            bill_number = %bill_number,
            grand_total = %totals.grand_total,
            "Sale recorded"
        );

        Ok(RecordSaleResult {
            sale_id,
            bill_number,
            grand_total: totals.grand_total,
        })
    }

    /// Get a sale with its lines
    pub async fn get_sale(&self, client_id: i64, sale_id: i64) -> AppResult<SaleWithItems> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE id = $1 AND client_id = $2",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, medicine_id, batch_number, quantity, unit_price, total_price
            FROM sale_items
            WHERE sale_id = $1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleWithItems { sale, items })
    }

    /// Get a sale by bill number
    pub async fn get_sale_by_bill_number(
        &self,
        client_id: i64,
        bill_number: &str,
    ) -> AppResult<SaleWithItems> {
        let sale_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM sales WHERE bill_number = $1 AND client_id = $2",
        )
        .bind(bill_number)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        self.get_sale(client_id, sale_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(quantity: i32, unit_price: &str) -> SaleItemInput {
        SaleItemInput {
            medicine_id: 1,
            batch_number: "B001".to_string(),
            quantity,
            unit_price: dec(unit_price),
            total_price: None,
        }
    }

    fn sale(items: Vec<SaleItemInput>) -> RecordSaleInput {
        RecordSaleInput {
            customer_name: None,
            customer_contact: None,
            invoice_date: None,
            discount_amount: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            grand_total: None,
            payment_category: PaymentCategory::Cash,
            paid_amount: None,
            items,
        }
    }

    #[test]
    fn test_totals_derived_from_lines() {
        let mut input = sale(vec![line(30, "5.00"), line(2, "120.00")]);
        input.discount_amount = dec("10");
        input.vat_amount = dec("3");
        let totals = compute_totals(&input).unwrap();
        assert_eq!(totals.total_amount, dec("390.00"));
        assert_eq!(totals.grand_total, dec("383.00"));
        assert_eq!(totals.paid_amount, dec("383.00"));
    }

    #[test]
    fn test_zero_quantity_line_rejected() {
        assert!(compute_totals(&sale(vec![line(0, "5")])).is_err());
    }

    #[test]
    fn test_blank_batch_number_rejected() {
        let mut blank = line(1, "5");
        blank.batch_number = "   ".to_string();
        assert!(matches!(
            compute_totals(&sale(vec![blank])),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_bill_rejected() {
        assert!(compute_totals(&sale(vec![])).is_err());
    }

    #[test]
    fn test_bill_number_prefix() {
        assert!(generate_bill_number().starts_with("INV-"));
    }
}
