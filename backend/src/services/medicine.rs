//! Medicine catalog service
//!
//! Also takes direct stock entries: units received outside a GRN go through
//! the same cost blend and batch upsert as a confirmed GRN line, and a credit
//! entry books its value on the supplier ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{validate_money_scale, validate_non_negative_amount, LedgerPosting, PaymentType};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use super::stock::{self, BatchReceipt, StockBatch};
use super::supplier_ledger::append_entry;
use super::{batch_key, line_quantity};
use crate::error::{AppError, AppResult};

/// Medicine catalog service
#[derive(Clone)]
pub struct MedicineService {
    db: PgPool,
}

/// Medicine record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Medicine {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub generic_name: Option<String>,
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub unit: Option<String>,
    pub avg_cost: Decimal,
    pub last_purchase_rate: Decimal,
    pub low_stock_threshold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Medicine with stock on hand
#[derive(Debug, Clone, Serialize)]
pub struct MedicineStock {
    pub medicine: Medicine,
    pub total_quantity: i64,
    pub low_stock: bool,
    pub batches: Vec<StockBatch>,
}

/// Input for creating a medicine
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineInput {
    #[validate(length(min = 1, max = 255, message = "Medicine name is required"))]
    pub name: String,
    pub generic_name: Option<String>,
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<String>,
    #[validate(length(max = 100, message = "Barcode must be at most 100 characters"))]
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "Low stock threshold cannot be negative"))]
    pub low_stock_threshold: Option<i32>,
}

/// Input for entering stock directly, without a GRN
#[derive(Debug, Deserialize, Validate)]
pub struct AddStockInput {
    pub medicine_id: i64,
    pub vendor_id: Option<i64>,
    #[validate(length(min = 1, max = 50, message = "Batch number is required"))]
    pub batch_number: String,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: i32,
    #[serde(default)]
    pub purchase_price: Decimal,
    #[serde(default)]
    pub selling_price: Decimal,
    #[serde(default)]
    pub payment_type: PaymentType,
}

/// Result of a direct stock entry
#[derive(Debug, Clone, Serialize)]
pub struct AddStockResult {
    pub stock: StockBatch,
    /// Amount added to the vendor's due; zero for cash entries
    pub credited: Decimal,
}

/// Value owed to the vendor for a direct entry
fn credited_amount(input: &AddStockInput, quantity: i64) -> AppResult<Decimal> {
    match (input.payment_type, input.vendor_id) {
        (PaymentType::Credit, None) => Err(AppError::validation(
            "vendor_id",
            "A credit stock entry needs a vendor",
        )),
        (PaymentType::Credit, Some(_)) => Ok(Decimal::from(quantity) * input.purchase_price),
        _ => Ok(Decimal::ZERO),
    }
}

fn validate_add_stock(input: &AddStockInput) -> AppResult<(i64, Decimal)> {
    input.validate()?;
    batch_key(&input.batch_number)?;
    let quantity = line_quantity(input.quantity)?;
    for (field, value) in [
        ("purchase_price", input.purchase_price),
        ("selling_price", input.selling_price),
    ] {
        validate_non_negative_amount(value)
            .and_then(|_| validate_money_scale(value))
            .map_err(|msg| AppError::validation(field, msg))?;
    }
    if let (Some(mfg), Some(expiry)) = (input.mfg_date, input.expiry_date) {
        if expiry < mfg {
            return Err(AppError::validation(
                "expiry_date",
                "Expiry date cannot be before manufacturing date",
            ));
        }
    }
    Ok((quantity, credited_amount(input, quantity)?))
}

const MEDICINE_COLUMNS: &str = "id, client_id, name, generic_name, code, barcode, category, \
                                manufacturer, unit, avg_cost, last_purchase_rate, \
                                low_stock_threshold, created_at, updated_at";

impl MedicineService {
    /// Create a new MedicineService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add a medicine to the catalog. Cost fields start at zero.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_medicine(
        &self,
        client_id: i64,
        input: CreateMedicineInput,
    ) -> AppResult<Medicine> {
        input.validate()?;

        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            INSERT INTO medicines (client_id, name, generic_name, code, barcode, category,
                                   manufacturer, unit, low_stock_threshold)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MEDICINE_COLUMNS
        ))
        .bind(client_id)
        .bind(input.name.trim())
        .bind(&input.generic_name)
        .bind(&input.code)
        .bind(&input.barcode)
        .bind(&input.category)
        .bind(&input.manufacturer)
        .bind(&input.unit)
        .bind(input.low_stock_threshold.unwrap_or(10))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(medicine_id = medicine.id, "Medicine created");

        Ok(medicine)
    }

    /// Get a medicine by ID
    pub async fn get_medicine(&self, client_id: i64, medicine_id: i64) -> AppResult<Medicine> {
        sqlx::query_as::<_, Medicine>(&format!(
            "SELECT {} FROM medicines WHERE id = $1 AND client_id = $2",
            MEDICINE_COLUMNS
        ))
        .bind(medicine_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))
    }

    /// Get a medicine with its stock batches, earliest expiry first
    pub async fn get_medicine_stock(
        &self,
        client_id: i64,
        medicine_id: i64,
    ) -> AppResult<MedicineStock> {
        let medicine = self.get_medicine(client_id, medicine_id).await?;

        let batches = sqlx::query_as::<_, StockBatch>(
            r#"
            SELECT id, client_id, medicine_id, vendor_id, purchase_item_id, batch_number,
                   expiry_date, mfg_date, quantity, purchase_price, selling_price
            FROM stocks
            WHERE medicine_id = $1 AND client_id = $2
            ORDER BY expiry_date ASC NULLS LAST, id ASC
            "#,
        )
        .bind(medicine_id)
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        let total_quantity: i64 = batches.iter().map(|b| i64::from(b.quantity)).sum();

        Ok(MedicineStock {
            low_stock: total_quantity <= i64::from(medicine.low_stock_threshold),
            medicine,
            total_quantity,
            batches,
        })
    }

    /// Enter stock for a medicine without a GRN.
    ///
    /// The medicine's average cost is re-blended under lock exactly as for a
    /// confirmed GRN line. A credit entry appends a PURCHASE row on the
    /// supplier ledger, which also moves the vendor's cached due.
    #[tracing::instrument(skip(self, input), fields(medicine_id = input.medicine_id))]
    pub async fn add_stock(
        &self,
        client_id: i64,
        user_id: i64,
        input: AddStockInput,
    ) -> AppResult<AddStockResult> {
        let (quantity, credited) = validate_add_stock(&input)?;
        let batch_number = batch_key(&input.batch_number)?;

        let mut tx = self.db.begin().await?;

        if let Some(vendor_id) = input.vendor_id {
            let vendor_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM vendors WHERE id = $1 AND client_id = $2)",
            )
            .bind(vendor_id)
            .bind(client_id)
            .fetch_one(&mut *tx)
            .await?;

            if !vendor_exists {
                return Err(AppError::NotFound("Vendor".to_string()));
            }
        }

        let snapshot = stock::lock_cost_snapshot(&mut tx, client_id, input.medicine_id).await?;
        let update = snapshot.receive(quantity, input.purchase_price);
        stock::store_cost(
            &mut tx,
            client_id,
            input.medicine_id,
            update.avg_cost,
            update.last_purchase_rate,
        )
        .await?;

        let batch = stock::receive_batch(
            &mut tx,
            client_id,
            &BatchReceipt {
                medicine_id: input.medicine_id,
                batch_number,
                expiry_date: input.expiry_date,
                mfg_date: input.mfg_date,
                quantity,
                purchase_price: input.purchase_price,
                selling_price: input.selling_price,
                vendor_id: input.vendor_id,
                purchase_item_id: None,
            },
        )
        .await?;

        if let Some(vendor_id) = input.vendor_id.filter(|_| credited > Decimal::ZERO) {
            let posting = LedgerPosting::stock_entry(credited, batch_number);
            append_entry(&mut tx, client_id, vendor_id, &posting, Some(user_id)).await?;
        }

        tx.commit().await?;

        tracing::info!(
            stock_id = batch.id,
            quantity,
            %credited,
            new_avg_cost = %update.avg_cost,
            "Stock entered"
        );

        Ok(AddStockResult {
            stock: batch,
            credited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn entry(payment_type: PaymentType, vendor_id: Option<i64>) -> AddStockInput {
        AddStockInput {
            medicine_id: 1,
            vendor_id,
            batch_number: " B007 ".to_string(),
            mfg_date: None,
            expiry_date: None,
            quantity: 15,
            purchase_price: dec("50"),
            selling_price: dec("65"),
            payment_type,
        }
    }

    #[test]
    fn test_credit_entry_owes_quantity_times_price() {
        let (quantity, credited) =
            validate_add_stock(&entry(PaymentType::Credit, Some(3))).unwrap();
        assert_eq!(quantity, 15);
        assert_eq!(credited, dec("750"));
    }

    #[test]
    fn test_cash_entry_owes_nothing() {
        let (_, credited) = validate_add_stock(&entry(PaymentType::Cash, Some(3))).unwrap();
        assert_eq!(credited, Decimal::ZERO);
        assert!(validate_add_stock(&entry(PaymentType::Cash, None)).is_ok());
    }

    #[test]
    fn test_credit_entry_without_vendor_rejected() {
        assert!(matches!(
            validate_add_stock(&entry(PaymentType::Credit, None)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_bad_stock_entry_rejected() {
        let mut zero = entry(PaymentType::Cash, None);
        zero.quantity = 0;
        assert!(validate_add_stock(&zero).is_err());

        let mut blank = entry(PaymentType::Cash, None);
        blank.batch_number = "  ".to_string();
        assert!(validate_add_stock(&blank).is_err());

        let mut negative = entry(PaymentType::Cash, None);
        negative.purchase_price = dec("-1");
        assert!(validate_add_stock(&negative).is_err());
    }
}
