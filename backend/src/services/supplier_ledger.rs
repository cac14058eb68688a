//! Supplier ledger and vendor service
//!
//! `append_entry` is the only writer of both `supplier_ledger` and
//! `vendors.current_due`, so the cached due always equals the latest running
//! balance.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    find_balance_break, validate_payment_amount, LedgerLine, LedgerPosting, LedgerTransactionType,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Supplier ledger service
#[derive(Clone)]
pub struct SupplierLedgerService {
    db: PgPool,
}

/// Vendor record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vendor {
    pub id: i64,
    pub client_id: i64,
    pub vendor_code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub pan_number: Option<String>,
    pub opening_due: Decimal,
    pub current_due: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Supplier ledger row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierLedgerEntry {
    pub id: i64,
    pub vendor_id: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: LedgerTransactionType,
    pub reference_no: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Vendor payment row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VendorPayment {
    pub id: i64,
    pub vendor_id: i64,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub reference_no: Option<String>,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub ledger_entry_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a vendor
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVendorInput {
    #[validate(length(min = 1, max = 255, message = "Vendor name is required"))]
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub pan_number: Option<String>,
    pub opening_due: Option<Decimal>,
}

/// Input for recording a payment to a vendor
#[derive(Debug, Deserialize, Validate)]
pub struct VendorPaymentInput {
    pub amount: Decimal,
    pub payment_method: Option<String>,
    #[validate(length(max = 100, message = "Reference number is too long"))]
    pub reference_no: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Running balance owed to a vendor
#[derive(Debug, Clone, Serialize)]
pub struct VendorBalance {
    pub vendor_id: i64,
    pub balance: Decimal,
    pub current_due: Decimal,
}

/// Full ledger of one vendor with a chain check
#[derive(Debug, Clone, Serialize)]
pub struct VendorLedger {
    pub vendor_id: i64,
    pub entries: Vec<SupplierLedgerEntry>,
    pub balance: Decimal,
    /// Index of the first row whose balance does not follow from the previous one
    pub first_inconsistent_entry: Option<usize>,
}

const ENTRY_COLUMNS: &str = "id, vendor_id, transaction_type, reference_no, debit, credit, balance, \
                             description, transaction_date, created_by, created_at";

/// Append one ledger row for a vendor on the caller's transaction.
///
/// Locks the vendor row so appends for the same vendor are serialized, reads
/// the latest balance (0 when the vendor has no rows yet), inserts the row and
/// mirrors the new balance into `vendors.current_due`.
pub async fn append_entry(
    conn: &mut PgConnection,
    client_id: i64,
    vendor_id: i64,
    posting: &LedgerPosting,
    created_by: Option<i64>,
) -> AppResult<SupplierLedgerEntry> {
    let vendor_exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM vendors WHERE id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(vendor_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?;

    if vendor_exists.is_none() {
        return Err(AppError::NotFound(format!("Vendor {}", vendor_id)));
    }

    let previous = latest_balance(&mut *conn, client_id, vendor_id).await?;
    let balance = posting.balance_after(previous);

    let entry = sqlx::query_as::<_, SupplierLedgerEntry>(&format!(
        r#"
        INSERT INTO supplier_ledger (client_id, vendor_id, transaction_type, reference_no,
                                     debit, credit, balance, description, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        ENTRY_COLUMNS
    ))
    .bind(client_id)
    .bind(vendor_id)
    .bind(posting.transaction_type.as_str())
    .bind(&posting.reference_no)
    .bind(posting.debit)
    .bind(posting.credit)
    .bind(balance)
    .bind(&posting.description)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE vendors SET current_due = $1 WHERE id = $2 AND client_id = $3")
        .bind(balance)
        .bind(vendor_id)
        .bind(client_id)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(
        vendor_id,
        entry_id = entry.id,
        transaction_type = %posting.transaction_type,
        %previous,
        %balance,
        "Supplier ledger entry appended"
    );

    Ok(entry)
}

/// Latest running balance of a vendor, 0 when there are no rows
async fn latest_balance(
    conn: &mut PgConnection,
    client_id: i64,
    vendor_id: i64,
) -> AppResult<Decimal> {
    let balance = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT balance FROM supplier_ledger
        WHERE vendor_id = $1 AND client_id = $2
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(vendor_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(balance.unwrap_or(Decimal::ZERO))
}

impl SupplierLedgerService {
    /// Create a new SupplierLedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a vendor; a positive opening due is booked as the first ledger row
    #[tracing::instrument(skip(self, input))]
    pub async fn create_vendor(
        &self,
        client_id: i64,
        user_id: i64,
        input: CreateVendorInput,
    ) -> AppResult<Vendor> {
        input.validate()?;
        let opening_due = input.opening_due.unwrap_or(Decimal::ZERO);
        if opening_due < Decimal::ZERO {
            return Err(AppError::validation(
                "opening_due",
                "Opening due cannot be negative",
            ));
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        let vendor_code = format!("SUP-{}", &suffix[..6]);

        let mut tx = self.db.begin().await?;

        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            INSERT INTO vendors (client_id, vendor_code, name, contact_person, phone, email,
                                 address, pan_number, opening_due, current_due)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
            RETURNING id, client_id, vendor_code, name, contact_person, phone, email, address,
                      pan_number, opening_due, current_due, created_at
            "#,
        )
        .bind(client_id)
        .bind(&vendor_code)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.pan_number)
        .bind(opening_due)
        .fetch_one(&mut *tx)
        .await?;

        if opening_due > Decimal::ZERO {
            append_entry(
                &mut tx,
                client_id,
                vendor.id,
                &LedgerPosting::opening_balance(opening_due),
                Some(user_id),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(vendor_id = vendor.id, %opening_due, "Vendor created");

        self.get_vendor(client_id, vendor.id).await
    }

    /// Get a vendor by ID
    pub async fn get_vendor(&self, client_id: i64, vendor_id: i64) -> AppResult<Vendor> {
        sqlx::query_as::<_, Vendor>(
            r#"
            SELECT id, client_id, vendor_code, name, contact_person, phone, email, address,
                   pan_number, opening_due, current_due, created_at
            FROM vendors
            WHERE id = $1 AND client_id = $2
            "#,
        )
        .bind(vendor_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor".to_string()))
    }

    /// Record a payment to a vendor together with its PAYMENT ledger row
    #[tracing::instrument(skip(self, input))]
    pub async fn record_payment(
        &self,
        client_id: i64,
        user_id: i64,
        vendor_id: i64,
        input: VendorPaymentInput,
    ) -> AppResult<VendorPayment> {
        input.validate()?;
        validate_payment_amount(input.amount)?;

        let payment_date = input.payment_date.unwrap_or_else(|| Utc::now().date_naive());
        let posting = LedgerPosting::payment(input.amount, input.reference_no.as_deref());

        let mut tx = self.db.begin().await?;

        let entry = append_entry(&mut tx, client_id, vendor_id, &posting, Some(user_id)).await?;

        let payment = sqlx::query_as::<_, VendorPayment>(
            r#"
            INSERT INTO vendor_payments (client_id, vendor_id, amount, payment_method, reference_no,
                                         payment_date, notes, ledger_entry_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, vendor_id, amount, payment_method, reference_no, payment_date, notes,
                      ledger_entry_id, created_at
            "#,
        )
        .bind(client_id)
        .bind(vendor_id)
        .bind(input.amount)
        .bind(&input.payment_method)
        .bind(&input.reference_no)
        .bind(payment_date)
        .bind(&input.notes)
        .bind(entry.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            vendor_id,
            payment_id = payment.id,
            amount = %payment.amount,
            balance = %entry.balance,
            "Vendor payment recorded"
        );

        Ok(payment)
    }

    /// Latest running balance for a vendor
    pub async fn get_balance(&self, client_id: i64, vendor_id: i64) -> AppResult<VendorBalance> {
        let vendor = self.get_vendor(client_id, vendor_id).await?;
        let mut conn = self.db.acquire().await?;
        let balance = latest_balance(&mut conn, client_id, vendor_id).await?;

        Ok(VendorBalance {
            vendor_id,
            balance,
            current_due: vendor.current_due,
        })
    }

    /// All ledger rows of a vendor in insertion order
    pub async fn get_ledger(&self, client_id: i64, vendor_id: i64) -> AppResult<VendorLedger> {
        // 404 for unknown vendors rather than an empty ledger
        self.get_vendor(client_id, vendor_id).await?;

        let entries = sqlx::query_as::<_, SupplierLedgerEntry>(&format!(
            "SELECT {} FROM supplier_ledger WHERE vendor_id = $1 AND client_id = $2 ORDER BY id",
            ENTRY_COLUMNS
        ))
        .bind(vendor_id)
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        let lines: Vec<LedgerLine> = entries
            .iter()
            .map(|e| LedgerLine {
                debit: e.debit,
                credit: e.credit,
                balance: e.balance,
            })
            .collect();

        Ok(VendorLedger {
            vendor_id,
            balance: entries.last().map(|e| e.balance).unwrap_or(Decimal::ZERO),
            first_inconsistent_entry: find_balance_break(&lines),
            entries,
        })
    }
}
