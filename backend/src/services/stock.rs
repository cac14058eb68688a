//! Stock batch primitives
//!
//! These run on the caller's transaction. Every function that reads a
//! quantity in order to change it takes row locks first, so two requests
//! touching the same medicine are serialized until the first one commits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{plan_deduction, restock_target, BatchLevel, CostSnapshot, Deduction};
use sqlx::{FromRow, PgConnection};

use crate::error::{AppError, AppResult};

/// Stock batch row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockBatch {
    pub id: i64,
    pub client_id: i64,
    pub medicine_id: i64,
    pub vendor_id: Option<i64>,
    pub purchase_item_id: Option<i64>,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub mfg_date: Option<NaiveDate>,
    pub quantity: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
}

/// Units arriving into one batch
#[derive(Debug, Clone)]
pub struct BatchReceipt<'a> {
    pub medicine_id: i64,
    pub batch_number: &'a str,
    pub expiry_date: Option<NaiveDate>,
    pub mfg_date: Option<NaiveDate>,
    pub quantity: i64,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub vendor_id: Option<i64>,
    /// GRN line the units came from; `None` for direct stock entry
    pub purchase_item_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct LevelRow {
    id: i64,
    expiry_date: Option<NaiveDate>,
    quantity: i32,
}

impl From<LevelRow> for BatchLevel {
    fn from(row: LevelRow) -> Self {
        BatchLevel {
            stock_id: row.id,
            expiry_date: row.expiry_date,
            quantity: i64::from(row.quantity),
        }
    }
}

fn to_i32(quantity: i64, field: &str) -> AppResult<i32> {
    i32::try_from(quantity)
        .map_err(|_| AppError::validation(field, "Quantity is too large"))
}

/// Lock a medicine and all of its stock rows, then read its cost basis.
pub async fn lock_cost_snapshot(
    conn: &mut PgConnection,
    client_id: i64,
    medicine_id: i64,
) -> AppResult<CostSnapshot> {
    let avg_cost = sqlx::query_scalar::<_, Decimal>(
        "SELECT avg_cost FROM medicines WHERE id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(medicine_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Medicine {}", medicine_id)))?;

    let quantities = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM stocks WHERE medicine_id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(medicine_id)
    .bind(client_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(CostSnapshot {
        stock_on_hand: quantities.iter().map(|q| i64::from(*q)).sum(),
        avg_cost,
    })
}

/// Write the blended cost and latest rate back to the medicine
pub async fn store_cost(
    conn: &mut PgConnection,
    client_id: i64,
    medicine_id: i64,
    avg_cost: Decimal,
    last_purchase_rate: Decimal,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE medicines
        SET avg_cost = $1, last_purchase_rate = $2, updated_at = NOW()
        WHERE id = $3 AND client_id = $4
        "#,
    )
    .bind(avg_cost)
    .bind(last_purchase_rate)
    .bind(medicine_id)
    .bind(client_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Add received units to the batch keyed by (medicine, batch number, expiry).
///
/// An existing row keeps its identity: quantity grows and prices are replaced
/// by this receipt's rate and MRP. Otherwise a new row is created.
pub async fn receive_batch(
    conn: &mut PgConnection,
    client_id: i64,
    receipt: &BatchReceipt<'_>,
) -> AppResult<StockBatch> {
    let quantity = to_i32(receipt.quantity, "qty")?;

    let batch = sqlx::query_as::<_, StockBatch>(
        r#"
        INSERT INTO stocks (client_id, medicine_id, vendor_id, purchase_item_id, batch_number,
                            expiry_date, mfg_date, quantity, purchase_price, selling_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (client_id, medicine_id, batch_number, COALESCE(expiry_date, 'infinity'::date))
        DO UPDATE SET quantity = stocks.quantity + EXCLUDED.quantity,
                      purchase_price = EXCLUDED.purchase_price,
                      selling_price = EXCLUDED.selling_price,
                      purchase_item_id = COALESCE(EXCLUDED.purchase_item_id,
                                                  stocks.purchase_item_id),
                      mfg_date = COALESCE(EXCLUDED.mfg_date, stocks.mfg_date),
                      updated_at = NOW()
        RETURNING id, client_id, medicine_id, vendor_id, purchase_item_id, batch_number,
                  expiry_date, mfg_date, quantity, purchase_price, selling_price
        "#,
    )
    .bind(client_id)
    .bind(receipt.medicine_id)
    .bind(receipt.vendor_id)
    .bind(receipt.purchase_item_id)
    .bind(receipt.batch_number)
    .bind(receipt.expiry_date)
    .bind(receipt.mfg_date)
    .bind(quantity)
    .bind(receipt.purchase_price)
    .bind(receipt.selling_price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(batch)
}

/// Lock every row of one medicine batch number and return their levels
async fn lock_levels(
    conn: &mut PgConnection,
    client_id: i64,
    medicine_id: i64,
    batch_number: &str,
) -> AppResult<Vec<BatchLevel>> {
    let rows = sqlx::query_as::<_, LevelRow>(
        r#"
        SELECT id, expiry_date, quantity
        FROM stocks
        WHERE client_id = $1 AND medicine_id = $2 AND batch_number = $3
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(client_id)
    .bind(medicine_id)
    .bind(batch_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(BatchLevel::from).collect())
}

/// Take `quantity` units out of a medicine batch, earliest expiry first.
///
/// Fails with `NotFound` when no row carries the batch number, and with
/// `InsufficientStock` without touching any row when the batch cannot cover
/// the whole quantity.
pub async fn deduct(
    conn: &mut PgConnection,
    client_id: i64,
    medicine_id: i64,
    batch_number: &str,
    quantity: i64,
) -> AppResult<Vec<Deduction>> {
    let levels = lock_levels(conn, client_id, medicine_id, batch_number).await?;
    if levels.is_empty() {
        return Err(AppError::NotFound(format!(
            "Stock batch {} of medicine {}",
            batch_number, medicine_id
        )));
    }
    let label = format!("medicine {} batch {}", medicine_id, batch_number);
    let plan = plan_deduction(&levels, quantity, &label)?;

    for step in &plan {
        sqlx::query(
            "UPDATE stocks SET quantity = quantity - $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(to_i32(step.quantity, "quantity")?)
        .bind(step.stock_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(plan)
}

/// Put `quantity` units back into a medicine batch (earliest-expiry row).
pub async fn restock(
    conn: &mut PgConnection,
    client_id: i64,
    medicine_id: i64,
    batch_number: &str,
    quantity: i64,
) -> AppResult<i64> {
    let levels = lock_levels(conn, client_id, medicine_id, batch_number).await?;
    let stock_id = restock_target(&levels).ok_or_else(|| {
        AppError::NotFound(format!(
            "Stock batch {} of medicine {}",
            batch_number, medicine_id
        ))
    })?;

    sqlx::query("UPDATE stocks SET quantity = quantity + $1, updated_at = NOW() WHERE id = $2")
        .bind(to_i32(quantity, "quantity")?)
        .bind(stock_id)
        .execute(&mut *conn)
        .await?;

    Ok(stock_id)
}
