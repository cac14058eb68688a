//! Stock batch quantity planning

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Quantity held by one stock row, as read under lock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchLevel {
    pub stock_id: i64,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: i64,
}

/// Units to take from one stock row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deduction {
    pub stock_id: i64,
    pub quantity: i64,
}

/// Order rows first-expiry-first-out. Rows without an expiry go last, ties by id.
pub fn sort_fefo(batches: &mut [BatchLevel]) {
    batches.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.stock_id.cmp(&b.stock_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.stock_id.cmp(&b.stock_id),
    });
}

/// Split `requested` units across the rows sharing one batch number.
///
/// Either the whole quantity is covered or nothing is planned, so stock never
/// goes below zero.
pub fn plan_deduction(
    batches: &[BatchLevel],
    requested: i64,
    label: &str,
) -> DomainResult<Vec<Deduction>> {
    if requested <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    let available: i64 = batches.iter().map(|b| b.quantity.max(0)).sum();
    if available < requested {
        return Err(DomainError::InsufficientStock(format!(
            "{}: requested {}, available {}",
            label, requested, available
        )));
    }

    let mut ordered = batches.to_vec();
    sort_fefo(&mut ordered);

    let mut remaining = requested;
    let mut plan = Vec::new();
    for batch in ordered {
        if remaining == 0 {
            break;
        }
        let take = batch.quantity.max(0).min(remaining);
        if take > 0 {
            plan.push(Deduction {
                stock_id: batch.stock_id,
                quantity: take,
            });
            remaining -= take;
        }
    }

    Ok(plan)
}

/// Row that receives units coming back into stock: the earliest-expiry row
pub fn restock_target(batches: &[BatchLevel]) -> Option<i64> {
    let mut ordered = batches.to_vec();
    sort_fefo(&mut ordered);
    ordered.first().map(|b| b.stock_id)
}
