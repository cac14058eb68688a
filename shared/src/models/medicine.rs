//! Medicine cost model

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Scale stored for `medicines.avg_cost`
pub const AVG_COST_SCALE: u32 = 4;

/// Cost fields of a medicine as read under lock before a receipt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostSnapshot {
    /// Total quantity across every batch of the medicine
    pub stock_on_hand: i64,
    pub avg_cost: Decimal,
}

/// Cost fields after applying one receipt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostUpdate {
    pub avg_cost: Decimal,
    pub last_purchase_rate: Decimal,
    pub stock_on_hand: i64,
}

/// Units entering stock for one purchase line, paid and free together
pub fn received_qty(qty: i32, free_qty: i32) -> DomainResult<i64> {
    if qty < 0 {
        return Err(DomainError::validation("qty", "Quantity cannot be negative"));
    }
    if free_qty < 0 {
        return Err(DomainError::validation(
            "free_qty",
            "Free quantity cannot be negative",
        ));
    }
    let received = i64::from(qty) + i64::from(free_qty);
    if received == 0 {
        return Err(DomainError::validation(
            "qty",
            "Received quantity must be greater than zero",
        ));
    }
    Ok(received)
}

/// Quantity-weighted blend of the cost already on hand and the incoming cost.
///
/// `old_stock` must be read before the receipt is added. When there is nothing
/// on hand and nothing arriving the previous average is kept.
pub fn weighted_average_cost(
    old_stock: i64,
    old_avg_cost: Decimal,
    received_qty: i64,
    purchase_rate: Decimal,
) -> Decimal {
    let total = old_stock + received_qty;
    if total == 0 {
        return old_avg_cost;
    }
    let old_value = Decimal::from(old_stock) * old_avg_cost;
    let incoming_value = Decimal::from(received_qty) * purchase_rate;
    ((old_value + incoming_value) / Decimal::from(total))
        .round_dp_with_strategy(AVG_COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl CostSnapshot {
    /// Apply a receipt and return the new cost fields.
    ///
    /// Several lines of one GRN can hit the same medicine; feed the returned
    /// `stock_on_hand` and `avg_cost` into the next line.
    pub fn receive(&self, received_qty: i64, purchase_rate: Decimal) -> CostUpdate {
        CostUpdate {
            avg_cost: weighted_average_cost(
                self.stock_on_hand,
                self.avg_cost,
                received_qty,
                purchase_rate,
            ),
            last_purchase_rate: purchase_rate,
            stock_on_hand: self.stock_on_hand + received_qty,
        }
    }
}

impl From<CostUpdate> for CostSnapshot {
    fn from(update: CostUpdate) -> Self {
        CostSnapshot {
            stock_on_hand: update.stock_on_hand,
            avg_cost: update.avg_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_blends_existing_and_incoming_cost() {
        assert_eq!(weighted_average_cost(10, dec("100"), 10, dec("200")), dec("150"));
    }

    #[test]
    fn test_empty_stock_takes_purchase_rate() {
        assert_eq!(weighted_average_cost(0, dec("80"), 25, dec("12.50")), dec("12.50"));
    }

    #[test]
    fn test_nothing_on_hand_nothing_received_keeps_average() {
        assert_eq!(weighted_average_cost(0, dec("42.1234"), 0, dec("99")), dec("42.1234"));
    }

    #[test]
    fn test_average_rounded_to_four_places() {
        // (1*10 + 2*11) / 3 = 10.6666...
        assert_eq!(weighted_average_cost(1, dec("10"), 2, dec("11")), dec("10.6667"));
    }

    #[test]
    fn test_received_qty_includes_free_units() {
        assert_eq!(received_qty(100, 10), Ok(110));
        assert_eq!(received_qty(0, 5), Ok(5));
    }

    #[test]
    fn test_received_qty_rejects_empty_and_negative_lines() {
        assert!(received_qty(0, 0).is_err());
        assert!(received_qty(-1, 5).is_err());
        assert!(received_qty(5, -1).is_err());
    }

    #[test]
    fn test_successive_receipts_chain() {
        let start = CostSnapshot {
            stock_on_hand: 0,
            avg_cost: Decimal::ZERO,
        };
        let first = start.receive(100, dec("50"));
        assert_eq!(first.avg_cost, dec("50"));
        assert_eq!(first.stock_on_hand, 100);

        let second = CostSnapshot::from(first).receive(100, dec("70"));
        assert_eq!(second.avg_cost, dec("60"));
        assert_eq!(second.last_purchase_rate, dec("70"));
        assert_eq!(second.stock_on_hand, 200);
    }
}
