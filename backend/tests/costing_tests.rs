//! GRN costing tests
//!
//! Weighted-average cost and received quantity rules applied on GRN
//! confirmation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{received_qty, weighted_average_cost, CostSnapshot, DomainError};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_average_of_equal_quantities() {
        assert_eq!(weighted_average_cost(10, dec("100"), 10, dec("200")), dec("150"));
    }

    #[test]
    fn test_first_receipt_takes_purchase_rate() {
        assert_eq!(weighted_average_cost(0, dec("0"), 25, dec("12.35")), dec("12.35"));
        // A stale average from an emptied shelf is ignored
        assert_eq!(weighted_average_cost(0, dec("80"), 5, dec("40")), dec("40"));
    }

    #[test]
    fn test_average_is_rounded_to_four_places() {
        // (1 * 10 + 2 * 11) / 3 = 10.6666...
        assert_eq!(weighted_average_cost(1, dec("10"), 2, dec("11")), dec("10.6667"));
    }

    #[test]
    fn test_free_quantity_dilutes_cost() {
        let received = received_qty(10, 2).unwrap();
        assert_eq!(received, 12);
        assert_eq!(weighted_average_cost(0, dec("0"), received, dec("60")), dec("60"));
        assert_eq!(weighted_average_cost(12, dec("60"), 12, dec("0")), dec("30"));
    }

    #[test]
    fn test_received_quantity_rules() {
        assert_eq!(received_qty(0, 5).unwrap(), 5);
        assert!(matches!(
            received_qty(0, 0),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            received_qty(-1, 5),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            received_qty(5, -1),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_snapshot_chains_receipts() {
        let start = CostSnapshot {
            stock_on_hand: 0,
            avg_cost: Decimal::ZERO,
        };
        let first = start.receive(100, dec("50"));
        assert_eq!(first.avg_cost, dec("50"));
        assert_eq!(first.last_purchase_rate, dec("50"));
        assert_eq!(first.stock_on_hand, 100);

        let second = CostSnapshot::from(first).receive(50, dec("56"));
        assert_eq!(second.avg_cost, dec("52"));
        assert_eq!(second.last_purchase_rate, dec("56"));
        assert_eq!(second.stock_on_hand, 150);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The new average lies between the old average and the purchase rate
    #[test]
    fn prop_average_between_inputs(
        old_stock in 1i64..10_000,
        old_avg in rate_strategy(),
        received in 1i64..10_000,
        rate in rate_strategy(),
    ) {
        let avg = weighted_average_cost(old_stock, old_avg, received, rate);
        let low = old_avg.min(rate);
        let high = old_avg.max(rate);
        prop_assert!(avg >= low && avg <= high, "{} not in [{}, {}]", avg, low, high);
        prop_assert!(avg.scale() <= 4);
    }

    /// Receiving at the current average leaves it unchanged
    #[test]
    fn prop_receipt_at_average_is_neutral(
        old_stock in 0i64..10_000,
        avg in rate_strategy(),
        received in 1i64..10_000,
    ) {
        prop_assert_eq!(weighted_average_cost(old_stock, avg, received, avg), avg);
    }

    /// Stock on hand after a run of receipts is the sum received, and the
    /// average stays inside the range of rates paid
    #[test]
    fn prop_receipt_sequence(
        receipts in prop::collection::vec((1i64..500, rate_strategy()), 1..20),
    ) {
        let mut snapshot = CostSnapshot {
            stock_on_hand: 0,
            avg_cost: Decimal::ZERO,
        };
        for (qty, rate) in &receipts {
            snapshot = snapshot.receive(*qty, *rate).into();
        }

        let total: i64 = receipts.iter().map(|(q, _)| q).sum();
        let low = receipts.iter().map(|(_, r)| *r).min().unwrap();
        let high = receipts.iter().map(|(_, r)| *r).max().unwrap();

        prop_assert_eq!(snapshot.stock_on_hand, total);
        prop_assert!(snapshot.avg_cost >= low && snapshot.avg_cost <= high);
    }
}
