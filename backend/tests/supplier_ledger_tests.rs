//! Supplier ledger tests
//!
//! Running balance chain: each row's balance is the previous balance minus
//! its debit plus its credit, starting from zero.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    find_balance_break, next_balance, purchase_due, validate_payment_amount, LedgerLine,
    LedgerPosting, LedgerTransactionType,
};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Append postings the way the ledger service does and return the stored rows
fn post_all(postings: &[LedgerPosting]) -> Vec<LedgerLine> {
    let mut balance = Decimal::ZERO;
    postings
        .iter()
        .map(|p| {
            balance = p.balance_after(balance);
            LedgerLine {
                debit: p.debit,
                credit: p.credit,
                balance,
            }
        })
        .collect()
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_grn_return_payment_sequence() {
        let due = purchase_due(dec("1000"), dec("400")).unwrap();
        let postings = vec![
            LedgerPosting::purchase(due, "GRN-1", Some("INV-77")),
            LedgerPosting::purchase_return(dec("130"), "PR-1", "GRN-1"),
            LedgerPosting::payment(dec("200"), Some("CHQ-5")),
        ];
        let lines = post_all(&postings);

        let balances: Vec<Decimal> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec("600"), dec("470"), dec("270")]);
        assert_eq!(find_balance_break(&lines), None);
    }

    #[test]
    fn test_posting_directions() {
        let purchase = LedgerPosting::purchase(dec("50"), "GRN-9", None);
        assert_eq!(purchase.transaction_type, LedgerTransactionType::Purchase);
        assert_eq!(purchase.credit, dec("50"));
        assert_eq!(purchase.debit, Decimal::ZERO);
        assert_eq!(purchase.description, "Purchase GRN: GRN-9, Inv: -");

        let ret = LedgerPosting::purchase_return(dec("20"), "PR-3", "GRN-9");
        assert_eq!(ret.transaction_type, LedgerTransactionType::PurchaseReturn);
        assert_eq!(ret.debit, dec("20"));

        let opening = LedgerPosting::opening_balance(dec("75"));
        assert_eq!(opening.transaction_type, LedgerTransactionType::OpeningBalance);
        assert_eq!(opening.credit, dec("75"));
    }

    #[test]
    fn test_fully_paid_purchase_posts_zero_credit() {
        let due = purchase_due(dec("500"), dec("500")).unwrap();
        assert_eq!(due, Decimal::ZERO);
        let line = post_all(&[LedgerPosting::purchase(due, "GRN-2", None)]);
        assert_eq!(line[0].balance, Decimal::ZERO);
    }

    #[test]
    fn test_overpaid_purchase_rejected() {
        assert!(purchase_due(dec("100"), dec("100.01")).is_err());
        assert!(purchase_due(dec("100"), dec("-1")).is_err());
    }

    #[test]
    fn test_break_detected_at_first_bad_row() {
        let mut lines = post_all(&[
            LedgerPosting::purchase(dec("100"), "GRN-1", None),
            LedgerPosting::payment(dec("40"), None),
            LedgerPosting::payment(dec("10"), None),
        ]);
        lines[1].balance = dec("61");
        assert_eq!(find_balance_break(&lines), Some(1));
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        assert!(validate_payment_amount(dec("0.01")).is_ok());
        assert!(validate_payment_amount(Decimal::ZERO).is_err());
        assert!(validate_payment_amount(dec("-5")).is_err());
    }

    #[test]
    fn test_balance_can_go_negative_on_overpayment() {
        assert_eq!(next_balance(dec("100"), dec("150"), Decimal::ZERO), dec("-50"));
    }
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn posting_strategy() -> impl Strategy<Value = LedgerPosting> {
    prop_oneof![
        amount_strategy().prop_map(|a| LedgerPosting::purchase(a, "GRN", None)),
        amount_strategy().prop_map(|a| LedgerPosting::purchase_return(a, "PR", "GRN")),
        amount_strategy().prop_map(|a| LedgerPosting::payment(a, None)),
        amount_strategy().prop_map(LedgerPosting::opening_balance),
    ]
}

proptest! {
    /// Rows written by the append primitive always form an unbroken chain
    #[test]
    fn prop_appended_rows_chain(postings in prop::collection::vec(posting_strategy(), 0..40)) {
        let lines = post_all(&postings);
        prop_assert_eq!(find_balance_break(&lines), None);

        let credits: Decimal = postings.iter().map(|p| p.credit).sum();
        let debits: Decimal = postings.iter().map(|p| p.debit).sum();
        let last = lines.last().map(|l| l.balance).unwrap_or(Decimal::ZERO);
        prop_assert_eq!(last, credits - debits);
    }

    /// Tampering with any stored balance is caught at that row
    #[test]
    fn prop_tampered_row_detected(
        postings in prop::collection::vec(posting_strategy(), 1..40),
        pick in any::<prop::sample::Index>(),
        delta in amount_strategy(),
    ) {
        let mut lines = post_all(&postings);
        let i = pick.index(lines.len());
        lines[i].balance += delta;
        prop_assert_eq!(find_balance_break(&lines), Some(i));
    }
}
