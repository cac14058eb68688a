//! Karobar cash-account ledger tests
//!
//! - Incremental posting agrees with recomputing from active statements
//! - Non-privileged OUT postings never overdraw
//! - Deleting a statement removes exactly its effect

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_posting, recompute_balance, AccountStatus, CategoryType, DomainError, EntryType,
    StatementAmount, StatementStatus,
};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory account driven through the same rules as the service
struct Account {
    opening: Decimal,
    balance: Decimal,
    statements: Vec<StatementAmount>,
}

impl Account {
    fn open(opening: Decimal) -> Self {
        Account {
            opening,
            balance: opening,
            statements: Vec::new(),
        }
    }

    fn post(
        &mut self,
        entry: EntryType,
        amount: Decimal,
        privileged: bool,
    ) -> Result<usize, DomainError> {
        self.balance = apply_posting(self.balance, entry, amount, privileged)?;
        self.statements.push(StatementAmount {
            entry_type: entry,
            status: StatementStatus::Active,
            amount,
        });
        Ok(self.statements.len() - 1)
    }

    fn delete(&mut self, index: usize) -> Result<(), DomainError> {
        self.statements[index].status.ensure_deletable()?;
        self.statements[index].status = StatementStatus::Deleted;
        self.balance = recompute_balance(self.opening, &self.statements);
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_post_reject_delete_scenario() {
        let mut account = Account::open(dec("1000"));

        let deposit = account.post(EntryType::In, dec("500"), false).unwrap();
        assert_eq!(account.balance, dec("1500"));

        let err = account.post(EntryType::Out, dec("2000"), false).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(_)));
        assert_eq!(account.balance, dec("1500"));
        assert_eq!(account.statements.len(), 1);

        account.delete(deposit).unwrap();
        assert_eq!(account.balance, dec("1000"));
    }

    #[test]
    fn test_privileged_overdraft() {
        let mut account = Account::open(dec("100"));
        account.post(EntryType::Out, dec("250"), true).unwrap();
        assert_eq!(account.balance, dec("-150"));
    }

    #[test]
    fn test_out_equal_to_balance_allowed() {
        let mut account = Account::open(dec("100"));
        account.post(EntryType::Out, dec("100"), false).unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        for amount in [Decimal::ZERO, dec("-1")] {
            assert!(matches!(
                apply_posting(dec("10"), EntryType::In, amount, true),
                Err(DomainError::Validation { .. })
            ));
        }
    }

    #[test]
    fn test_deleting_twice_rejected() {
        let mut account = Account::open(Decimal::ZERO);
        let i = account.post(EntryType::In, dec("10"), false).unwrap();
        account.delete(i).unwrap();
        assert!(matches!(
            account.delete(i),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert_eq!(account.balance, Decimal::ZERO);
    }

    #[test]
    fn test_category_direction() {
        assert!(CategoryType::In.admits(EntryType::In));
        assert!(!CategoryType::In.admits(EntryType::Out));
        assert!(CategoryType::Out.admits(EntryType::Out));
        assert!(!CategoryType::Out.admits(EntryType::In));
        assert!(CategoryType::Both.admits(EntryType::In));
        assert!(CategoryType::Both.admits(EntryType::Out));
    }

    #[test]
    fn test_inactive_account_refuses_postings() {
        assert!(AccountStatus::Active.ensure_postable().is_ok());
        assert!(matches!(
            AccountStatus::Inactive.ensure_postable(),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!("in".parse::<EntryType>().unwrap(), EntryType::In);
        assert_eq!(EntryType::Out.as_str(), "OUT");
        assert_eq!("BOTH".parse::<CategoryType>().unwrap(), CategoryType::Both);
        assert!("SIDEWAYS".parse::<EntryType>().is_err());
    }
}

#[derive(Debug, Clone)]
enum Op {
    Post(EntryType, Decimal, bool),
    Delete(prop::sample::Index),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let amount = (1i64..500_000).prop_map(|cents| Decimal::new(cents, 2));
    let entry = prop_oneof![Just(EntryType::In), Just(EntryType::Out)];
    prop_oneof![
        3 => (entry, amount, any::<bool>()).prop_map(|(e, a, p)| Op::Post(e, a, p)),
        1 => any::<prop::sample::Index>().prop_map(Op::Delete),
    ]
}

proptest! {
    /// After any mix of postings and deletions the balance equals opening
    /// plus active IN minus active OUT
    #[test]
    fn prop_balance_matches_active_statements(
        opening in (0i64..1_000_000).prop_map(|c| Decimal::new(c, 2)),
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let mut account = Account::open(opening);

        for op in ops {
            match op {
                Op::Post(entry, amount, privileged) => {
                    let before = (account.balance, account.statements.len());
                    if account.post(entry, amount, privileged).is_err() {
                        prop_assert_eq!((account.balance, account.statements.len()), before);
                    }
                }
                Op::Delete(pick) => {
                    if !account.statements.is_empty() {
                        let i = pick.index(account.statements.len());
                        let _ = account.delete(i);
                    }
                }
            }

            let expected = account.statements.iter()
                .filter(|s| s.status == StatementStatus::Active)
                .fold(opening, |b, s| match s.entry_type {
                    EntryType::In => b + s.amount,
                    EntryType::Out => b - s.amount,
                });
            prop_assert_eq!(account.balance, expected);
        }
    }

    /// Without privilege the balance never drops below zero through postings
    #[test]
    fn prop_unprivileged_never_overdraws(
        opening in (0i64..100_000).prop_map(|c| Decimal::new(c, 2)),
        posts in prop::collection::vec(
            (
                prop_oneof![Just(EntryType::In), Just(EntryType::Out)],
                (1i64..100_000).prop_map(|c| Decimal::new(c, 2)),
            ),
            0..60,
        ),
    ) {
        let mut balance = opening;
        for (entry, amount) in posts {
            if let Ok(next) = apply_posting(balance, entry, amount, false) {
                balance = next;
            }
            prop_assert!(balance >= Decimal::ZERO);
        }
    }
}
