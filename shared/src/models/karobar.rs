//! Karobar cash-account ledger models
//!
//! An account's `current_balance` must always equal its opening balance plus
//! active IN statements minus active OUT statements. Posting keeps it in step
//! incrementally; deleting a statement recomputes it from the statements.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{text_enum, DomainError, DomainResult};

/// Direction of a statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    In,
    Out,
}

text_enum!(EntryType, "entry type", {
    In => "IN",
    Out => "OUT",
});

/// Which directions a category may be used for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    In,
    Out,
    Both,
}

text_enum!(CategoryType, "category type", {
    In => "IN",
    Out => "OUT",
    Both => "BOTH",
});

impl CategoryType {
    pub fn admits(&self, entry: EntryType) -> bool {
        matches!(
            (self, entry),
            (CategoryType::Both, _)
                | (CategoryType::In, EntryType::In)
                | (CategoryType::Out, EntryType::Out)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementStatus {
    Active,
    Deleted,
}

text_enum!(StatementStatus, "statement status", {
    Active => "ACTIVE",
    Deleted => "DELETED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

text_enum!(AccountStatus, "account status", {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
});

/// Balance after posting `amount` in direction `entry`.
///
/// OUT postings may not take the balance below zero unless `privileged`.
pub fn apply_posting(
    balance: Decimal,
    entry: EntryType,
    amount: Decimal,
    privileged: bool,
) -> DomainResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation(
            "amount",
            "Amount must be greater than zero",
        ));
    }
    match entry {
        EntryType::In => Ok(balance + amount),
        EntryType::Out => {
            if amount > balance && !privileged {
                return Err(DomainError::InsufficientFunds(format!(
                    "balance {} is less than {}",
                    balance, amount
                )));
            }
            Ok(balance - amount)
        }
    }
}

/// Amount-bearing part of a stored statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatementAmount {
    pub entry_type: EntryType,
    pub status: StatementStatus,
    pub amount: Decimal,
}

/// Account balance derived from its statements. Deleted statements are ignored.
pub fn recompute_balance(opening_balance: Decimal, statements: &[StatementAmount]) -> Decimal {
    statements
        .iter()
        .filter(|s| s.status == StatementStatus::Active)
        .fold(opening_balance, |balance, s| match s.entry_type {
            EntryType::In => balance + s.amount,
            EntryType::Out => balance - s.amount,
        })
}

impl StatementStatus {
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        match self {
            StatementStatus::Active => Ok(()),
            StatementStatus::Deleted => Err(DomainError::InvalidStateTransition(
                "Statement already deleted".to_string(),
            )),
        }
    }
}

impl AccountStatus {
    pub fn ensure_postable(&self) -> DomainResult<()> {
        match self {
            AccountStatus::Active => Ok(()),
            AccountStatus::Inactive => Err(DomainError::validation(
                "account_id",
                "Account is inactive",
            )),
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

    fn stmt(entry_type: EntryType, status: StatementStatus, amount: &str) -> StatementAmount {
        StatementAmount {
            entry_type,
            status,
            amount: dec(amount),
        }
    }

    #[test]
    fn test_in_adds_out_subtracts() {
        assert_eq!(apply_posting(dec("1000"), EntryType::In, dec("500"), false), Ok(dec("1500")));
        assert_eq!(apply_posting(dec("1500"), EntryType::Out, dec("1500"), false), Ok(dec("0")));
    }

    #[test]
    fn test_overdraft_needs_privilege() {
        let err = apply_posting(dec("1500"), EntryType::Out, dec("2000"), false).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(_)));
        assert_eq!(apply_posting(dec("1500"), EntryType::Out, dec("2000"), true), Ok(dec("-500")));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(apply_posting(dec("10"), EntryType::In, dec("0"), true).is_err());
        assert!(apply_posting(dec("10"), EntryType::Out, dec("-1"), true).is_err());
    }

    #[test]
    fn test_recompute_ignores_deleted_statements() {
        let statements = vec![
            stmt(EntryType::In, StatementStatus::Deleted, "500"),
            stmt(EntryType::Out, StatementStatus::Active, "200"),
            stmt(EntryType::In, StatementStatus::Active, "50"),
        ];
        assert_eq!(recompute_balance(dec("1000"), &statements), dec("850"));
    }

    #[test]
    fn test_category_admits_matching_direction() {
        assert!(CategoryType::Both.admits(EntryType::In));
        assert!(CategoryType::Both.admits(EntryType::Out));
        assert!(CategoryType::In.admits(EntryType::In));
        assert!(!CategoryType::In.admits(EntryType::Out));
        assert!(!CategoryType::Out.admits(EntryType::In));
    }

    #[test]
    fn test_statement_deleted_once() {
        assert!(StatementStatus::Active.ensure_deletable().is_ok());
        assert!(StatementStatus::Deleted.ensure_deletable().is_err());
    }

    #[test]
    fn test_inactive_account_not_postable() {
        assert!(AccountStatus::Active.ensure_postable().is_ok());
        assert!(AccountStatus::Inactive.ensure_postable().is_err());
    }
}
