//! Supplier ledger models
//!
//! The ledger is an append-only journal per vendor. Every row stores the
//! running balance owed to the vendor after that row: credit raises what is
//! owed and debit lowers it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{text_enum, DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerTransactionType {
    Purchase,
    Payment,
    PurchaseReturn,
    OpeningBalance,
}

text_enum!(LedgerTransactionType, "ledger transaction type", {
    Purchase => "PURCHASE",
    Payment => "PAYMENT",
    PurchaseReturn => "PURCHASE_RETURN",
    OpeningBalance => "OPENING_BALANCE",
});

/// A ledger row waiting for its running balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerPosting {
    pub transaction_type: LedgerTransactionType,
    pub debit: Decimal,
    pub credit: Decimal,
    pub reference_no: Option<String>,
    pub description: String,
}

impl LedgerPosting {
    /// Unpaid part of a confirmed GRN
    pub fn purchase(due: Decimal, grn_no: &str, invoice_no: Option<&str>) -> Self {
        LedgerPosting {
            transaction_type: LedgerTransactionType::Purchase,
            debit: Decimal::ZERO,
            credit: due,
            reference_no: Some(grn_no.to_string()),
            description: format!(
                "Purchase GRN: {}, Inv: {}",
                grn_no,
                invoice_no.unwrap_or("-")
            ),
        }
    }

    /// Credit value of stock entered directly, outside a GRN
    pub fn stock_entry(amount: Decimal, batch_number: &str) -> Self {
        LedgerPosting {
            transaction_type: LedgerTransactionType::Purchase,
            debit: Decimal::ZERO,
            credit: amount,
            reference_no: Some(batch_number.to_string()),
            description: format!("Stock entry batch: {}", batch_number),
        }
    }

    pub fn purchase_return(total: Decimal, return_no: &str, grn_no: &str) -> Self {
        LedgerPosting {
            transaction_type: LedgerTransactionType::PurchaseReturn,
            debit: total,
            credit: Decimal::ZERO,
            reference_no: Some(return_no.to_string()),
            description: format!("Purchase Return: {} against GRN: {}", return_no, grn_no),
        }
    }

    pub fn payment(amount: Decimal, reference_no: Option<&str>) -> Self {
        LedgerPosting {
            transaction_type: LedgerTransactionType::Payment,
            debit: amount,
            credit: Decimal::ZERO,
            reference_no: reference_no.map(str::to_string),
            description: match reference_no {
                Some(reference) => format!("Payment Ref: {}", reference),
                None => "Payment".to_string(),
            },
        }
    }

    pub fn opening_balance(amount: Decimal) -> Self {
        LedgerPosting {
            transaction_type: LedgerTransactionType::OpeningBalance,
            debit: Decimal::ZERO,
            credit: amount,
            reference_no: None,
            description: "Opening balance".to_string(),
        }
    }

    /// Balance after this row given the vendor's latest balance
    pub fn balance_after(&self, previous: Decimal) -> Decimal {
        next_balance(previous, self.debit, self.credit)
    }
}

/// Running balance after one ledger row
pub fn next_balance(previous: Decimal, debit: Decimal, credit: Decimal) -> Decimal {
    previous - debit + credit
}

/// Stored ledger row reduced to its amounts, in insertion order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerLine {
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

/// Check that every stored balance follows from the one before it, starting at 0.
///
/// Returns the index of the first row that breaks the chain.
pub fn find_balance_break(lines: &[LedgerLine]) -> Option<usize> {
    let mut previous = Decimal::ZERO;
    for (i, line) in lines.iter().enumerate() {
        if line.balance != next_balance(previous, line.debit, line.credit) {
            return Some(i);
        }
        previous = line.balance;
    }
    None
}

/// Validate a vendor payment amount
pub fn validate_payment_amount(amount: Decimal) -> DomainResult<()> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation(
            "amount",
            "Payment amount must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(debit: &str, credit: &str, balance: &str) -> LedgerLine {
        LedgerLine {
            debit: dec(debit),
            credit: dec(credit),
            balance: dec(balance),
        }
    }

    #[test]
    fn test_purchase_raises_amount_owed() {
        let posting = LedgerPosting::purchase(dec("3500"), "GRN-1", Some("INV-9"));
        assert_eq!(posting.balance_after(dec("1000")), dec("4500"));
        assert_eq!(posting.description, "Purchase GRN: GRN-1, Inv: INV-9");
    }

    #[test]
    fn test_stock_entry_books_credit() {
        let posting = LedgerPosting::stock_entry(dec("750"), "B007");
        assert_eq!(posting.transaction_type, LedgerTransactionType::Purchase);
        assert_eq!(posting.balance_after(dec("250")), dec("1000"));
        assert_eq!(posting.reference_no.as_deref(), Some("B007"));
    }

    #[test]
    fn test_return_and_payment_lower_amount_owed() {
        let ret = LedgerPosting::purchase_return(dec("200"), "PR-1", "GRN-1");
        assert_eq!(ret.balance_after(dec("4500")), dec("4300"));

        let pay = LedgerPosting::payment(dec("300"), None);
        assert_eq!(pay.balance_after(dec("4300")), dec("4000"));
        assert_eq!(pay.transaction_type, LedgerTransactionType::Payment);
    }

    #[test]
    fn test_balance_chain_detects_tampered_row() {
        let mut lines = vec![
            line("0", "100", "100"),
            line("40", "0", "60"),
            line("0", "15", "75"),
        ];
        assert_eq!(find_balance_break(&lines), None);

        lines[1].balance = dec("61");
        assert_eq!(find_balance_break(&lines), Some(1));
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        assert!(validate_payment_amount(dec("0")).is_err());
        assert!(validate_payment_amount(dec("0.01")).is_ok());
    }
}
