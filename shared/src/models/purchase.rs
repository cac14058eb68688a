//! Purchase (GRN) models

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{text_enum, DomainError, DomainResult};

/// Lifecycle of a goods received note
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Confirmed,
    Cancelled,
}

text_enum!(PurchaseStatus, "purchase status", {
    Draft => "DRAFT",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
});

/// How the supplier is being paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    #[default]
    #[serde(alias = "Cash")]
    Cash,
    #[serde(alias = "Credit")]
    Credit,
}

text_enum!(PaymentType, "payment type", {
    Cash => "CASH",
    Credit => "CREDIT",
});

impl PurchaseStatus {
    /// Check that a GRN currently stored as `self` may be saved again as `target`.
    ///
    /// Only drafts are editable. Confirmation applies stock, cost and ledger
    /// effects, so a confirmed or cancelled GRN is final.
    pub fn ensure_can_save_as(&self, target: PurchaseStatus) -> DomainResult<()> {
        match self {
            PurchaseStatus::Draft => Ok(()),
            other => Err(DomainError::InvalidStateTransition(format!(
                "GRN is {} and cannot be saved as {}",
                other, target
            ))),
        }
    }

    /// Whether saving with this status applies inventory and ledger effects
    pub fn applies_effects(&self) -> bool {
        matches!(self, PurchaseStatus::Confirmed)
    }
}

/// Amount left owing to the supplier after a purchase
pub fn purchase_due(grand_total: Decimal, paid_amount: Decimal) -> DomainResult<Decimal> {
    if grand_total < Decimal::ZERO {
        return Err(DomainError::validation(
            "grand_total",
            "Grand total cannot be negative",
        ));
    }
    if paid_amount < Decimal::ZERO {
        return Err(DomainError::validation(
            "paid_amount",
            "Paid amount cannot be negative",
        ));
    }
    if paid_amount > grand_total {
        return Err(DomainError::validation(
            "paid_amount",
            "Paid amount cannot exceed grand total",
        ));
    }
    Ok(grand_total - paid_amount)
}

/// Total value of a purchase return
pub fn return_total(line_totals: &[Decimal]) -> DomainResult<Decimal> {
    if line_totals.iter().any(|t| *t < Decimal::ZERO) {
        return Err(DomainError::validation(
            "line_total",
            "Line total cannot be negative",
        ));
    }
    Ok(line_totals.iter().sum())
}

/// What one purchase line can still send back to the supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnableLine {
    pub medicine_id: i64,
    pub batch_no: String,
    /// Paid plus free units received on the GRN
    pub received: i64,
    /// Units already sent back by earlier returns
    pub returned: i64,
}

/// Requested return quantity for one medicine batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnRequestLine {
    pub medicine_id: i64,
    pub batch_no: String,
    pub qty: i32,
}

/// Check that a return only sends back what the GRN received.
///
/// Lines for the same medicine batch are added together before comparing.
/// Asking for more than is still returnable is `InsufficientStock`.
pub fn check_return_quantities(
    returnable: &[ReturnableLine],
    requested: &[ReturnRequestLine],
) -> DomainResult<()> {
    if requested.is_empty() {
        return Err(DomainError::validation(
            "items",
            "Return requires at least one item",
        ));
    }

    let mut wanted: HashMap<(i64, &str), i64> = HashMap::new();
    for line in requested {
        if line.qty <= 0 {
            return Err(DomainError::validation(
                "qty",
                "Return quantity must be greater than zero",
            ));
        }
        *wanted
            .entry((line.medicine_id, line.batch_no.as_str()))
            .or_insert(0) += i64::from(line.qty);
    }

    for ((medicine_id, batch_no), qty) in wanted {
        let matching: Vec<&ReturnableLine> = returnable
            .iter()
            .filter(|r| r.medicine_id == medicine_id && r.batch_no == batch_no)
            .collect();
        if matching.is_empty() {
            return Err(DomainError::validation(
                "items",
                format!(
                    "Batch {} of medicine {} is not on this purchase",
                    batch_no, medicine_id
                ),
            ));
        }
        let available: i64 = matching.iter().map(|r| r.received - r.returned).sum();
        if qty > available {
            return Err(DomainError::InsufficientStock(format!(
                "Return of {} units for batch {} exceeds the {} units still returnable",
                qty, batch_no, available
            )));
        }
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

    #[test]
    fn test_draft_can_be_resaved_or_confirmed() {
        assert!(PurchaseStatus::Draft.ensure_can_save_as(PurchaseStatus::Draft).is_ok());
        assert!(PurchaseStatus::Draft.ensure_can_save_as(PurchaseStatus::Confirmed).is_ok());
    }

    #[test]
    fn test_confirmed_is_final() {
        let err = PurchaseStatus::Confirmed
            .ensure_can_save_as(PurchaseStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        assert!(PurchaseStatus::Cancelled
            .ensure_can_save_as(PurchaseStatus::Draft)
            .is_err());
    }

    #[test]
    fn test_only_confirmation_applies_effects() {
        assert!(PurchaseStatus::Confirmed.applies_effects());
        assert!(!PurchaseStatus::Draft.applies_effects());
        assert!(!PurchaseStatus::Cancelled.applies_effects());
    }

    #[test]
    fn test_due_is_unpaid_part() {
        assert_eq!(purchase_due(dec("5000"), dec("1500")), Ok(dec("3500")));
        assert_eq!(purchase_due(dec("5000"), dec("5000")), Ok(Decimal::ZERO));
        assert!(purchase_due(dec("100"), dec("150")).is_err());
    }

    #[test]
    fn test_payment_type_accepts_legacy_casing() {
        let parsed: PaymentType = serde_json::from_str("\"Credit\"").unwrap();
        assert_eq!(parsed, PaymentType::Credit);
        assert_eq!("Cash".parse::<PaymentType>(), Ok(PaymentType::Cash));
    }

    #[test]
    fn test_return_total_sums_lines() {
        assert_eq!(return_total(&[dec("10.50"), dec("4.50")]), Ok(dec("15.00")));
        assert!(return_total(&[dec("-1")]).is_err());
    }

    fn returnable() -> Vec<ReturnableLine> {
        vec![ReturnableLine {
            medicine_id: 1,
            batch_no: "B001".to_string(),
            received: 110,
            returned: 20,
        }]
    }

    fn ret(medicine_id: i64, batch_no: &str, qty: i32) -> ReturnRequestLine {
        ReturnRequestLine {
            medicine_id,
            batch_no: batch_no.to_string(),
            qty,
        }
    }

    #[test]
    fn test_return_within_received_quantity() {
        assert!(check_return_quantities(&returnable(), &[ret(1, "B001", 90)]).is_ok());
    }

    #[test]
    fn test_return_lines_for_same_batch_are_summed() {
        let lines = [ret(1, "B001", 50), ret(1, "B001", 41)];
        assert!(matches!(
            check_return_quantities(&returnable(), &lines),
            Err(DomainError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_return_above_received_is_insufficient_stock() {
        let received = [ReturnableLine {
            medicine_id: 1,
            batch_no: "B001".to_string(),
            received: 100,
            returned: 0,
        }];
        assert!(matches!(
            check_return_quantities(&received, &[ret(1, "B001", 150)]),
            Err(DomainError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_return_of_batch_not_on_grn_rejected() {
        assert!(check_return_quantities(&returnable(), &[ret(1, "B999", 1)]).is_err());
        assert!(check_return_quantities(&returnable(), &[ret(2, "B001", 1)]).is_err());
    }

    #[test]
    fn test_return_needs_positive_lines() {
        assert!(check_return_quantities(&returnable(), &[]).is_err());
        assert!(check_return_quantities(&returnable(), &[ret(1, "B001", 0)]).is_err());
    }
}
