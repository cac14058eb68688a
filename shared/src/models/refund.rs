//! Refund models and planning

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{text_enum, DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefundType {
    Full,
    Partial,
}

text_enum!(RefundType, "refund type", {
    Full => "FULL",
    Partial => "PARTIAL",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(RefundStatus, "refund status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl RefundStatus {
    /// Move a pending refund to `target`. Approved and rejected refunds are final.
    pub fn transition(&self, target: RefundStatus) -> DomainResult<RefundStatus> {
        match (self, target) {
            (RefundStatus::Pending, RefundStatus::Approved | RefundStatus::Rejected) => Ok(target),
            (current, target) => Err(DomainError::InvalidStateTransition(format!(
                "Refund is {} and cannot become {}",
                current, target
            ))),
        }
    }

    /// Pending and approved refunds count against the sold quantity
    pub fn holds_quantity(&self) -> bool {
        !matches!(self, RefundStatus::Rejected)
    }
}

/// A sold line as stored on the bill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoldLine {
    pub sale_item_id: i64,
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Quantity the customer asks to return for one sold line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundRequestLine {
    pub sale_item_id: i64,
    pub quantity: i32,
}

/// One line of an accepted refund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundLine {
    pub sale_item_id: i64,
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Amount and lines of a refund ready to be stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundPlan {
    pub refund_type: RefundType,
    pub amount: Decimal,
    pub lines: Vec<RefundLine>,
}

/// Refund the whole bill.
///
/// The amount is the bill's grand total and every sold line goes back to stock.
/// Not allowed once any line of the bill is already in an open or approved refund.
pub fn plan_full_refund(
    sold: &[SoldLine],
    bill_total: Decimal,
    already_refunded: &HashMap<i64, i32>,
) -> DomainResult<RefundPlan> {
    if already_refunded.values().any(|q| *q > 0) {
        return Err(DomainError::validation(
            "refund_type",
            "Bill already has a refund; request a partial refund for the remaining items",
        ));
    }
    if sold.is_empty() {
        return Err(DomainError::validation("bill_id", "Bill has no items"));
    }

    let lines = sold
        .iter()
        .map(|line| RefundLine {
            sale_item_id: line.sale_item_id,
            medicine_id: line.medicine_id,
            batch_number: line.batch_number.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: Decimal::from(line.quantity) * line.unit_price,
        })
        .collect();

    Ok(RefundPlan {
        refund_type: RefundType::Full,
        amount: bill_total,
        lines,
    })
}

/// Refund selected quantities of selected lines.
///
/// Each requested quantity must be positive and must fit in what was sold minus
/// what earlier pending or approved refunds already claim. Any bad line rejects
/// the whole request.
pub fn plan_partial_refund(
    sold: &[SoldLine],
    requested: &[RefundRequestLine],
    already_refunded: &HashMap<i64, i32>,
) -> DomainResult<RefundPlan> {
    if requested.is_empty() {
        return Err(DomainError::validation(
            "items",
            "Partial refund requires at least one item",
        ));
    }

    let by_id: HashMap<i64, &SoldLine> = sold.iter().map(|l| (l.sale_item_id, l)).collect();
    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(requested.len());

    for request in requested {
        if !seen.insert(request.sale_item_id) {
            return Err(DomainError::validation(
                "items",
                format!("Sale item {} listed more than once", request.sale_item_id),
            ));
        }
        let line = by_id.get(&request.sale_item_id).ok_or_else(|| {
            DomainError::validation(
                "items",
                format!("Sale item {} is not on this bill", request.sale_item_id),
            )
        })?;
        if request.quantity <= 0 {
            return Err(DomainError::validation(
                "quantity",
                "Refund quantity must be greater than zero",
            ));
        }
        let claimed = already_refunded
            .get(&request.sale_item_id)
            .copied()
            .unwrap_or(0);
        let refundable = line.quantity - claimed;
        if request.quantity > refundable {
            return Err(DomainError::validation(
                "quantity",
                format!(
                    "Refund quantity {} exceeds refundable quantity {} for sale item {}",
                    request.quantity, refundable, request.sale_item_id
                ),
            ));
        }
        lines.push(RefundLine {
            sale_item_id: line.sale_item_id,
            medicine_id: line.medicine_id,
            batch_number: line.batch_number.clone(),
            quantity: request.quantity,
            unit_price: line.unit_price,
            amount: Decimal::from(request.quantity) * line.unit_price,
        });
    }

    let amount = lines.iter().map(|l| l.amount).sum();
    Ok(RefundPlan {
        refund_type: RefundType::Partial,
        amount,
        lines,
    })
}

/// Rejections must say why
pub fn validate_admin_remarks(remarks: Option<&str>) -> DomainResult<&str> {
    match remarks.map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(DomainError::validation(
            "admin_remarks",
            "Admin remarks are required to reject a refund",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn req(sale_item_id: i64, quantity: i32) -> RefundRequestLine {
        RefundRequestLine {
            sale_item_id,
            quantity,
        }
    }

    fn bill() -> Vec<SoldLine> {
        vec![
            SoldLine {
                sale_item_id: 1,
                medicine_id: 10,
                batch_number: "B001".to_string(),
                quantity: 30,
                unit_price: dec("5.00"),
            },
            SoldLine {
                sale_item_id: 2,
                medicine_id: 11,
                batch_number: "C100".to_string(),
                quantity: 2,
                unit_price: dec("120.00"),
            },
        ]
    }

    #[test]
    fn test_full_refund_uses_bill_total() {
        let plan = plan_full_refund(&bill(), dec("380.00"), &HashMap::new()).unwrap();
        assert_eq!(plan.amount, dec("380.00"));
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].quantity, 30);
    }

    #[test]
    fn test_full_refund_blocked_by_earlier_refund() {
        let claimed = HashMap::from([(2, 1)]);
        assert!(plan_full_refund(&bill(), dec("380.00"), &claimed).is_err());
    }

    #[test]
    fn test_partial_refund_amount_from_unit_price() {
        let plan = plan_partial_refund(&bill(), &[req(1, 4)], &HashMap::new()).unwrap();
        assert_eq!(plan.amount, dec("20.00"));
        assert_eq!(plan.lines[0].batch_number, "B001");
    }

    #[test]
    fn test_partial_refund_over_sold_quantity_rejected() {
        let result = plan_partial_refund(&bill(), &[req(1, 1), req(2, 3)], &HashMap::new());
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_partial_refund_counts_earlier_claims() {
        let claimed = HashMap::from([(1, 28)]);
        let over = [req(1, 3)];
        assert!(plan_partial_refund(&bill(), &over, &claimed).is_err());
        let fits = [req(1, 2)];
        assert!(plan_partial_refund(&bill(), &fits, &claimed).is_ok());
    }

    #[test]
    fn test_partial_refund_rejects_unknown_and_duplicate_lines() {
        let unknown = [req(99, 1)];
        assert!(plan_partial_refund(&bill(), &unknown, &HashMap::new()).is_err());
        let dup = [req(1, 1), req(1, 1)];
        assert!(plan_partial_refund(&bill(), &dup, &HashMap::new()).is_err());
    }

    #[test]
    fn test_rejected_refunds_release_quantity() {
        assert!(RefundStatus::Pending.holds_quantity());
        assert!(RefundStatus::Approved.holds_quantity());
        assert!(!RefundStatus::Rejected.holds_quantity());
    }

    #[test]
    fn test_only_pending_refunds_can_be_decided() {
        assert_eq!(
            RefundStatus::Pending.transition(RefundStatus::Approved),
            Ok(RefundStatus::Approved)
        );
        assert!(RefundStatus::Approved.transition(RefundStatus::Approved).is_err());
        assert!(RefundStatus::Rejected.transition(RefundStatus::Approved).is_err());
        assert!(RefundStatus::Pending.transition(RefundStatus::Pending).is_err());
    }

    #[test]
    fn test_rejection_needs_remarks() {
        assert!(validate_admin_remarks(None).is_err());
        assert!(validate_admin_remarks(Some("   ")).is_err());
        assert_eq!(validate_admin_remarks(Some(" damaged ")), Ok("damaged"));
    }
}
