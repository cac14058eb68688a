//! Sales (billing) models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{text_enum, DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentCategory {
    #[default]
    Cash,
    Digital,
}

text_enum!(PaymentCategory, "payment category", {
    Cash => "CASH",
    Digital => "DIGITAL",
});

/// Validate one sold line and return its total.
///
/// A client-supplied total is kept when given; otherwise it is `quantity * unit_price`.
pub fn sale_line_total(
    quantity: i32,
    unit_price: Decimal,
    total_price: Option<Decimal>,
) -> DomainResult<Decimal> {
    if quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }
    if unit_price < Decimal::ZERO {
        return Err(DomainError::validation(
            "unit_price",
            "Unit price cannot be negative",
        ));
    }
    match total_price {
        Some(total) if total < Decimal::ZERO => Err(DomainError::validation(
            "total_price",
            "Total price cannot be negative",
        )),
        Some(total) => Ok(total),
        None => Ok(Decimal::from(quantity) * unit_price),
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
    fn test_line_total_defaults_to_quantity_times_price() {
        assert_eq!(sale_line_total(3, dec("12.50"), None), Ok(dec("37.50")));
        assert_eq!(sale_line_total(3, dec("12.50"), Some(dec("35"))), Ok(dec("35")));
    }

    #[test]
    fn test_line_quantity_must_be_positive() {
        assert!(sale_line_total(0, dec("1"), None).is_err());
        assert!(sale_line_total(-2, dec("1"), None).is_err());
    }
}
