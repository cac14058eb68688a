//! Business logic services for the pharmacy POS backend

pub mod karobar;
pub mod medicine;
pub mod password_reset;
pub mod purchase;
pub mod refund;
pub mod sales;
pub mod stock;
pub mod supplier_ledger;

pub use karobar::KarobarService;
pub use medicine::MedicineService;
pub use password_reset::PasswordResetService;
pub use purchase::PurchaseService;
pub use refund::RefundService;
pub use sales::SalesService;
pub use supplier_ledger::SupplierLedgerService;

/// Document number such as `GRN-1767225600000-3f9a1c`: prefix, creation
/// millis and a random suffix so numbers issued in the same millisecond differ
pub(crate) fn document_number(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

/// Batch number as stored: surrounding whitespace removed, never empty
pub(crate) fn batch_key(batch_no: &str) -> crate::error::AppResult<&str> {
    shared::validate_batch_number(batch_no)
        .map_err(|msg| crate::error::AppError::validation("batch_no", msg))?;
    Ok(batch_no.trim())
}

/// Quantity moving stock out or back in
pub(crate) fn line_quantity(quantity: i32) -> crate::error::AppResult<i64> {
    shared::validate_line_quantity(quantity)
        .map_err(|msg| crate::error::AppError::validation("quantity", msg))?;
    Ok(i64::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_document_numbers_are_distinct() {
        let a = document_number("INV");
        let b = document_number("INV");
        assert!(a.starts_with("INV-"));
        assert_eq!(a.split('-').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_batch_key_is_trimmed() {
        assert_eq!(batch_key("  B001 ").unwrap(), "B001");
        assert!(matches!(batch_key("   "), Err(AppError::Validation { .. })));
        assert!(batch_key(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_line_quantity_must_be_positive() {
        assert_eq!(line_quantity(3).unwrap(), 3);
        assert!(matches!(line_quantity(0), Err(AppError::Validation { .. })));
        assert!(line_quantity(-1).is_err());
    }
}
