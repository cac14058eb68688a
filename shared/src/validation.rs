//! Validation utilities for the Pharmacy POS engine
//!
//! Field-level checks shared by request validation in the backend.

use rust_decimal::Decimal;

// ============================================================================
// Money and Quantity Validations
// ============================================================================

/// Validate that an amount is strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Validate that an amount is zero or positive
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate a money value fits `NUMERIC(15,2)`
pub fn validate_money_scale(amount: Decimal) -> Result<(), &'static str> {
    if amount.normalize().scale() > 2 {
        return Err("Amount cannot have more than 2 decimal places");
    }
    if amount.abs() >= Decimal::from(10_000_000_000_000i64) {
        return Err("Amount is too large");
    }
    Ok(())
}

/// Validate a line quantity moving stock out or back in
pub fn validate_line_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate a batch number as printed on the pack
pub fn validate_batch_number(batch_no: &str) -> Result<(), &'static str> {
    let trimmed = batch_no.trim();
    if trimmed.is_empty() {
        return Err("Batch number is required");
    }
    if trimmed.len() > 50 {
        return Err("Batch number must be at most 50 characters");
    }
    Ok(())
}

/// Validate phone number format
/// Accepts: 9812345678, 98-1234-5678, +9779812345678
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Mobile: 10 digits starting with 9
    if digits.len() == 10 && digits.starts_with('9') {
        return Ok(());
    }
    // With country code 977
    if digits.len() == 13 && digits.starts_with("977") {
        return Ok(());
    }

    Err("Invalid phone number format")
}

/// Strip formatting from a phone number so lookups match stored values
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix("977") {
        Some(local) if local.len() == 10 => local.to_string(),
        _ => digits,
    }
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate a password reset code (6 digits)
pub fn validate_reset_code(code: &str) -> Result<(), &'static str> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Reset code must be 6 digits");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}
