//! Validation utilities for the Gelateria Management Platform
//!
//! Input checks shared by the batch/template workflows and the account
//! endpoints. Everything here is rejected before any write begins.

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Production & Warehouse Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a price is not negative (zero means "unpriced", which is allowed)
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate that a recipe's nominal batch yield is usable for scaling
pub fn validate_batch_yield(yield_quantity: Decimal) -> Result<(), &'static str> {
    if yield_quantity <= Decimal::ZERO {
        return Err("Batch yield must be positive");
    }
    Ok(())
}

/// Validate an inclusive date range (template application, HACCP auto-fill)
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if end < start {
        return Err("End date cannot be before start date");
    }
    Ok(())
}

/// Number of days in an inclusive date range
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Validate the mandatory reason for voiding a HACCP record
pub fn validate_void_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("A reason is required to void a record");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate a lot code: non-empty, printable, at most 50 characters
pub fn validate_lot_code(code: &str) -> Result<(), &'static str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err("Lot code cannot be empty");
    }
    if trimmed.len() > 50 {
        return Err("Lot code must be at most 50 characters");
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
    fn quantities_must_be_positive() {
        assert!(validate_positive_quantity(dec("0.001")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1")).is_err());
    }

    #[test]
    fn zero_price_is_unpriced_not_invalid() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(dec("-0.01")).is_err());
    }

    #[test]
    fn date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        assert!(validate_date_range(start, end).is_ok());
        assert!(validate_date_range(start, start).is_ok());
        assert!(validate_date_range(end, start).is_err());
        assert_eq!(days_in_range(start, end), 3);
        assert_eq!(days_in_range(start, start), 1);
    }

    #[test]
    fn void_reason_must_not_be_blank() {
        assert!(validate_void_reason("sonda guasta").is_ok());
        assert!(validate_void_reason("").is_err());
        assert!(validate_void_reason("   ").is_err());
    }
}
