//! # Validation Module
//!
//! Input validation for Crest POS.
//!
//! Runs before business logic and before any transaction is opened; the
//! storage schema (NOT NULL, UNIQUE, foreign keys) is the second line of
//! defense.

use crate::error::ValidationError;
use crate::quantity::Quantity;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum line items in one sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item, in whole units.
/// Guards against typos (1000 instead of 10), configurable later.
pub const MAX_ITEM_UNITS: i64 = 999;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business code (product "P001", customer "C001").
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Letters, numbers, hyphens and underscores only
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product or customer display name (1..=200 characters).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query. May be empty (lists everything); trimmed
/// result is returned.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_ITEM_UNITS whole units
pub fn validate_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty.units_ceil() > MAX_ITEM_UNITS {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_UNITS,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount amount. Opaque input, but never negative.
pub fn validate_discount_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount. Zero-value payments are meaningless.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a candidate item list for sale creation.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("P001").is_ok());
        assert!(validate_code("cust_7-a").is_ok());

        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Rice 1kg").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(Quantity::from_units(1)).is_ok());
        assert!(validate_quantity(Quantity::from_milli(500)).is_ok());
        assert!(validate_quantity(Quantity::from_units(999)).is_ok());

        assert!(validate_quantity(Quantity::from_units(0)).is_err());
        assert!(validate_quantity(Quantity::from_milli(-1)).is_err());
        assert!(validate_quantity(Quantity::from_units(1000)).is_err());
    }

    #[test]
    fn test_validate_prices_and_payments() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());

        assert!(validate_discount_cents(0).is_ok());
        assert!(validate_discount_cents(-100).is_err());

        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(validate_item_count(MAX_SALE_ITEMS).is_ok());
        assert!(validate_item_count(0).is_err());
        assert!(validate_item_count(MAX_SALE_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  rice ").unwrap(), "rice");
        assert!(validate_search_query(&"a".repeat(200)).is_err());
    }
}
