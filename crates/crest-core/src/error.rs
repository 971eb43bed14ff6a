//! # Error Types
//!
//! Domain-specific error types for crest-core.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ValidationError → CoreError ← DbError (mapped in crest-db)         │
//! │                                                                     │
//! │  Every failure is a recoverable condition with a human-readable     │
//! │  message; no error here should ever crash a hosting process.       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, id, amounts)
//! 3. Errors are enum variants, never bare strings
//! 4. Reads that find nothing return `Ok(None)`, not an error

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and workflow failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product absent or soft-deleted. A candidate line item naming a
    /// missing product aborts the whole sale creation.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer absent or soft-deleted.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale id does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Operation attempted from a terminal or wrong state.
    ///
    /// ## When This Occurs
    /// - Completing a sale twice (the idempotency boundary)
    /// - Cancelling a completed sale
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Completing the sale would drive stock negative.
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// A payment may never exceed the customer's current debt; overpaying
    /// is rejected, not clamped.
    #[error("Payment of {amount_cents} cents exceeds debt of {debt_cents} cents for customer {customer_id}")]
    PaymentExceedsDebt {
        customer_id: String,
        debt_cents: i64,
        amount_cents: i64,
    },

    /// The 3-digit document counter would overflow. The generator fails
    /// loudly instead of silently issuing a 4-digit code.
    #[error("Document sequence exhausted for {kind} (scope {scope}): counter past 999")]
    SequenceExhausted { kind: String, scope: String },

    /// Storage or transaction failure. The transaction has been rolled
    /// back; callers decide whether to retry.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad code characters, bad UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
