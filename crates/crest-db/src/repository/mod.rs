//! # Repository Layer
//!
//! Database access organized by aggregate:
//! - [`product`]: catalog lookups, stock mutations
//! - [`customer`]: ledger parties, debt payments
//! - [`sequence`]: atomic document-number generation
//!
//! The sale lifecycle spans several aggregates at once and lives in
//! [`crate::workflow`] instead.

pub mod customer;
pub mod product;
pub mod sequence;
