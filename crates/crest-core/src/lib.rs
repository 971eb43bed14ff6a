//! # crest-core: Pure Business Logic for Crest POS
//!
//! This crate is the heart of Crest POS. It contains the domain model and
//! all business rules as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Crest POS Architecture                         │
//! │                                                                     │
//! │  External collaborator (UI / API, not in this workspace)            │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │               ★ crest-core (THIS CRATE) ★                     │ │
//! │  │                                                               │ │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────────┐        │ │
//! │  │   │  types  │ │  money  │ │ quantity │ │ validation │        │ │
//! │  │   │ Product │ │  Money  │ │ Quantity │ │   rules    │        │ │
//! │  │   │  Sale   │ │  cents  │ │  milli   │ │   checks   │        │ │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────────┘        │ │
//! │  │                                                               │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  crest-db: SQLite repositories + transactional sale workflow        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, Payment, ...)
//! - [`money`] - Integer-cents money arithmetic (no floating point!)
//! - [`quantity`] - Fractional sale quantities in milli-units
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: deterministic, side-effect free
//! 2. **Integer money**: all monetary values are cents (i64)
//! 3. **Explicit errors**: typed errors, never strings or panics

pub mod error;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;
