//! # Crest DB
//!
//! SQLite persistence layer for Crest POS.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       crest-db                           │
//! │                                                          │
//! │   Database ──┬── catalog()   → ProductRepository         │
//! │   (pool)     ├── customers() → CustomerRepository        │
//! │              └── sales()     → SaleWorkflow              │
//! │                                                          │
//! │   repository::sequence → document numbers, called from   │
//! │   inside the repositories' own transactions              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! - Every multi-row mutation is one transaction
//! - Status transitions and stock deltas are guarded UPDATEs, so a lost
//!   race means zero affected rows, never a double post
//! - Monetary amounts are integer cents end to end

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod workflow;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::product::{NewProduct, ProductRepository};
pub use workflow::{CandidateItem, SaleWithItems, SaleWorkflow};
