//! # Domain Types
//!
//! Core domain types used throughout Crest POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐               │
//! │  │   Product    │  │     Sale     │  │   Customer   │               │
//! │  │ ──────────── │  │ ──────────── │  │ ──────────── │               │
//! │  │ id (UUID)    │  │ id (UUID)    │  │ id (UUID)    │               │
//! │  │ code "P001"  │  │ sale_number  │  │ code "C001"  │               │
//! │  │ tier prices  │  │ status       │  │ debt_cents   │               │
//! │  │ stock_qty    │  │ total_cents  │  │ credit_limit │               │
//! │  └──────────────┘  └──────┬───────┘  └──────────────┘               │
//! │                           │ owns (cascade)                          │
//! │                    ┌──────┴───────┐  ┌──────────────┐               │
//! │                    │   SaleItem   │  │   Payment    │               │
//! │                    │ price frozen │  │ paymt_number │               │
//! │                    └──────────────┘  └──────────────┘               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (code, sale_number, payment_number) - human-readable,
//!   generated by the document sequence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::quantity::Quantity;

/// Generates a fresh entity ID (UUID v4 as string).
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Price Tier
// =============================================================================

/// Selects which stored price column applies to a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    /// Walk-in retail price.
    Normal,
    /// Staff discount price.
    Employee,
    /// Bulk-buyer price.
    Wholesale,
}

impl PriceTier {
    /// Parses a tier label, falling back to `Normal` for anything unknown.
    ///
    /// Collaborators hand tiers across the boundary as strings; an
    /// unrecognized label must price at the normal tier rather than fail.
    pub fn from_label(label: &str) -> Self {
        match label {
            "employee" => PriceTier::Employee,
            "wholesale" => PriceTier::Wholesale,
            _ => PriceTier::Normal,
        }
    }
}

impl Default for PriceTier {
    fn default() -> Self {
        PriceTier::Normal
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Bank transfer.
    Transfer,
    /// On account: completing the sale increases the customer's debt.
    Credit,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// State machine: `Pending → {Completed, Cancelled}`, both terminal.
/// A sale is created once in `Pending`, mutated exactly once by either
/// completion or cancellation, and never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Created and priced, stock and debt untouched.
    Pending,
    /// Posted: stock decremented, debt increased for credit sales.
    Completed,
    /// Abandoned before posting. No side effects ever ran.
    Cancelled,
}

impl SaleStatus {
    /// Terminal states admit no further transition.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Cancelled)
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Document Kind
// =============================================================================

/// The kinds of human-readable document numbers the sequence generator
/// issues.
///
/// ## Formats
/// - Daily kinds reset each calendar day: `S20260823001`, `P20260823001`
/// - Global kinds count forever: `P001` (product), `C001` (customer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SaleNumber,
    PaymentNumber,
    ProductCode,
    CustomerCode,
}

impl DocumentKind {
    /// The single-letter prefix of codes of this kind.
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::SaleNumber => "S",
            DocumentKind::PaymentNumber => "P",
            DocumentKind::ProductCode => "P",
            DocumentKind::CustomerCode => "C",
        }
    }

    /// Daily kinds scope their counter to a calendar day; global kinds
    /// share one counter for the lifetime of the store.
    pub const fn is_daily(&self) -> bool {
        matches!(self, DocumentKind::SaleNumber | DocumentKind::PaymentNumber)
    }

    /// Stable identifier used as the counter key in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::SaleNumber => "sale_number",
            DocumentKind::PaymentNumber => "payment_number",
            DocumentKind::ProductCode => "product_code",
            DocumentKind::CustomerCode => "customer_code",
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, e.g. "P001". Unique, sequence-generated when absent.
    pub code: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Unit-of-measure label ("pcs", "kg").
    pub unit: String,

    /// Purchase cost in cents. Never used as a sale price; profit
    /// reporting only.
    pub cost_cents: i64,

    /// Walk-in retail price in cents.
    pub normal_cents: i64,

    /// Staff price in cents.
    pub employee_cents: i64,

    /// Bulk-buyer price in cents.
    pub wholesale_cents: i64,

    /// On-hand stock in whole units. Never negative after a completed sale.
    pub stock_qty: i64,

    /// Reorder threshold for the low-stock query.
    pub min_stock: i64,

    /// Soft-delete flag. Inactive products are invisible to lookups but
    /// keep historical sale items valid.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Resolves the unit price for a tier.
    #[inline]
    pub fn price_for(&self, tier: PriceTier) -> Money {
        let cents = match tier {
            PriceTier::Normal => self.normal_cents,
            PriceTier::Employee => self.employee_cents,
            PriceTier::Wholesale => self.wholesale_cents,
        };
        Money::from_cents(cents)
    }

    /// Checks whether the stock level is at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_qty <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A ledger party that can buy on credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,

    /// Business code, e.g. "C001".
    pub code: String,

    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,

    /// Advisory ceiling on `debt_cents`. Not enforced at posting time;
    /// breaches are logged by the workflow.
    pub credit_limit_cents: i64,

    /// Accumulated unpaid balance. Increased only by completed credit
    /// sales, decreased only by recorded payments.
    pub debt_cents: i64,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn debt(&self) -> Money {
        Money::from_cents(self.debt_cents)
    }

    #[inline]
    pub fn credit_limit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Per-day monotonic document number, `S{yyyymmdd}{NNN}`.
    pub sale_number: String,

    /// Optional ledger party. Required in practice for credit sales to
    /// have any effect.
    pub customer_id: Option<String>,

    /// Opaque id of the cashier posting the sale. Always passed in
    /// explicitly; there is no ambient current-user state.
    pub user_id: String,

    pub price_tier: PriceTier,
    pub payment_method: PaymentMethod,

    /// Sum of line totals in cents.
    pub subtotal_cents: i64,

    /// Opaque discount input; the workflow never computes it.
    pub discount_cents: i64,

    /// `subtotal - discount`.
    pub total_cents: i64,

    /// Amount tendered at completion. Zero while pending.
    pub paid_cents: i64,

    /// `paid - total`. Negative when underpaid (credit sales routinely
    /// post with paid = 0).
    pub change_cents: i64,

    pub status: SaleStatus,
    pub remarks: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses the snapshot pattern: the resolved tier price and product name are
/// frozen at creation time and never change, even if the product does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Quantity sold in milli-units (fractional units allowed).
    pub quantity_milli: i64,

    /// `quantity × unit_price`, rounded half-up to cents.
    pub line_total_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A debt-reducing payment from a customer. Insert-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,

    /// Per-day monotonic document number, `P{yyyymmdd}{NNN}`.
    pub payment_number: String,

    pub customer_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: new_entity_id(),
            code: "P001".to_string(),
            name: "Rice 1kg".to_string(),
            description: None,
            unit: "pcs".to_string(),
            cost_cents: 15000,
            normal_cents: 20000,
            employee_cents: 18000,
            wholesale_cents: 17000,
            stock_qty: 10,
            min_stock: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_price_for_tier() {
        let p = sample_product();
        assert_eq!(p.price_for(PriceTier::Normal).cents(), 20000);
        assert_eq!(p.price_for(PriceTier::Employee).cents(), 18000);
        assert_eq!(p.price_for(PriceTier::Wholesale).cents(), 17000);
    }

    #[test]
    fn test_unknown_tier_label_falls_back_to_normal() {
        assert_eq!(PriceTier::from_label("wholesale"), PriceTier::Wholesale);
        assert_eq!(PriceTier::from_label("vip"), PriceTier::Normal);
        assert_eq!(PriceTier::from_label(""), PriceTier::Normal);
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        let mut p = sample_product();
        p.stock_qty = 2;
        assert!(p.is_low_stock());
        p.stock_qty = 3;
        assert!(!p.is_low_stock());
    }

    #[test]
    fn test_sale_status_terminality() {
        assert!(!SaleStatus::Pending.is_terminal());
        assert!(SaleStatus::Completed.is_terminal());
        assert!(SaleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_document_kind_scopes() {
        assert!(DocumentKind::SaleNumber.is_daily());
        assert!(DocumentKind::PaymentNumber.is_daily());
        assert!(!DocumentKind::ProductCode.is_daily());
        assert!(!DocumentKind::CustomerCode.is_daily());

        assert_eq!(DocumentKind::SaleNumber.prefix(), "S");
        assert_eq!(DocumentKind::CustomerCode.prefix(), "C");
    }
}
