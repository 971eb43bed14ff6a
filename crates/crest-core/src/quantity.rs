//! # Quantity Module
//!
//! Sale quantities are fractional (a customer can buy 1.5 kg of rice) while
//! stock is counted in whole units. `Quantity` keeps the fractional value
//! exact by storing milli-units (thousandths), the same integer-first rule
//! that [`crate::money::Money`] applies to cents.
//!
//! ## Stock Decrement Policy
//! When a completed sale decrements stock, a fractional quantity is rounded
//! **up** to whole units (`units_ceil`). Rounding down would leak inventory:
//! selling 0.5 units twice must consume at least one unit of stock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sale quantity in milli-units (1.000 unit = 1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from milli-units.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a whole-unit quantity.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Returns the quantity in milli-units.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Checks if the quantity is a whole number of units.
    #[inline]
    pub const fn is_integral(&self) -> bool {
        self.0 % 1000 == 0
    }

    /// Checks if the quantity is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Whole units consumed from stock: the ceiling of the fractional value.
    ///
    /// ```rust
    /// use crest_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::from_units(3).units_ceil(), 3);
    /// assert_eq!(Quantity::from_milli(2500).units_ceil(), 3); // 2.5 → 3
    /// ```
    #[inline]
    pub const fn units_ceil(&self) -> i64 {
        (self.0 + 999) / 1000
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0 / 1000)
        } else {
            write!(f, "{}.{:03}", self.0 / 1000, (self.0 % 1000).abs())
        }
    }
}
