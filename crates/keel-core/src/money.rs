//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many checkout systems:                                              │
//! │    $20.00 spread over 3 bundle children = $6.67 × 3 = $20.01           │
//! │    The invoice no longer matches the cart → reconciliation failures    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    2000 cents over 3 children = 667 + 666 + 667 = 2000 cents           │
//! │    Every rounding decision is explicit and the sum always closes       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Display and base currency amounts are each expressed in their own
//! currency's minor unit, so the precision of both currencies is carried
//! by the representation itself - no shared rounding state, no decimals.
//!
//! ## Usage
//! ```rust
//! use keel_core::money::Money;
//!
//! // Create from minor units (preferred)
//! let row_total = Money::from_cents(10000); // 100.00
//!
//! // Arithmetic operations
//! let doubled = row_total * 2;                       // 200.00
//! let less = row_total - Money::from_cents(667);     // 93.33
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Discount adjustments and refunds go negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary field in the pricing pass - row totals, the four
/// discount amounts, the shipping amount, the running total - flows
/// through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (cents for USD).
    ///
    /// ## Example
    /// ```rust
    /// use keel_core::money::Money;
    ///
    /// let amount = Money::from_cents(667); // 6.67
    /// assert_eq!(amount.cents(), 667);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` = -5.50, not -4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

// =============================================================================
// Rounding
// =============================================================================

/// How a fractional share of a minor unit is resolved.
///
/// ## Rounding a Half
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │  HALF AWAY FROM ZERO (default)                                      │
/// │    6.665 → 6.67     -6.665 → -6.67                                  │
/// │    Matches the platform currency service.                           │
/// │                                                                     │
/// │                                                                     │
/// │  HALF TO EVEN (bankers rounding)                                    │
/// │    6.665 → 6.66     6.675 → 6.68                                    │
/// │    Alternates the tie direction so repeated ties carry no bias.     │
/// │    Offered for stores whose accounting requires it.                 │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Either mode only decides *where* a split penny lands; the
/// distribution algorithm guarantees the sum closes regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties round away from zero (0.5 → 1, -0.5 → -1).
    HalfAwayFromZero,
    /// Ties round to the nearest even quotient.
    HalfToEven,
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::HalfAwayFromZero
    }
}

/// Rounds `numerator / denominator` to the nearest integer under `mode`.
///
/// `denominator` must be positive; callers guarantee this by validating
/// weights before dividing. Uses i128 so `total × cumulative_weight`
/// products cannot overflow.
pub(crate) fn round_div(numerator: i128, denominator: i128, mode: RoundingMode) -> i128 {
    debug_assert!(denominator > 0, "round_div requires a positive denominator");

    let negative = numerator < 0;
    let n = numerator.abs();
    let quotient = n / denominator;
    let remainder = n % denominator;

    let rounded = match mode {
        RoundingMode::HalfAwayFromZero => {
            if remainder * 2 >= denominator {
                quotient + 1
            } else {
                quotient
            }
        }
        RoundingMode::HalfToEven => match (remainder * 2).cmp(&denominator) {
            Ordering::Greater => quotient + 1,
            Ordering::Equal => {
                if quotient % 2 == 1 {
                    quotient + 1
                } else {
                    quotient
                }
            }
            Ordering::Less => quotient,
        },
    };

    if negative {
        -rounded
    } else {
        rounded
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// Currency symbols are a frontend concern (the store context knows the
/// currency); this prints `major.minor` for logs and test assertions.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Sums an iterator of Money values (used for exactness assertions).
impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
