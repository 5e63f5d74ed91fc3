//! # keel-core: Pure Discount Collection Logic for Keel Checkout
//!
//! This crate is the pricing **heart** of Keel Checkout. It computes and
//! distributes rule discounts over a quote's item tree so that the sum
//! of per-item allocations reconstructs the rule engine's discount
//! total exactly, down to the smallest currency unit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Keel Checkout Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Checkout Pipeline (host application)            │   │
//! │  │   builds Quote/ShippingAssignment ──► runs total collectors     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ one collect() per assignment           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ keel-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌──────────────┐  ┌──────────┐ │   │
//! │  │   │   types   │  │   money   │  │ distribution │  │collector │ │   │
//! │  │   │ LineItem  │  │   Money   │  │ exact-sum    │  │ traverse │ │   │
//! │  │   │ Quote     │  │ rounding  │  │ allocation   │  │ + fetch  │ │   │
//! │  │   └───────────┘  └───────────┘  └──────────────┘  └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ RuleEngine trait (injected)            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              Rule Validation Engine (external)                  │   │
//! │  │     rule applicability, amounts, priorities, budget caps        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Quote, LineItem, Total, breakdown records)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`rules`] - The injected rule validation engine contract
//! - [`distribution`] - Proportional allocation with exact reconstruction
//! - [`collector`] - The collection pass and the fetch projection
//! - [`validation`] - Fail-fast invariant checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every pass is deterministic - same input = same
//!    allocations, penny for penny
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are minor units (i64); the
//!    sum of a distribution always closes
//! 4. **Explicit Errors**: All errors are typed; collaborator failures
//!    propagate unmodified, never repaired
//!
//! ## Example Usage
//!
//! ```rust
//! use keel_core::distribution::distribute;
//! use keel_core::money::{Money, RoundingMode};
//!
//! // A 20.00 bundle discount over three children of 100.00 each
//! let weights = vec![Money::from_cents(10000); 3];
//! let shares = distribute(
//!     Money::from_cents(2000),
//!     &weights,
//!     RoundingMode::HalfAwayFromZero,
//! )
//! .unwrap();
//!
//! // Penny-exact: 6.67 + 6.66 + 6.67 = 20.00
//! let sum: Money = shares.iter().copied().sum();
//! assert_eq!(sum.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod collector;
pub mod distribution;
pub mod error;
pub mod money;
pub mod rules;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use keel_core::Money` instead of
// `use keel_core::money::Money`

pub use collector::DiscountCollector;
pub use error::{CollectError, CollectResult, DistributionError, RuleError, TreeError};
pub use money::{Money, RoundingMode};
pub use rules::RuleEngine;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Code identifying the discount line in the totals display.
///
/// ## Why a constant?
/// The totals renderer, order export, and refund flows all key off this
/// code; a typo in one of them would silently drop the discount line.
pub const DISCOUNT_TOTAL_CODE: &str = "discount";

/// Separator between rule labels in the assembled totals description
/// ("Spring Sale, VIP").
pub const DISCOUNT_LABEL_SEPARATOR: &str = ", ";
