//! # Rule Engine Boundary
//!
//! The in-process contract between the discount collector and the
//! external rule validation engine.
//!
//! ## Division of Responsibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RULE ENGINE (injected, out of scope)    KEEL-CORE (this crate)        │
//! │  ─────────────────────────────────────   ────────────────────────────  │
//! │  • which rules apply to an item          • which items get evaluated   │
//! │  • how much discount a rule produces     • parent → child distribution │
//! │  • item priority ordering                • penny-exact reconstruction  │
//! │  • cross-item budget caps                • totals aggregation / fetch  │
//! │  • shipping discount computation         • forwarding shipping amounts │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All policy lives behind [`RuleEngine`] and is trusted; the collector
//! never second-guesses an engine decision and never catches an engine
//! error. Engines are stateful across one pass (budget caps can span
//! items), so most methods take `&mut self`.

use crate::error::RuleError;
use crate::types::{Address, ItemArena, ItemId, LineItem, Quote, Total};

// =============================================================================
// Rule Engine Trait
// =============================================================================

/// Contract the external rule validation engine must satisfy.
///
/// One engine instance serves one pricing pass at a time; the collector
/// calls these methods in a fixed sequence:
///
/// 1. [`init_pass`](RuleEngine::init_pass) once,
/// 2. [`can_apply_rules`](RuleEngine::can_apply_rules) once - a `false`
///    ends the pass before any item is touched,
/// 3. [`sort_items_by_priority`](RuleEngine::sort_items_by_priority) once,
/// 4. [`can_apply_discount`](RuleEngine::can_apply_discount) /
///    [`process`](RuleEngine::process) per qualifying item, in exactly
///    the returned order,
/// 5. [`process_shipping_amount`](RuleEngine::process_shipping_amount)
///    once at the end.
pub trait RuleEngine {
    /// Resets per-pass rule state (applied-rule set, budget caps) before
    /// a collection pass over `quote`/`address` begins.
    fn init_pass(&mut self, quote: &Quote, address: &Address) -> Result<(), RuleError>;

    /// Whether any rule applies to this quote/address at all. A `false`
    /// turns the whole pass into a no-op.
    fn can_apply_rules(&self, quote: &Quote, address: &Address) -> bool;

    /// Orders the root items for processing.
    ///
    /// The collector iterates exactly this order and never re-sorts:
    /// rule state such as budget caps across a multi-item rule can be
    /// order-dependent inside the engine.
    fn sort_items_by_priority(
        &mut self,
        roots: &[ItemId],
        arena: &ItemArena,
        address: &Address,
    ) -> Result<Vec<ItemId>, RuleError>;

    /// Whether any rule qualifies this item for a discount at all.
    fn can_apply_discount(&self, item: &LineItem) -> bool;

    /// Evaluates the applicable rules against one item (leaf or
    /// aggregate parent): computes [`DiscountData`], mutates the item's
    /// discount fields and breakdown (via
    /// [`LineItem::apply_discount`]), and adjusts the shared total.
    ///
    /// [`DiscountData`]: crate::types::DiscountData
    /// [`LineItem::apply_discount`]: crate::types::LineItem::apply_discount
    fn process(&mut self, item: &mut LineItem, total: &mut Total) -> Result<(), RuleError>;

    /// Applies shipping-amount rules against the address. The collector
    /// only forwards the address; it never computes shipping discounts
    /// itself.
    fn process_shipping_amount(
        &mut self,
        address: &mut Address,
        total: &mut Total,
    ) -> Result<(), RuleError>;
}
