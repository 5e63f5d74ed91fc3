//! # Domain Types
//!
//! Core domain types for the discount collection pass.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │     Quote       │   │ ShippingAssignment  │   │     Total       │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  id (UUID)      │   │  address            │   │  discount_amount│   │
//! │  │  store context  │   │  root item ids      │   │  base amount    │   │
//! │  │  item arena     │   │  (ordered)          │   │  description    │   │
//! │  └───────┬─────────┘   └─────────────────────┘   └─────────────────┘   │
//! │          │                                                              │
//! │  ┌───────▼─────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    ItemArena    │   │    LineItem     │   │  RuleDiscount   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Vec<LineItem>  │   │  4 discount     │   │  rule_id        │       │
//! │  │  ItemId = index │   │  fields, flags, │   │  label          │       │
//! │  │                 │   │  parent/children│   │  amount pair    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Line items carry two identities:
//! - `id`: UUID v4 - immutable, survives into orders/invoices
//! - `ItemId`: arena index - cheap graph addressing within one quote
//!
//! Parent/child links are stored as `ItemId` references into the arena,
//! never as owned subtrees, so the two-level item graph has no ownership
//! cycles and the collector can borrow the whole arena exclusively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::TreeError;
use crate::money::{Money, RoundingMode};

// =============================================================================
// Store Context
// =============================================================================

/// Read-only store/currency context for one pricing pass.
///
/// Supplied by the store resolver of the surrounding platform; this core
/// only reads the rounding mode when allocating fractional shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreContext {
    /// Store view code (e.g., "default", "eu_b2b").
    pub code: String,

    /// How split minor units are resolved during distribution.
    pub rounding: RoundingMode,
}

impl StoreContext {
    /// Creates a store context with the platform default rounding.
    pub fn new(code: impl Into<String>) -> Self {
        StoreContext {
            code: code.into(),
            rounding: RoundingMode::default(),
        }
    }
}

impl Default for StoreContext {
    fn default() -> Self {
        StoreContext::new("default")
    }
}

// =============================================================================
// Item Identity
// =============================================================================

/// Arena index of a line item within one quote.
///
/// Only meaningful for the arena it came from; cross-quote references
/// use the item's UUID instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct ItemId(usize);

impl ItemId {
    /// Wraps a raw arena index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        ItemId(index)
    }

    /// Returns the raw arena index.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

// =============================================================================
// Discount Data
// =============================================================================

/// Ephemeral per-item, per-rule result produced by the rule engine.
///
/// Consumed immediately via [`LineItem::apply_discount`]; never
/// persisted. `original_*` hold the amounts before any rule-level caps
/// were applied, which downstream reporting wants separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountData {
    pub amount: Money,
    pub base_amount: Money,
    pub original_amount: Money,
    pub base_original_amount: Money,
}

impl DiscountData {
    pub const fn new(
        amount: Money,
        base_amount: Money,
        original_amount: Money,
        base_original_amount: Money,
    ) -> Self {
        DiscountData {
            amount,
            base_amount,
            original_amount,
            base_original_amount,
        }
    }
}

// =============================================================================
// Rule Discount Breakdown
// =============================================================================

/// One entry in a per-rule discount breakdown (item- or address-level).
///
/// The breakdown is an ordered map from rule id to allocated amount,
/// kept for display and audit. Merging is append-only: an existing entry
/// for the same rule accumulates; entries for other rules are never
/// cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RuleDiscount {
    /// Identifier of the sales rule that produced this amount.
    pub rule_id: String,

    /// Human-readable rule label ("Spring Sale").
    pub label: String,

    /// Amount in display currency minor units.
    pub amount: Money,

    /// Amount in base currency minor units.
    pub base_amount: Money,
}

/// Merges `entry` into `list`, accumulating by rule id.
pub(crate) fn merge_breakdown(list: &mut Vec<RuleDiscount>, entry: &RuleDiscount) {
    if let Some(existing) = list.iter_mut().find(|d| d.rule_id == entry.rule_id) {
        existing.amount += entry.amount;
        existing.base_amount += entry.base_amount;
    } else {
        list.push(entry.clone());
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// How the collector dispatches on one root item.
///
/// Evaluated once per item instead of re-checking boolean flags at each
/// branch, so the three processing paths stay exhaustive and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// No children: the rule engine evaluates the item directly.
    Leaf,
    /// Children exist and were cost-processed upstream: the item holds
    /// an aggregate discount that must be redistributed to them.
    AggregateCalculated,
    /// Children exist but were not cost-processed: evaluated as a leaf;
    /// no discount reaches the children this pass.
    AggregatePending,
}

/// A purchasable entry in the quote.
///
/// ## Invariants
/// - Two-level graph only: a root has `parent == None`; a child has a
///   parent and an empty `children` list.
/// - For `AggregateCalculated` items the four discount fields hold an
///   aggregate that the distribution step spreads over the children and
///   then zeroes on the parent.
///
/// ## Lifecycle
/// Populated by the cart pricing pipeline before collection, mutated in
/// place during collection, read during fetch/rendering. Never destroyed
/// by this core.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Unique identifier (UUID v4).
    #[ts(as = "String")]
    pub id: Uuid,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Extended price in display currency (pre-discount).
    pub row_total: Money,

    /// Extended price in base currency (pre-discount). Distribution
    /// weight for child items.
    pub base_row_total: Money,

    /// Discount in display currency.
    pub discount_amount: Money,

    /// Discount in base currency.
    pub base_discount_amount: Money,

    /// Discount in display currency before rule-level caps.
    pub original_discount_amount: Money,

    /// Discount in base currency before rule-level caps.
    pub base_original_discount_amount: Money,

    /// Excludes the item from rule evaluation and from distribution.
    pub no_discount: bool,

    /// Children were already cost-processed upstream; the parent's
    /// discount is an aggregate to redistribute.
    pub children_calculated: bool,

    /// Back-reference to the parent item. `Some` marks a child item.
    pub parent: Option<ItemId>,

    /// Ordered child items. Order is distribution order.
    pub children: Vec<ItemId>,

    /// Per-rule discount breakdown for UI/audit.
    pub discount_breakdown: Vec<RuleDiscount>,
}

impl LineItem {
    /// Creates a line item with zeroed discount fields.
    pub fn new(sku: impl Into<String>, row_total: Money, base_row_total: Money) -> Self {
        LineItem {
            id: Uuid::new_v4(),
            sku: sku.into(),
            row_total,
            base_row_total,
            discount_amount: Money::zero(),
            base_discount_amount: Money::zero(),
            original_discount_amount: Money::zero(),
            base_original_discount_amount: Money::zero(),
            no_discount: false,
            children_calculated: false,
            parent: None,
            children: Vec::new(),
            discount_breakdown: Vec::new(),
        }
    }

    /// Marks the item as excluded from discounting.
    pub fn with_no_discount(mut self) -> Self {
        self.no_discount = true;
        self
    }

    /// Whether the item has child items.
    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Classifies the item for collector dispatch.
    pub fn kind(&self) -> ItemKind {
        if !self.has_children() {
            ItemKind::Leaf
        } else if self.children_calculated {
            ItemKind::AggregateCalculated
        } else {
            ItemKind::AggregatePending
        }
    }

    /// Applies one rule's [`DiscountData`]: accumulates the four
    /// discount fields and records the rule in the breakdown.
    ///
    /// Called by rule engine implementations from `process`; the data is
    /// consumed here and nowhere else.
    pub fn apply_discount(&mut self, rule_id: &str, label: &str, data: &DiscountData) {
        self.discount_amount += data.amount;
        self.base_discount_amount += data.base_amount;
        self.original_discount_amount += data.original_amount;
        self.base_original_discount_amount += data.base_original_amount;
        merge_breakdown(
            &mut self.discount_breakdown,
            &RuleDiscount {
                rule_id: rule_id.to_string(),
                label: label.to_string(),
                amount: data.amount,
                base_amount: data.base_amount,
            },
        );
    }

    /// Zeroes the four discount fields ahead of a collection pass.
    pub(crate) fn reset_discounts(&mut self) {
        self.discount_amount = Money::zero();
        self.base_discount_amount = Money::zero();
        self.original_discount_amount = Money::zero();
        self.base_original_discount_amount = Money::zero();
    }
}

// =============================================================================
// Item Arena
// =============================================================================

/// Flat storage for one quote's line items, addressed by [`ItemId`].
///
/// The arena owns every item; parent/child structure lives in id
/// references. The collector takes an exclusive borrow of the arena for
/// the duration of one shipping assignment's pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemArena {
    items: Vec<LineItem>,
}

impl ItemArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        ItemArena { items: Vec::new() }
    }

    /// Adds an item and returns its arena id.
    pub fn push(&mut self, item: LineItem) -> ItemId {
        let id = ItemId::new(self.items.len());
        self.items.push(item);
        id
    }

    /// Looks up an item.
    pub fn get(&self, id: ItemId) -> Option<&LineItem> {
        self.items.get(id.index())
    }

    /// Looks up an item mutably.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut LineItem> {
        self.items.get_mut(id.index())
    }

    /// Links `child` under `parent`, preserving the two-level invariant.
    ///
    /// ## Errors
    /// - [`TreeError::UnknownItem`] if either id is stale
    /// - [`TreeError::NestedChild`] if `parent` is itself a child, or
    ///   `child` already has children of its own
    /// - [`TreeError::AlreadyLinked`] if `child` already has a parent
    pub fn link_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), TreeError> {
        let parent_item = self.get(parent).ok_or(TreeError::UnknownItem(parent))?;
        if parent_item.parent.is_some() {
            return Err(TreeError::NestedChild(parent));
        }

        let child_item = self.get(child).ok_or(TreeError::UnknownItem(child))?;
        if child_item.parent.is_some() {
            return Err(TreeError::AlreadyLinked(child));
        }
        if child_item.has_children() {
            return Err(TreeError::NestedChild(child));
        }

        self.items[child.index()].parent = Some(parent);
        self.items[parent.index()].children.push(child);
        Ok(())
    }

    /// Number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the arena holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates items with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &LineItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId::new(i), item))
    }
}

// =============================================================================
// Quote
// =============================================================================

/// The cart snapshot one pricing pass runs over.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quote {
    /// Unique identifier (UUID v4).
    #[ts(as = "String")]
    pub id: Uuid,

    /// Active store/currency context.
    pub store: StoreContext,

    /// When the snapshot was taken.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// All line items of the quote.
    pub items: ItemArena,
}

impl Quote {
    /// Creates an empty quote for the given store.
    pub fn new(store: StoreContext) -> Self {
        Quote {
            id: Uuid::new_v4(),
            store,
            created_at: Utc::now(),
            items: ItemArena::new(),
        }
    }
}

// =============================================================================
// Address / Shipping Assignment
// =============================================================================

/// Shipping destination state for one assignment.
///
/// Owned by the enclosing total-collection pipeline; the collector
/// borrows it for one pass, forwards the shipping amount to the rule
/// engine, and merges the per-rule breakdown here for later display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    /// Shipping amount in display currency.
    pub shipping_amount: Money,

    /// Shipping discount as computed by the rule engine.
    pub shipping_discount_amount: Money,

    /// Address-level per-rule breakdown, aggregated across items.
    pub discount_breakdown: Vec<RuleDiscount>,
}

impl Address {
    /// Merges one rule entry into the address-level breakdown.
    /// Entries for other rules are left untouched.
    pub fn merge_rule_discount(&mut self, entry: &RuleDiscount) {
        merge_breakdown(&mut self.discount_breakdown, entry);
    }
}

/// One shipping destination plus the ordered root items priced for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAssignment {
    /// Destination state (shipping amount, breakdown).
    pub address: Address,

    /// Root-level items for this destination, in stored order. The rule
    /// engine re-orders these by priority before the collector iterates.
    pub item_ids: Vec<ItemId>,
}

// =============================================================================
// Total
// =============================================================================

/// Running accumulator for the discount total category.
///
/// Shared across every discount-producing collector in one pricing pass
/// and mutated in place; the pipeline guarantees sequential execution
/// per quote, so no locking is involved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Total {
    /// Accumulated discount in display currency.
    pub discount_amount: Money,

    /// Accumulated discount in base currency.
    pub base_discount_amount: Money,

    /// Label assembled from applied rule names ("Spring Sale, VIP").
    pub discount_description: String,
}

impl Total {
    /// Accumulates one evaluation's amounts into the running total.
    pub fn add_discount(&mut self, data: &DiscountData) {
        self.discount_amount += data.amount;
        self.base_discount_amount += data.base_amount;
    }
}

/// Display/report projection of the discount total.
///
/// Produced by `fetch` after all collectors have run; consumed by the
/// totals renderer of the checkout frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TotalSegment {
    /// Fixed code identifying the totals line ("discount").
    pub code: String,

    /// Localizable title, e.g. "Discount (Spring Sale)".
    pub title: String,

    /// The amount to render.
    pub value: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
