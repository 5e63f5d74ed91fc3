//! # Discount Collector
//!
//! Orchestrates one discount collection pass over a shipping
//! assignment's item tree, and projects the result for display.
//!
//! ## Collection Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One collect() Pass                                   │
//! │                                                                         │
//! │  validate item tree ──► engine.init_pass ──► can_apply_rules?          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reset discount fields (roots + children, skipping no_discount)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.sort_items_by_priority ──► for each root, in that order:       │
//! │       │                                                                 │
//! │       ├── no_discount?          → skip entirely                        │
//! │       ├── has a parent?         → skip (children only reached          │
//! │       │                           through their parent's distribution) │
//! │       ├── engine declines?      → skip                                 │
//! │       ├── AggregateCalculated   → engine.process(parent)               │
//! │       │                           then distribute to children,         │
//! │       │                           then zero the parent                 │
//! │       └── Leaf / AggregatePending → engine.process(item)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.process_shipping_amount ──► merge per-rule breakdown into      │
//! │  the address ──► assemble total.discount_description                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pass is synchronous and single-threaded; the collector takes an
//! exclusive borrow of the quote's item arena and must not be invoked
//! twice concurrently over the same tree.

use tracing::debug;

use crate::distribution::distribute;
use crate::error::{CollectResult, DistributionError, TreeError};
use crate::money::{Money, RoundingMode};
use crate::rules::RuleEngine;
use crate::types::{
    ItemArena, ItemId, ItemKind, Quote, ShippingAssignment, Total, TotalSegment,
};
use crate::validation::validate_item_tree;
use crate::{DISCOUNT_LABEL_SEPARATOR, DISCOUNT_TOTAL_CODE};

// =============================================================================
// Discount Collector
// =============================================================================

/// Collects rule discounts for one shipping assignment and updates the
/// shared [`Total`].
///
/// The engine is injected once and reused across passes; engines are
/// stateful within a pass (budget caps can span items), which is why
/// [`collect`](DiscountCollector::collect) takes `&mut self`.
#[derive(Debug)]
pub struct DiscountCollector<E: RuleEngine> {
    engine: E,
}

impl<E: RuleEngine> DiscountCollector<E> {
    /// Creates a collector around a rule engine.
    pub fn new(engine: E) -> Self {
        DiscountCollector { engine }
    }

    /// Read access to the injected engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs one collection pass.
    ///
    /// Mutates item discount fields, the address breakdown, and the
    /// shared `total` in place, then returns `Ok(())` so callers can
    /// chain collectors with `?`. An empty item list is a valid no-op
    /// pass. Engine errors abort the pass and surface unmodified.
    pub fn collect(
        &mut self,
        quote: &mut Quote,
        assignment: &mut ShippingAssignment,
        total: &mut Total,
    ) -> CollectResult<()> {
        validate_item_tree(&quote.items)?;

        self.engine.init_pass(quote, &assignment.address)?;
        if !self.engine.can_apply_rules(quote, &assignment.address) {
            debug!(quote = %quote.id, "no rules apply, skipping pass");
            return Ok(());
        }

        self.reset_items(&mut quote.items, &assignment.item_ids)?;

        let ordered =
            self.engine
                .sort_items_by_priority(&assignment.item_ids, &quote.items, &assignment.address)?;

        let rounding = quote.store.rounding;
        for item_id in ordered {
            let item = quote
                .items
                .get(item_id)
                .ok_or(TreeError::UnknownItem(item_id))?;

            if item.no_discount {
                debug!(item = %item.sku, "item excluded from discounting");
                continue;
            }
            if item.parent.is_some() {
                // Child items are only ever reached through their
                // parent's distribution step
                debug!(item = %item.sku, "child item skipped at root level");
                continue;
            }
            if !self.engine.can_apply_discount(item) {
                debug!(item = %item.sku, "engine declined discount for item");
                continue;
            }

            let kind = item.kind();
            let item = quote
                .items
                .get_mut(item_id)
                .ok_or(TreeError::UnknownItem(item_id))?;
            self.engine.process(item, total)?;

            if kind == ItemKind::AggregateCalculated {
                distribute_to_children(&mut quote.items, item_id, rounding)?;
            }
        }

        self.engine
            .process_shipping_amount(&mut assignment.address, total)?;

        aggregate_breakdown(quote, assignment)?;
        total.discount_description = compose_description(assignment);

        Ok(())
    }

    /// Projects the accumulated discount total into a display segment.
    ///
    /// Pure read: mutates neither the total nor any item, and calling it
    /// twice yields identical records. A zero discount is not displayed.
    pub fn fetch(&self, _quote: &Quote, total: &Total) -> Option<TotalSegment> {
        if total.discount_amount.is_zero() {
            return None;
        }

        Some(TotalSegment {
            code: DISCOUNT_TOTAL_CODE.to_string(),
            title: format!("Discount ({})", total.discount_description),
            value: total.discount_amount,
        })
    }

    /// Zeroes the discount fields of every root and child in the
    /// assignment so repeated passes over the same quote start from the
    /// same state. Items flagged `no_discount` are left untouched - the
    /// skip invariant holds for the reset as well.
    fn reset_items(&self, arena: &mut ItemArena, roots: &[ItemId]) -> CollectResult<()> {
        for &root_id in roots {
            let root = arena
                .get_mut(root_id)
                .ok_or(TreeError::UnknownItem(root_id))?;
            if root.no_discount {
                continue;
            }
            root.reset_discounts();

            let children = root.children.clone();
            for child_id in children {
                let child = arena
                    .get_mut(child_id)
                    .ok_or(TreeError::UnknownItem(child_id))?;
                if !child.no_discount {
                    child.reset_discounts();
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Parent → Child Distribution
// =============================================================================

/// Spreads a parent's four aggregate discount fields over its children,
/// weighted by each child's base row total, then zeroes the parent so
/// the aggregate is not double-counted downstream.
///
/// Children flagged `no_discount` receive no share and are excluded
/// from the weight sum. Each of the four fields is distributed
/// independently - no rounding state is shared between them.
fn distribute_to_children(
    arena: &mut ItemArena,
    parent_id: ItemId,
    rounding: RoundingMode,
) -> CollectResult<()> {
    let (aggregates, children) = {
        let parent = arena
            .get(parent_id)
            .ok_or(TreeError::UnknownItem(parent_id))?;
        (
            [
                parent.discount_amount,
                parent.base_discount_amount,
                parent.original_discount_amount,
                parent.base_original_discount_amount,
            ],
            parent.children.clone(),
        )
    };

    let mut eligible: Vec<ItemId> = Vec::with_capacity(children.len());
    let mut weights: Vec<Money> = Vec::with_capacity(children.len());
    for child_id in children {
        let child = arena
            .get(child_id)
            .ok_or(TreeError::UnknownItem(child_id))?;
        if child.no_discount {
            debug!(item = %child.sku, "child excluded from distribution");
            continue;
        }
        eligible.push(child_id);
        weights.push(child.base_row_total);
    }

    let shares = [
        distribute(aggregates[0], &weights, rounding)?,
        distribute(aggregates[1], &weights, rounding)?,
        distribute(aggregates[2], &weights, rounding)?,
        distribute(aggregates[3], &weights, rounding)?,
    ];
    for share in &shares {
        if share.len() != eligible.len() {
            return Err(DistributionError::AllocationMismatch {
                expected: eligible.len(),
                actual: share.len(),
            }
            .into());
        }
    }

    for (slot, &child_id) in eligible.iter().enumerate() {
        let child = arena
            .get_mut(child_id)
            .ok_or(TreeError::UnknownItem(child_id))?;
        child.discount_amount = shares[0][slot];
        child.base_discount_amount = shares[1][slot];
        child.original_discount_amount = shares[2][slot];
        child.base_original_discount_amount = shares[3][slot];
    }

    debug!(
        parent = parent_id.index(),
        children = eligible.len(),
        amount = %aggregates[0],
        "aggregate discount distributed"
    );

    // The aggregate now lives entirely on the children
    let parent = arena
        .get_mut(parent_id)
        .ok_or(TreeError::UnknownItem(parent_id))?;
    parent.reset_discounts();

    Ok(())
}

// =============================================================================
// Breakdown Aggregation & Description
// =============================================================================

/// Merges every processed root item's per-rule breakdown into the
/// address-level breakdown. Entries for rules this pass did not touch
/// are never cleared.
fn aggregate_breakdown(quote: &Quote, assignment: &mut ShippingAssignment) -> CollectResult<()> {
    for &root_id in &assignment.item_ids {
        let item = quote
            .items
            .get(root_id)
            .ok_or(TreeError::UnknownItem(root_id))?;
        if item.no_discount {
            continue;
        }
        for entry in &item.discount_breakdown {
            assignment.address.merge_rule_discount(entry);
        }
    }
    Ok(())
}

/// Assembles the totals label from the applied rules' names, unique, in
/// first-applied order.
fn compose_description(assignment: &ShippingAssignment) -> String {
    let mut labels: Vec<&str> = Vec::new();
    for entry in &assignment.address.discount_breakdown {
        if !entry.label.is_empty() && !labels.contains(&entry.label.as_str()) {
            labels.push(&entry.label);
        }
    }
    labels.join(DISCOUNT_LABEL_SEPARATOR)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::error::{CollectError, RuleError};
    use crate::types::{Address, DiscountData, LineItem, StoreContext};

    /// Scripted stand-in for the external rule validation engine:
    /// applies a pre-configured [`DiscountData`] per SKU and records the
    /// order in which items were processed.
    #[derive(Debug, Default)]
    struct ScriptedEngine {
        /// sku → (rule_id, label, data) applied on process
        discounts: HashMap<String, (String, String, DiscountData)>,
        /// SKUs the engine declines in can_apply_discount
        declined: HashSet<String>,
        /// Shipping discount applied in process_shipping_amount
        shipping_discount: Option<Money>,
        /// Reverse the priority order to prove the collector follows it
        reverse_priority: bool,
        /// Fail on this SKU to exercise error propagation
        fail_on: Option<String>,
        /// Whole-pass applicability gate
        rules_apply: bool,
        /// Process order, by SKU
        processed: Vec<String>,
        init_calls: usize,
    }

    impl ScriptedEngine {
        fn new() -> Self {
            ScriptedEngine {
                rules_apply: true,
                ..Default::default()
            }
        }

        fn script(&mut self, sku: &str, rule_id: &str, label: &str, cents: [i64; 4]) {
            self.discounts.insert(
                sku.to_string(),
                (
                    rule_id.to_string(),
                    label.to_string(),
                    DiscountData::new(
                        Money::from_cents(cents[0]),
                        Money::from_cents(cents[1]),
                        Money::from_cents(cents[2]),
                        Money::from_cents(cents[3]),
                    ),
                ),
            );
        }
    }

    impl RuleEngine for ScriptedEngine {
        fn init_pass(&mut self, _quote: &Quote, _address: &Address) -> Result<(), RuleError> {
            self.init_calls += 1;
            Ok(())
        }

        fn can_apply_rules(&self, _quote: &Quote, _address: &Address) -> bool {
            self.rules_apply
        }

        fn sort_items_by_priority(
            &mut self,
            roots: &[ItemId],
            _arena: &ItemArena,
            _address: &Address,
        ) -> Result<Vec<ItemId>, RuleError> {
            let mut ordered = roots.to_vec();
            if self.reverse_priority {
                ordered.reverse();
            }
            Ok(ordered)
        }

        fn can_apply_discount(&self, item: &LineItem) -> bool {
            !self.declined.contains(&item.sku)
        }

        fn process(&mut self, item: &mut LineItem, total: &mut Total) -> Result<(), RuleError> {
            if self.fail_on.as_deref() == Some(item.sku.as_str()) {
                return Err(RuleError::Evaluation {
                    rule_id: "BROKEN".to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            self.processed.push(item.sku.clone());
            if let Some((rule_id, label, data)) = self.discounts.get(&item.sku) {
                item.apply_discount(rule_id, label, data);
                total.add_discount(data);
            }
            Ok(())
        }

        fn process_shipping_amount(
            &mut self,
            address: &mut Address,
            total: &mut Total,
        ) -> Result<(), RuleError> {
            if let Some(amount) = self.shipping_discount {
                address.shipping_discount_amount += amount;
                total.discount_amount += amount;
                total.base_discount_amount += amount;
            }
            Ok(())
        }
    }

    fn leaf(sku: &str, cents: i64) -> LineItem {
        LineItem::new(sku, Money::from_cents(cents), Money::from_cents(cents))
    }

    fn quote() -> Quote {
        Quote::new(StoreContext::default())
    }

    /// Quote with one bundle parent and three 100.00 children, children
    /// already cost-calculated.
    fn bundle_quote() -> (Quote, ShippingAssignment, [ItemId; 4]) {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 30000));
        let c1 = q.items.push(leaf("PART-1", 10000));
        let c2 = q.items.push(leaf("PART-2", 10000));
        let c3 = q.items.push(leaf("PART-3", 10000));
        q.items.link_child(parent_id, c1).unwrap();
        q.items.link_child(parent_id, c2).unwrap();
        q.items.link_child(parent_id, c3).unwrap();
        q.items.get_mut(parent_id).unwrap().children_calculated = true;

        let assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![parent_id],
        };
        (q, assignment, [parent_id, c1, c2, c3])
    }

    #[test]
    fn test_collect_empty_assignment_is_noop() {
        let mut q = quote();
        let mut assignment = ShippingAssignment::default();
        let mut total = Total::default();
        let mut collector = DiscountCollector::new(ScriptedEngine::new());

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert!(total.discount_amount.is_zero());
        assert!(collector.engine().processed.is_empty());
        assert_eq!(collector.engine().init_calls, 1);
    }

    #[test]
    fn test_collect_leaf_item() {
        let mut q = quote();
        let id = q.items.push(leaf("SKU-1", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-1", "10", "Spring Sale", [1000, 1000, 1000, 1000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        let item = q.items.get(id).unwrap();
        assert_eq!(item.discount_amount.cents(), 1000);
        assert_eq!(total.discount_amount.cents(), 1000);
        assert_eq!(total.discount_description, "Spring Sale");
    }

    #[test]
    fn test_collect_skips_no_discount_item() {
        let mut q = quote();
        let id = q.items.push(leaf("SKU-1", 10000).with_no_discount());
        // Pre-existing value must survive the pass untouched
        q.items.get_mut(id).unwrap().discount_amount = Money::from_cents(123);

        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-1", "10", "Spring Sale", [1000, 1000, 1000, 1000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert!(collector.engine().processed.is_empty());
        assert_eq!(q.items.get(id).unwrap().discount_amount.cents(), 123);
        assert!(total.discount_amount.is_zero());
    }

    #[test]
    fn test_collect_skips_child_item_at_root_level() {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 20000));
        let child_id = q.items.push(leaf("PART", 10000));
        q.items.link_child(parent_id, child_id).unwrap();

        // The child leaks into the root list; the collector must not
        // evaluate it directly
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![child_id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("PART", "10", "Spring Sale", [1000, 1000, 1000, 1000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert!(collector.engine().processed.is_empty());
        assert!(q.items.get(child_id).unwrap().discount_amount.is_zero());
    }

    #[test]
    fn test_collect_skips_item_engine_declines() {
        let mut q = quote();
        let id = q.items.push(leaf("SKU-1", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-1", "10", "Spring Sale", [1000, 1000, 1000, 1000]);
        engine.declined.insert("SKU-1".to_string());
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert!(collector.engine().processed.is_empty());
        assert!(total.discount_amount.is_zero());
    }

    /// Parent aggregates 20.00 / 10.00 / 40.00 / 20.00 over three
    /// children each weighing 100.00.
    #[test]
    fn test_collect_distributes_aggregate_to_children() {
        let (mut q, mut assignment, [parent_id, c1, c2, c3]) = bundle_quote();
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("BUNDLE", "10", "Bundle Deal", [2000, 1000, 4000, 2000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        let expected = [
            (c1, 667, 333, 1333, 667),
            (c2, 666, 334, 1334, 666),
            (c3, 667, 333, 1333, 667),
        ];
        for (id, discount, base, original, base_original) in expected {
            let child = q.items.get(id).unwrap();
            assert_eq!(child.discount_amount.cents(), discount, "{}", child.sku);
            assert_eq!(child.base_discount_amount.cents(), base, "{}", child.sku);
            assert_eq!(
                child.original_discount_amount.cents(),
                original,
                "{}",
                child.sku
            );
            assert_eq!(
                child.base_original_discount_amount.cents(),
                base_original,
                "{}",
                child.sku
            );
        }

        // The aggregate moved off the parent entirely
        let parent = q.items.get(parent_id).unwrap();
        assert!(parent.discount_amount.is_zero());
        assert!(parent.base_discount_amount.is_zero());

        // The total still reflects the one aggregate evaluation
        assert_eq!(total.discount_amount.cents(), 2000);
        assert_eq!(total.base_discount_amount.cents(), 1000);
    }

    #[test]
    fn test_collect_zero_weight_children_get_zero() {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 0));
        let child_id = q.items.push(leaf("PART", 0));
        q.items.link_child(parent_id, child_id).unwrap();
        q.items.get_mut(parent_id).unwrap().children_calculated = true;

        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![parent_id],
        };
        let mut total = Total::default();
        let mut collector = DiscountCollector::new(ScriptedEngine::new());

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        let child = q.items.get(child_id).unwrap();
        assert!(child.discount_amount.is_zero());
        assert!(child.base_discount_amount.is_zero());
        assert!(child.original_discount_amount.is_zero());
        assert!(child.base_original_discount_amount.is_zero());
    }

    #[test]
    fn test_collect_no_discount_child_gets_no_share() {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 20000));
        let excluded = q.items.push(leaf("PART-X", 10000).with_no_discount());
        let kept = q.items.push(leaf("PART-K", 10000));
        q.items.link_child(parent_id, excluded).unwrap();
        q.items.link_child(parent_id, kept).unwrap();
        q.items.get_mut(parent_id).unwrap().children_calculated = true;
        q.items.get_mut(excluded).unwrap().discount_amount = Money::from_cents(55);

        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![parent_id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("BUNDLE", "10", "Bundle Deal", [2000, 2000, 2000, 2000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        // Excluded child keeps its pre-existing value; the eligible
        // child absorbs the whole aggregate
        assert_eq!(q.items.get(excluded).unwrap().discount_amount.cents(), 55);
        assert_eq!(q.items.get(kept).unwrap().discount_amount.cents(), 2000);
    }

    #[test]
    fn test_collect_aggregate_pending_treated_as_leaf() {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 20000));
        let child_id = q.items.push(leaf("PART", 10000));
        q.items.link_child(parent_id, child_id).unwrap();
        // children_calculated stays false → AggregatePending

        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![parent_id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("BUNDLE", "10", "Bundle Deal", [2000, 1000, 2000, 1000]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        // The parent keeps the discount; nothing reaches the child
        assert_eq!(q.items.get(parent_id).unwrap().discount_amount.cents(), 2000);
        assert!(q.items.get(child_id).unwrap().discount_amount.is_zero());
    }

    #[test]
    fn test_collect_follows_engine_priority_order() {
        let mut q = quote();
        let a = q.items.push(leaf("SKU-A", 1000));
        let b = q.items.push(leaf("SKU-B", 1000));
        let c = q.items.push(leaf("SKU-C", 1000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![a, b, c],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.reverse_priority = true;
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert_eq!(collector.engine().processed, vec!["SKU-C", "SKU-B", "SKU-A"]);
    }

    #[test]
    fn test_collect_forwards_shipping_amount() {
        let mut q = quote();
        let mut assignment = ShippingAssignment {
            address: Address {
                shipping_amount: Money::from_cents(1500),
                ..Default::default()
            },
            item_ids: Vec::new(),
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.shipping_discount = Some(Money::from_cents(500));
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert_eq!(assignment.address.shipping_discount_amount.cents(), 500);
        assert_eq!(total.discount_amount.cents(), 500);
    }

    #[test]
    fn test_collect_skips_everything_when_no_rules_apply() {
        let mut q = quote();
        let id = q.items.push(leaf("SKU-1", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-1", "10", "Spring Sale", [1000, 1000, 1000, 1000]);
        engine.rules_apply = false;
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert!(collector.engine().processed.is_empty());
        assert!(total.discount_amount.is_zero());
    }

    #[test]
    fn test_collect_propagates_rule_error() {
        let mut q = quote();
        let id = q.items.push(leaf("SKU-1", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![id],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.fail_on = Some("SKU-1".to_string());
        let mut collector = DiscountCollector::new(engine);

        let err = collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap_err();
        assert!(matches!(err, CollectError::Rule(_)));
    }

    #[test]
    fn test_collect_rejects_corrupt_tree() {
        let mut q = quote();
        let parent_id = q.items.push(leaf("BUNDLE", 20000));
        let child_id = q.items.push(leaf("PART", 10000));
        q.items.link_child(parent_id, child_id).unwrap();
        // Corrupt the back-reference
        q.items.get_mut(child_id).unwrap().parent = Some(child_id);

        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![parent_id],
        };
        let mut total = Total::default();
        let mut collector = DiscountCollector::new(ScriptedEngine::new());

        let err = collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap_err();
        assert!(matches!(err, CollectError::Tree(_)));
    }

    #[test]
    fn test_repeated_collect_is_deterministic() {
        let (mut q, mut assignment, [_, c1, c2, c3]) = bundle_quote();

        let mut engine = ScriptedEngine::new();
        engine.script("BUNDLE", "10", "Bundle Deal", [2000, 1000, 4000, 2000]);
        let mut collector = DiscountCollector::new(engine);

        let mut total = Total::default();
        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();
        let first: Vec<i64> = [c1, c2, c3]
            .iter()
            .map(|&id| q.items.get(id).unwrap().discount_amount.cents())
            .collect();

        let mut total = Total::default();
        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();
        let second: Vec<i64> = [c1, c2, c3]
            .iter()
            .map(|&id| q.items.get(id).unwrap().discount_amount.cents())
            .collect();

        assert_eq!(first, second);
        assert_eq!(first, vec![667, 666, 667]);
    }

    #[test]
    fn test_collect_aggregates_address_breakdown() {
        let mut q = quote();
        let a = q.items.push(leaf("SKU-A", 10000));
        let b = q.items.push(leaf("SKU-B", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![a, b],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-A", "10", "Spring Sale", [500, 500, 500, 500]);
        engine.script("SKU-B", "10", "Spring Sale", [300, 300, 300, 300]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        // One address entry, amounts merged across both items
        assert_eq!(assignment.address.discount_breakdown.len(), 1);
        let entry = &assignment.address.discount_breakdown[0];
        assert_eq!(entry.rule_id, "10");
        assert_eq!(entry.amount.cents(), 800);
    }

    #[test]
    fn test_collect_description_lists_rules_in_applied_order() {
        let mut q = quote();
        let a = q.items.push(leaf("SKU-A", 10000));
        let b = q.items.push(leaf("SKU-B", 10000));
        let mut assignment = ShippingAssignment {
            address: Address::default(),
            item_ids: vec![a, b],
        };
        let mut total = Total::default();

        let mut engine = ScriptedEngine::new();
        engine.script("SKU-A", "10", "Spring Sale", [500, 500, 500, 500]);
        engine.script("SKU-B", "11", "VIP", [300, 300, 300, 300]);
        let mut collector = DiscountCollector::new(engine);

        collector
            .collect(&mut q, &mut assignment, &mut total)
            .unwrap();

        assert_eq!(total.discount_description, "Spring Sale, VIP");
    }

    // -------------------------------------------------------------------------
    // Fetch
    // -------------------------------------------------------------------------

    #[test]
    fn test_fetch_returns_display_record() {
        let q = quote();
        let collector = DiscountCollector::new(ScriptedEngine::new());
        let total = Total {
            discount_amount: Money::from_cents(10000),
            base_discount_amount: Money::from_cents(10000),
            discount_description: "100".to_string(),
        };

        let segment = collector.fetch(&q, &total).unwrap();
        assert_eq!(segment.code, "discount");
        assert_eq!(segment.value.cents(), 10000);
        assert_eq!(segment.title, "Discount (100)");
    }

    #[test]
    fn test_fetch_suppresses_zero_discount() {
        let q = quote();
        let collector = DiscountCollector::new(ScriptedEngine::new());
        let total = Total::default();

        assert!(collector.fetch(&q, &total).is_none());
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let q = quote();
        let collector = DiscountCollector::new(ScriptedEngine::new());
        let total = Total {
            discount_amount: Money::from_cents(2000),
            base_discount_amount: Money::from_cents(1000),
            discount_description: "Spring Sale".to_string(),
        };
        let before = total.clone();

        let first = collector.fetch(&q, &total);
        let second = collector.fetch(&q, &total);

        assert_eq!(first, second);
        assert_eq!(total.discount_amount, before.discount_amount);
        assert_eq!(total.discount_description, before.discount_description);
    }

    #[test]
    fn test_fetch_segment_serializes_for_frontend() {
        let q = quote();
        let collector = DiscountCollector::new(ScriptedEngine::new());
        let total = Total {
            discount_amount: Money::from_cents(2000),
            base_discount_amount: Money::from_cents(1000),
            discount_description: "Spring Sale".to_string(),
        };

        let segment = collector.fetch(&q, &total).unwrap();
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["code"], "discount");
        assert_eq!(json["title"], "Discount (Spring Sale)");
    }
}
