//! # Validation Module
//!
//! Invariant checks for the collection pass.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Upstream cost processing                                     │
//! │  ├── Row totals kept non-negative                                      │
//! │  └── children_calculated set only after child costing                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - fail-fast invariant checks                     │
//! │  ├── validate_item_tree: two-level graph, consistent back-refs         │
//! │  └── validate_weights: no negative distribution weights                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Distribution arithmetic (i128, exact-sum by construction)    │
//! │                                                                         │
//! │  A violation here means corrupted input, not a user mistake; the       │
//! │  pass aborts instead of emitting inconsistent allocations.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{DistributionError, TreeError};
use crate::money::Money;
use crate::types::ItemArena;

// =============================================================================
// Weight Validators
// =============================================================================

/// Validates distribution weights (children's base row totals).
///
/// ## Rules
/// - Every weight must be non-negative
/// - A zero weight is fine (the child simply gets no share)
/// - An all-zero list is fine (defined edge case: all-zero allocations)
///
/// ## Example
/// ```rust
/// use keel_core::money::Money;
/// use keel_core::validation::validate_weights;
///
/// let ok = [Money::from_cents(100), Money::zero()];
/// assert!(validate_weights(&ok).is_ok());
///
/// let bad = [Money::from_cents(-1)];
/// assert!(validate_weights(&bad).is_err());
/// ```
pub fn validate_weights(weights: &[Money]) -> Result<(), DistributionError> {
    for (index, weight) in weights.iter().enumerate() {
        if weight.is_negative() {
            return Err(DistributionError::NegativeWeight {
                index,
                weight_cents: weight.cents(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Item Tree Validators
// =============================================================================

/// Validates the two-level item graph of an arena.
///
/// ## Rules
/// - An item with a parent has no children of its own
/// - Every child/parent id resolves inside the arena
/// - A parent's child list and each child's back-reference agree
///
/// Run at the start of a collection pass so a corrupted graph aborts the
/// pass before any item is mutated.
pub fn validate_item_tree(arena: &ItemArena) -> Result<(), TreeError> {
    for (id, item) in arena.iter() {
        if item.parent.is_some() && item.has_children() {
            return Err(TreeError::NestedChild(id));
        }

        if let Some(parent_id) = item.parent {
            let parent = arena
                .get(parent_id)
                .ok_or(TreeError::UnknownItem(parent_id))?;
            if !parent.children.contains(&id) {
                return Err(TreeError::BrokenBackReference {
                    parent: parent_id,
                    child: id,
                });
            }
        }

        for &child_id in &item.children {
            let child = arena.get(child_id).ok_or(TreeError::UnknownItem(child_id))?;
            if child.parent != Some(id) {
                return Err(TreeError::BrokenBackReference {
                    parent: id,
                    child: child_id,
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
