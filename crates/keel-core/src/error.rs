//! # Error Types
//!
//! Domain-specific error types for keel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  keel-core errors (this file)                                          │
//! │  ├── CollectError      - Umbrella for one collection pass              │
//! │  │     ├── Rule         → RuleError (from the injected engine)         │
//! │  │     ├── Distribution → DistributionError (allocation invariants)    │
//! │  │     └── Tree         → TreeError (item graph invariants)            │
//! │  ├── RuleError         - Raised at the rule-engine boundary            │
//! │  ├── DistributionError - Proportional-allocation failures              │
//! │  └── TreeError         - Parent/child graph violations                 │
//! │                                                                         │
//! │  Flow: RuleError | DistributionError | TreeError → CollectError        │
//! │        → checkout pipeline (logs, marks the total uncomputed)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item index, rule id, weight)
//! 3. Errors are enum variants, never String
//! 4. This core adds no retry logic - every error aborts the pass and
//!    surfaces unmodified to the caller

use thiserror::Error;

use crate::types::ItemId;

// =============================================================================
// Rule Engine Boundary Error
// =============================================================================

/// Errors raised by the injected rule validation engine.
///
/// The engine owns all rule policy (applicability, amounts, budgets).
/// keel-core never catches or repairs these; a partially-applied discount
/// set is worse than a failed pricing pass that can be retried upstream.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule definition could not be evaluated.
    #[error("rule '{rule_id}' failed to evaluate: {reason}")]
    Evaluation { rule_id: String, reason: String },

    /// A rule definition is structurally invalid (bad action, bad
    /// qualifier). Detected by the engine while loading or applying.
    #[error("rule '{rule_id}' is malformed: {reason}")]
    MalformedRule { rule_id: String, reason: String },

    /// The engine could not establish its per-pass state.
    #[error("rule engine failed to initialize pass: {reason}")]
    InitFailed { reason: String },
}

// =============================================================================
// Distribution Error
// =============================================================================

/// Invariant violations inside the proportional-allocation routine.
///
/// These should never occur for rule-consistent input: weights come from
/// row totals, which upstream cost processing keeps non-negative. When
/// one does occur we fail fast rather than emit a negative or
/// non-reconstructing allocation.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// A child's weight (its base row total) was negative.
    #[error("negative weight {weight_cents} at child index {index}")]
    NegativeWeight { index: usize, weight_cents: i64 },

    /// An allocation result did not line up with the child list.
    #[error("expected {expected} allocations, produced {actual}")]
    AllocationMismatch { expected: usize, actual: usize },
}

// =============================================================================
// Item Tree Error
// =============================================================================

/// Violations of the two-level item graph.
///
/// A line item is either a root (no parent) or a child (has a parent,
/// no children of its own). There is no deeper nesting.
#[derive(Debug, Error)]
pub enum TreeError {
    /// An `ItemId` did not resolve inside the arena.
    #[error("item {0:?} does not exist in the arena")]
    UnknownItem(ItemId),

    /// Linking would give a child item children of its own.
    #[error("item {0:?} is a child and cannot have children")]
    NestedChild(ItemId),

    /// Linking would give an item a second parent.
    #[error("item {0:?} already has a parent")]
    AlreadyLinked(ItemId),

    /// A parent's child list and the child's back-reference disagree.
    #[error("item {child:?} is listed under {parent:?} but points elsewhere")]
    BrokenBackReference { parent: ItemId, child: ItemId },
}

// =============================================================================
// Collection Error
// =============================================================================

/// Umbrella error for one `collect` pass over a shipping assignment.
///
/// All collaborator errors surface unmodified through this enum; the
/// surrounding pipeline decides whether to log, retry, or mark the
/// total as uncomputed.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The injected rule engine failed. Aborts the rest of the pass.
    #[error("rule evaluation failed: {0}")]
    Rule(#[from] RuleError),

    /// The allocation routine detected an invariant violation.
    #[error("discount distribution failed: {0}")]
    Distribution(#[from] DistributionError),

    /// The item graph handed to the collector is inconsistent.
    #[error("item tree is inconsistent: {0}")]
    Tree(#[from] TreeError),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CollectError.
pub type CollectResult<T> = Result<T, CollectError>;

// =============================================================================
// Unit Tests
// =============================================================================
