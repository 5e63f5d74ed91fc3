//! # Distribution Module
//!
//! Proportional allocation with rounding-remainder carry.
//!
//! ## The Problem
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A parent-level rule computed 20.00 off a bundle of 3 children,        │
//! │  each weighing 100.00. Tax, invoicing, and refunds need that 20.00     │
//! │  attributed per child SKU.                                              │
//! │                                                                         │
//! │  Naive per-child rounding:   6.67 + 6.67 + 6.67 = 20.01  ❌ drift      │
//! │  This module:                6.67 + 6.66 + 6.67 = 20.00  ✅ exact      │
//! │                                                                         │
//! │  Each child gets its proportional share plus the rounding remainder    │
//! │  carried from the children before it, so the sum always closes.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## How the Carry Works
//! The i-th allocation is computed against the *cumulative* weight:
//!
//! ```text
//!   target_i = round(total · (w_1 + … + w_i) / weight_sum)
//!   alloc_i  = target_i − target_(i−1)
//! ```
//!
//! The final cumulative target is `round(total · weight_sum / weight_sum)`
//! = `total`, so reconstruction is exact by construction - no drift to
//! patch up afterwards. All intermediate products use i128.

use tracing::debug;

use crate::error::DistributionError;
use crate::money::{round_div, Money, RoundingMode};
use crate::validation::validate_weights;

// =============================================================================
// Distribution Algorithm
// =============================================================================

/// Splits `total` across `weights` proportionally, rounded to minor
/// units, such that the allocations sum to `total` exactly.
///
/// ## Edge Cases
/// - Zero weight sum → every allocation is zero regardless of `total`.
///   No divide-by-zero, no equal-split fallback.
/// - Zero total → every allocation is zero regardless of weights.
/// - A single non-zero weight → the whole total, untouched by rounding.
///
/// ## Errors
/// [`DistributionError::NegativeWeight`] if any weight is negative.
///
/// ## Example
/// ```rust
/// use keel_core::distribution::distribute;
/// use keel_core::money::{Money, RoundingMode};
///
/// let weights = vec![Money::from_cents(10000); 3];
/// let shares = distribute(
///     Money::from_cents(2000),
///     &weights,
///     RoundingMode::HalfAwayFromZero,
/// )
/// .unwrap();
///
/// let cents: Vec<i64> = shares.iter().map(Money::cents).collect();
/// assert_eq!(cents, vec![667, 666, 667]);
/// ```
pub fn distribute(
    total: Money,
    weights: &[Money],
    mode: RoundingMode,
) -> Result<Vec<Money>, DistributionError> {
    validate_weights(weights)?;

    if weights.is_empty() {
        return Ok(Vec::new());
    }

    let weight_sum: i128 = weights.iter().map(|w| w.cents() as i128).sum();
    if weight_sum == 0 {
        debug!(total = %total, children = weights.len(), "zero weight sum, all-zero allocation");
        return Ok(vec![Money::zero(); weights.len()]);
    }

    let total_cents = total.cents() as i128;
    let mut allocations = Vec::with_capacity(weights.len());
    let mut cumulative_weight: i128 = 0;
    let mut allocated: i128 = 0;

    for weight in weights {
        cumulative_weight += weight.cents() as i128;
        let target = round_div(total_cents * cumulative_weight, weight_sum, mode);
        allocations.push(Money::from_cents((target - allocated) as i64));
        allocated = target;
    }

    // Exact by construction: the last target is total itself
    debug_assert_eq!(allocated, total_cents);

    Ok(allocations)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MODE: RoundingMode = RoundingMode::HalfAwayFromZero;

    fn cents(allocations: &[Money]) -> Vec<i64> {
        allocations.iter().map(Money::cents).collect()
    }

    fn distribute_cents(total: i64, weights: &[i64]) -> Vec<i64> {
        let weights: Vec<Money> = weights.iter().copied().map(Money::from_cents).collect();
        cents(&distribute(Money::from_cents(total), &weights, MODE).unwrap())
    }

    /// Three children each weighing 100.00, the four parent aggregates
    /// 20.00 / 10.00 / 40.00 / 20.00. Each field is distributed
    /// independently and must reconstruct exactly.
    #[test]
    fn test_three_equal_children_carry_the_split_penny() {
        let weights = [10000, 10000, 10000];

        assert_eq!(distribute_cents(2000, &weights), vec![667, 666, 667]);
        assert_eq!(distribute_cents(1000, &weights), vec![333, 334, 333]);
        assert_eq!(distribute_cents(4000, &weights), vec![1333, 1334, 1333]);
        assert_eq!(distribute_cents(2000, &weights), vec![667, 666, 667]);
    }

    #[test]
    fn test_zero_weight_sum_gives_all_zeros() {
        assert_eq!(distribute_cents(2000, &[0, 0, 0]), vec![0, 0, 0]);
        // Single zero-weight child, zero total
        assert_eq!(distribute_cents(0, &[0]), vec![0]);
    }

    #[test]
    fn test_zero_total_gives_all_zeros() {
        assert_eq!(distribute_cents(0, &[10000, 5000]), vec![0, 0]);
    }

    #[test]
    fn test_single_child_gets_whole_total() {
        assert_eq!(distribute_cents(1999, &[12345]), vec![1999]);
    }

    #[test]
    fn test_empty_weights() {
        let shares = distribute(Money::from_cents(500), &[], MODE).unwrap();
        assert!(shares.is_empty());
    }

    #[test]
    fn test_uneven_weights_follow_proportion() {
        // 10.00 over weights 1:2:1 → 2.50 / 5.00 / 2.50
        assert_eq!(
            distribute_cents(1000, &[2500, 5000, 2500]),
            vec![250, 500, 250]
        );
    }

    #[test]
    fn test_zero_weight_child_gets_nothing() {
        let shares = distribute_cents(1000, &[5000, 0, 5000]);
        assert_eq!(shares[1], 0);
        assert_eq!(shares.iter().sum::<i64>(), 1000);
    }

    #[test]
    fn test_negative_total_distributes_exactly() {
        let shares = distribute_cents(-2000, &[10000, 10000, 10000]);
        assert_eq!(shares.iter().sum::<i64>(), -2000);
        assert_eq!(shares, vec![-667, -666, -667]);
    }

    #[test]
    fn test_negative_weight_fails_fast() {
        let weights = [Money::from_cents(100), Money::from_cents(-1)];
        let err = distribute(Money::from_cents(1000), &weights, MODE).unwrap_err();
        assert!(matches!(
            err,
            DistributionError::NegativeWeight { index: 1, .. }
        ));
    }

    /// Exactness sweep: irregular totals and weights must always
    /// reconstruct to the penny.
    #[test]
    fn test_exact_reconstruction_sweep() {
        let cases: &[(i64, &[i64])] = &[
            (1, &[1, 1, 1]),
            (99, &[7, 13, 29]),
            (2000, &[9999, 1, 1]),
            (101, &[50, 50]),
            (333, &[100, 100, 100, 100, 100, 100, 100]),
            (1000003, &[317, 12345, 8, 999983]),
        ];

        for &(total, weights) in cases {
            let shares = distribute_cents(total, weights);
            assert_eq!(
                shares.iter().sum::<i64>(),
                total,
                "drift for total {total} over {weights:?}"
            );
        }
    }

    #[test]
    fn test_half_to_even_also_reconstructs() {
        let weights: Vec<Money> = [10000, 10000, 10000]
            .into_iter()
            .map(Money::from_cents)
            .collect();
        let shares = distribute(
            Money::from_cents(2000),
            &weights,
            RoundingMode::HalfToEven,
        )
        .unwrap();
        assert_eq!(shares.iter().copied().sum::<Money>().cents(), 2000);
    }
}
