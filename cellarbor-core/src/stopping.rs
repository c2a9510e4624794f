//! Split acceptance policy.
//!
//! A candidate bipartition is scored by the Newman modularity of the
//! two-community partition of the subset graph, with self-affinity removed
//! so a cell's similarity to itself never counts as community mass. The
//! split is accepted when the gain exceeds the configured threshold and
//! both children satisfy the minimum leaf size. The policy is a value
//! object threaded through the build, not ambient state, so alternative
//! criteria can be swapped in behind the same shape.

use std::num::NonZeroUsize;

use crate::{similarity::AffinityGraph, spectral::SIGN_EPS};

/// Reason a subset stays (or becomes) a leaf instead of splitting.
///
/// Internal signal only: every variant degrades to a leaf transition and is
/// never surfaced through the public API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SplitRejection {
    /// Subset has fewer cells than can be meaningfully bisected.
    TooSmall,
    /// A proposed child would fall below the configured minimum leaf size.
    ChildTooSmall,
    /// The embedding placed every cell on one side, the solver stalled, or
    /// the subset graph has no edge mass to redistribute.
    NoInformativeSplit,
    /// The modularity gain did not exceed the configured threshold.
    BelowQualityGain,
    /// The node sits at the configured maximum depth.
    DepthLimit,
}

/// Scores candidate splits by modularity gain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ModularityEvaluator {
    min_leaf_size: NonZeroUsize,
    quality_threshold: f64,
}

impl ModularityEvaluator {
    pub(crate) fn new(min_leaf_size: NonZeroUsize, quality_threshold: f64) -> Self {
        Self {
            min_leaf_size,
            quality_threshold,
        }
    }

    /// Evaluates a candidate split given as local index lists over `graph`.
    ///
    /// Returns the modularity gain when the split is acceptable, or the
    /// rejection that turns the parent into a leaf. `degrees` must be the
    /// affinity row sums of the same graph.
    pub(crate) fn evaluate(
        &self,
        graph: &AffinityGraph<'_>,
        degrees: &[f64],
        left: &[usize],
        right: &[usize],
    ) -> Result<f64, SplitRejection> {
        debug_assert_eq!(left.len() + right.len(), graph.len());
        debug_assert_eq!(degrees.len(), graph.len());

        let floor = self.min_leaf_size.get();
        if left.len() < floor || right.len() < floor {
            return Err(SplitRejection::ChildTooSmall);
        }

        let n = graph.len();
        // Total edge mass with self-loops removed. A subset of mutually
        // dissimilar cells has nothing to redistribute and cannot split.
        let total: f64 = degrees.iter().sum();
        let edge_mass = total - n as f64;
        if edge_mass <= SIGN_EPS {
            return Err(SplitRejection::NoInformativeSplit);
        }

        // One matvec against the left indicator yields both communities'
        // terms: S·1_right = degrees - S·1_left.
        let mut indicator = vec![0.0; n];
        for &index in left {
            indicator[index] = 1.0;
        }
        let mut gene_scratch = vec![0.0; graph.gene_count()];
        let mut affinity_to_left = vec![0.0; n];
        graph.matvec(&indicator, &mut gene_scratch, &mut affinity_to_left);

        let within_left: f64 =
            left.iter().map(|&i| affinity_to_left[i]).sum::<f64>() - left.len() as f64;
        let within_right: f64 = right
            .iter()
            .map(|&i| degrees[i] - affinity_to_left[i])
            .sum::<f64>()
            - right.len() as f64;
        let degree_left: f64 = left.iter().map(|&i| degrees[i]).sum::<f64>() - left.len() as f64;
        let degree_right: f64 =
            right.iter().map(|&i| degrees[i]).sum::<f64>() - right.len() as f64;

        let gain = within_left / edge_mass - (degree_left / edge_mass).powi(2)
            + within_right / edge_mass
            - (degree_right / edge_mass).powi(2);

        if gain <= self.quality_threshold {
            return Err(SplitRejection::BelowQualityGain);
        }
        Ok(gain)
    }
}
