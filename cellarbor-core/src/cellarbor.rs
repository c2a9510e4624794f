//! Clustering orchestration entry point.
//!
//! [`Cellarbor`] holds the validated configuration and drives the pipeline:
//! input checks, recursive tree construction, then path assignment over the
//! frozen tree.

use std::num::NonZeroUsize;

use tracing::{info, instrument, warn};

use crate::{
    Result,
    error::CellarborError,
    hierarchy::TreeBuilder,
    matrix::ExpressionMatrix,
    paths::assign_paths,
    result::ClusteringResult,
};

/// Entry point for running the clustering pipeline.
///
/// # Examples
/// ```
/// use cellarbor_core::{CellarborBuilder, ExpressionMatrix, RowNorm};
///
/// let matrix = ExpressionMatrix::from_dense(
///     vec!["c0".into(), "c1".into()],
///     vec!["g0".into(), "g1".into()],
///     &[vec![1.0, 0.0], vec![0.0, 2.0]],
/// )?
/// .normalize_rows(RowNorm::L2);
///
/// let cellarbor = CellarborBuilder::new().build()?;
/// let result = cellarbor.run(&matrix)?;
/// // Two cells are below the splittable floor: the root stays a leaf.
/// assert_eq!(result.tree().len(), 1);
/// assert_eq!(result.assignments()[0].path(), [cellarbor_core::NodeId::new(0)]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Cellarbor {
    min_leaf_size: NonZeroUsize,
    max_iterations: NonZeroUsize,
    convergence_tolerance: f64,
    split_quality_threshold: f64,
    max_depth: Option<usize>,
}

impl Cellarbor {
    pub(crate) fn new(
        min_leaf_size: NonZeroUsize,
        max_iterations: NonZeroUsize,
        convergence_tolerance: f64,
        split_quality_threshold: f64,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            min_leaf_size,
            max_iterations,
            convergence_tolerance,
            split_quality_threshold,
            max_depth,
        }
    }

    /// Returns the minimum number of cells a leaf may hold.
    #[must_use]
    pub fn min_leaf_size(&self) -> NonZeroUsize {
        self.min_leaf_size
    }

    /// Returns the eigensolver iteration budget.
    #[must_use]
    pub fn max_iterations(&self) -> NonZeroUsize {
        self.max_iterations
    }

    /// Returns the eigensolver convergence tolerance.
    #[must_use]
    pub fn convergence_tolerance(&self) -> f64 {
        self.convergence_tolerance
    }

    /// Returns the minimum modularity gain a split must clear.
    #[must_use]
    pub fn split_quality_threshold(&self) -> f64 {
        self.split_quality_threshold
    }

    /// Returns the optional safety bound on tree depth.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Executes the clustering pipeline against `matrix`.
    ///
    /// The matrix must have been row-normalized (see
    /// [`ExpressionMatrix::normalize_rows`]); clustering raw counts would
    /// let library size dominate every similarity, so it is rejected as a
    /// configuration error rather than silently producing depth-one noise.
    ///
    /// # Errors
    /// Returns [`CellarborError::NotNormalized`] when the matrix is not
    /// flagged normalized. Numerical trouble inside the build never
    /// escalates: affected subsets degrade to leaves.
    #[instrument(
        name = "core.run",
        err,
        skip(self, matrix),
        fields(
            cells = matrix.n_cells(),
            genes = matrix.n_genes(),
            min_leaf_size = %self.min_leaf_size,
        ),
    )]
    pub fn run(&self, matrix: &ExpressionMatrix) -> Result<ClusteringResult> {
        if !matrix.is_normalized() {
            warn!("expression matrix is not row-normalized, returning error");
            return Err(CellarborError::NotNormalized);
        }

        let tree = TreeBuilder::new(matrix, self).build();
        let assignments = assign_paths(&tree);
        info!(
            nodes = tree.len(),
            leaves = tree.leaves().count(),
            "clustering completed"
        );
        Ok(ClusteringResult::new(
            tree,
            assignments,
            matrix.cell_ids().to_vec(),
        ))
    }
}
