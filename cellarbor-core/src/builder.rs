//! Builder for configuring the clustering pipeline.
//!
//! Every knob the pipeline recognizes lives here and is validated before
//! any recursive work begins; there are no ambient defaults buried in the
//! algorithm modules.

use std::num::NonZeroUsize;

use crate::{Result, cellarbor::Cellarbor, error::CellarborError};

const DEFAULT_MIN_LEAF_SIZE: usize = 3;
const DEFAULT_MAX_ITERATIONS: usize = 300;
const DEFAULT_TOLERANCE: f64 = 1e-6;
const DEFAULT_QUALITY_THRESHOLD: f64 = 0.0;

/// Configures and constructs [`Cellarbor`] instances.
///
/// # Examples
/// ```
/// use cellarbor_core::CellarborBuilder;
///
/// let cellarbor = CellarborBuilder::new()
///     .with_min_leaf_size(5)
///     .with_max_iterations(200)
///     .with_convergence_tolerance(1e-8)
///     .with_split_quality_threshold(0.01)
///     .with_max_depth(Some(12))
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(cellarbor.min_leaf_size().get(), 5);
/// assert_eq!(cellarbor.max_depth(), Some(12));
/// ```
#[derive(Clone, Debug)]
pub struct CellarborBuilder {
    min_leaf_size: usize,
    max_iterations: usize,
    convergence_tolerance: f64,
    split_quality_threshold: f64,
    max_depth: Option<usize>,
}

impl Default for CellarborBuilder {
    fn default() -> Self {
        Self {
            min_leaf_size: DEFAULT_MIN_LEAF_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_tolerance: DEFAULT_TOLERANCE,
            split_quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_depth: None,
        }
    }
}

impl CellarborBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the minimum number of cells a leaf may hold.
    #[must_use]
    pub fn with_min_leaf_size(mut self, size: usize) -> Self {
        self.min_leaf_size = size;
        self
    }

    /// Returns the configured minimum leaf size.
    #[must_use]
    pub fn min_leaf_size(&self) -> usize {
        self.min_leaf_size
    }

    /// Overrides the eigensolver iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Returns the configured iteration budget.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Overrides the eigensolver convergence tolerance.
    #[must_use]
    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    /// Returns the configured convergence tolerance.
    #[must_use]
    pub fn convergence_tolerance(&self) -> f64 {
        self.convergence_tolerance
    }

    /// Overrides the minimum modularity gain a split must clear.
    #[must_use]
    pub fn with_split_quality_threshold(mut self, threshold: f64) -> Self {
        self.split_quality_threshold = threshold;
        self
    }

    /// Returns the configured split quality threshold.
    #[must_use]
    pub fn split_quality_threshold(&self) -> f64 {
        self.split_quality_threshold
    }

    /// Overrides the optional safety bound on tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Returns the configured depth bound.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Validates the configuration and constructs a [`Cellarbor`] instance.
    ///
    /// # Errors
    /// Returns [`CellarborError::InvalidMinLeafSize`] or
    /// [`CellarborError::InvalidMaxIterations`] when a count knob is zero,
    /// [`CellarborError::InvalidTolerance`] when the tolerance is not a
    /// finite positive number, and
    /// [`CellarborError::InvalidQualityThreshold`] when the threshold is not
    /// finite.
    pub fn build(self) -> Result<Cellarbor> {
        let min_leaf_size = NonZeroUsize::new(self.min_leaf_size).ok_or(
            CellarborError::InvalidMinLeafSize {
                got: self.min_leaf_size,
            },
        )?;
        let max_iterations = NonZeroUsize::new(self.max_iterations).ok_or(
            CellarborError::InvalidMaxIterations {
                got: self.max_iterations,
            },
        )?;
        if !self.convergence_tolerance.is_finite() || self.convergence_tolerance <= 0.0 {
            return Err(CellarborError::InvalidTolerance {
                got: self.convergence_tolerance,
            });
        }
        if !self.split_quality_threshold.is_finite() {
            return Err(CellarborError::InvalidQualityThreshold {
                got: self.split_quality_threshold,
            });
        }

        Ok(Cellarbor::new(
            min_leaf_size,
            max_iterations,
            self.convergence_tolerance,
            self.split_quality_threshold,
            self.max_depth,
        ))
    }
}
