//! Iterative spectral embedding used to bisect one cell subset.
//!
//! The split direction is the second eigenvector of the degree-normalized
//! affinity `N = D^{-1/2} S D^{-1/2}`, equivalently the Fiedler direction of
//! the normalized graph Laplacian over the subset. `N` always has `d^{1/2}`
//! (square-rooted degrees) as its leading eigenvector, so a single power
//! iteration with deflation against that known vector is enough; no general
//! eigendecomposition is ever performed. Because the affinity is a Gram
//! matrix, `N` is positive semidefinite and the iteration cannot oscillate
//! in sign.

use std::num::NonZeroUsize;

use rand::{Rng, SeedableRng, distributions::Standard, rngs::SmallRng};

use crate::similarity::AffinityGraph;

/// Floating-point comparisons against zero use this tolerance so boundary
/// coordinates are assigned to a side deterministically.
pub(crate) const SIGN_EPS: f64 = 1e-9;

/// Seed for the deterministic start vector. Fixed so identical input and
/// configuration always walk the same trajectory.
const START_SEED: u64 = 0x5EED;

/// Iteration budget and convergence tolerance for the eigensolver.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SolverOptions {
    pub(crate) max_iterations: NonZeroUsize,
    pub(crate) tolerance: f64,
}

/// Result of one embedding computation.
#[derive(Clone, Debug)]
pub(crate) struct Embedding {
    /// One coordinate per subset cell; the sign pattern drives the split.
    pub(crate) coordinates: Vec<f64>,
    /// Whether the iterate change dropped below the tolerance in budget.
    pub(crate) converged: bool,
    /// Iterations actually performed.
    pub(crate) iterations: usize,
}

/// Computes the Fiedler-direction embedding of the subset.
///
/// Returns `None` when the affinity carries no mass orthogonal to the
/// trivial eigenvector (all cells effectively identical), which callers
/// treat as "no informative split". Otherwise returns the embedding along
/// with the convergence flag; a `false` flag means the iteration cap was
/// reached first.
///
/// The function is pure: all solver state lives on the stack of this call.
pub(crate) fn fiedler_embedding(
    graph: &AffinityGraph<'_>,
    degrees: &[f64],
    options: &SolverOptions,
) -> Option<Embedding> {
    let n = graph.len();
    debug_assert_eq!(degrees.len(), n);
    debug_assert!(
        degrees.iter().all(|&d| d > 0.0),
        "validated matrices yield positive degrees"
    );

    let sqrt_degrees: Vec<f64> = degrees.iter().map(|d| d.sqrt()).collect();
    let mut trivial = sqrt_degrees.clone();
    let trivial_norm = normalize(&mut trivial);
    debug_assert!(trivial_norm > 0.0);

    let mut current = seeded_start(n);
    orthogonalize(&mut current, &trivial);
    if normalize(&mut current) <= SIGN_EPS {
        return None;
    }

    let mut gene_scratch = vec![0.0; graph.gene_count()];
    let mut half = vec![0.0; n];
    let mut next = vec![0.0; n];
    let mut converged = false;
    let mut iterations = 0;

    for round in 0..options.max_iterations.get() {
        iterations = round + 1;
        // One application of N = D^{-1/2} S D^{-1/2}.
        for (slot, (value, scale)) in half.iter_mut().zip(current.iter().zip(&sqrt_degrees)) {
            *slot = value / scale;
        }
        graph.matvec(&half, &mut gene_scratch, &mut next);
        for (value, scale) in next.iter_mut().zip(&sqrt_degrees) {
            *value /= scale;
        }
        orthogonalize(&mut next, &trivial);
        if normalize(&mut next) <= SIGN_EPS {
            // The deflated operator annihilated the iterate: the subset has
            // no second spectral direction.
            return None;
        }
        let delta = aligned_sup_distance(&next, &current);
        std::mem::swap(&mut current, &mut next);
        if delta <= options.tolerance {
            converged = true;
            break;
        }
    }

    // Back-transform to the generalized eigenvector of (D - S, D); only the
    // sign pattern matters downstream and the degrees are positive, so the
    // scaling never flips a side.
    let coordinates = current
        .iter()
        .zip(&sqrt_degrees)
        .map(|(value, scale)| value / scale)
        .collect();
    Some(Embedding {
        coordinates,
        converged,
        iterations,
    })
}

/// Splits local indices by coordinate sign.
///
/// Returns `None` when every cell lands on one side, i.e. the embedding
/// found no informative split.
pub(crate) fn split_by_sign(coordinates: &[f64]) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for (index, &coordinate) in coordinates.iter().enumerate() {
        if coordinate > SIGN_EPS {
            positive.push(index);
        } else {
            negative.push(index);
        }
    }
    if positive.is_empty() || negative.is_empty() {
        return None;
    }
    Some((positive, negative))
}

fn seeded_start(n: usize) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(START_SEED);
    (0..n)
        .map(|_| {
            let draw: f64 = rng.sample(Standard);
            draw - 0.5
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn orthogonalize(vector: &mut [f64], unit: &[f64]) {
    let projection = dot(vector, unit);
    for (value, basis) in vector.iter_mut().zip(unit) {
        *value -= projection * basis;
    }
}

/// Scales `vector` to unit length, returning its prior norm. Zero-length
/// vectors are left untouched.
fn normalize(vector: &mut [f64]) -> f64 {
    let norm = dot(vector, vector).sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
    norm
}

/// Sup-norm distance between unit vectors, up to the eigenvector's sign.
fn aligned_sup_distance(a: &[f64], b: &[f64]) -> f64 {
    let direct = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max);
    let flipped = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x + y).abs())
        .fold(0.0, f64::max);
    direct.min(flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{ExpressionMatrix, RowNorm};

    fn ids(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix}{i}")).collect()
    }

    /// Two groups of cells with orthogonal expression patterns.
    fn two_block_matrix(per_block: usize) -> ExpressionMatrix {
        let rows: Vec<Vec<f64>> = (0..2 * per_block)
            .map(|i| {
                if i < per_block {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect();
        ExpressionMatrix::from_dense(ids("c", 2 * per_block), ids("g", 2), &rows)
            .expect("block matrix must validate")
            .normalize_rows(RowNorm::L2)
    }

    fn options(max_iterations: usize, tolerance: f64) -> SolverOptions {
        SolverOptions {
            max_iterations: NonZeroUsize::new(max_iterations).expect("non-zero"),
            tolerance,
        }
    }

    #[test]
    fn separates_orthogonal_blocks() {
        let matrix = two_block_matrix(4);
        let rows: Vec<usize> = (0..8).collect();
        let graph = AffinityGraph::over(&matrix, &rows).expect("subset is large enough");
        let degrees = graph.degrees();

        let embedding = fiedler_embedding(&graph, &degrees, &options(100, 1e-10))
            .expect("two blocks have a second spectral direction");
        assert!(embedding.converged);

        let first = embedding.coordinates[0];
        for &coordinate in &embedding.coordinates[..4] {
            assert!((coordinate - first).abs() < 1e-8, "block must be constant");
            assert!(coordinate.abs() > SIGN_EPS);
        }
        for &coordinate in &embedding.coordinates[4..] {
            assert!(
                coordinate.signum() != first.signum(),
                "blocks must take opposite signs"
            );
        }
    }

    #[test]
    fn identical_cells_have_no_second_direction() {
        let rows: Vec<Vec<f64>> = (0..5).map(|_| vec![1.0, 2.0, 3.0]).collect();
        let matrix = ExpressionMatrix::from_dense(ids("c", 5), ids("g", 3), &rows)
            .expect("matrix must validate")
            .normalize_rows(RowNorm::L2);
        let subset: Vec<usize> = (0..5).collect();
        let graph = AffinityGraph::over(&matrix, &subset).expect("subset is large enough");
        let degrees = graph.degrees();

        assert!(fiedler_embedding(&graph, &degrees, &options(50, 1e-8)).is_none());
    }

    #[test]
    fn reports_non_convergence_at_iteration_cap() {
        let matrix = two_block_matrix(3);
        let rows: Vec<usize> = (0..6).collect();
        let graph = AffinityGraph::over(&matrix, &rows).expect("subset is large enough");
        let degrees = graph.degrees();

        let embedding = fiedler_embedding(&graph, &degrees, &options(1, 1e-15))
            .expect("the direction exists even when unconverged");
        assert!(!embedding.converged);
        assert_eq!(embedding.iterations, 1);
    }

    #[test]
    fn embedding_is_deterministic() {
        let matrix = two_block_matrix(5);
        let rows: Vec<usize> = (0..10).collect();
        let graph = AffinityGraph::over(&matrix, &rows).expect("subset is large enough");
        let degrees = graph.degrees();

        let first = fiedler_embedding(&graph, &degrees, &options(80, 1e-9))
            .expect("embedding must exist");
        let second = fiedler_embedding(&graph, &degrees, &options(80, 1e-9))
            .expect("embedding must exist");
        assert_eq!(first.coordinates, second.coordinates);
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn split_by_sign_requires_both_sides() {
        assert!(split_by_sign(&[0.5, 0.5, 0.5]).is_none());
        assert!(split_by_sign(&[0.0, 0.0]).is_none());
        let (positive, negative) =
            split_by_sign(&[0.4, -0.2, 0.1, -0.9]).expect("mixed signs must split");
        assert_eq!(positive, [0, 2]);
        assert_eq!(negative, [1, 3]);
    }
}
