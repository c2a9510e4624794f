//! Implicit cosine affinity over a subset of matrix rows.
//!
//! For row-normalized expression data the affinity between two cells is the
//! inner product of their expression vectors, so the affinity matrix of a
//! subset is `S = B Bᵀ` where `B` is the subset slice of the matrix. `S` is
//! never materialized: every consumer needs only matrix-vector products
//! against `S`, and those factor through the sparse rows as `B (Bᵀ v)` in
//! time proportional to the stored entries of the subset.

use crate::{matrix::ExpressionMatrix, stopping::SplitRejection};

/// Affinity structure between the cells of one subset.
///
/// Purely a view: two graphs built over the same subset of the same matrix
/// perform identical arithmetic, which is what makes repeated runs of the
/// pipeline reproducible.
#[derive(Debug)]
pub(crate) struct AffinityGraph<'a> {
    matrix: &'a ExpressionMatrix,
    rows: &'a [usize],
}

impl<'a> AffinityGraph<'a> {
    /// Builds the affinity view for `rows`, rejecting subsets that cannot be
    /// bisected at all.
    pub(crate) fn over(
        matrix: &'a ExpressionMatrix,
        rows: &'a [usize],
    ) -> Result<Self, SplitRejection> {
        if rows.len() < 2 {
            return Err(SplitRejection::TooSmall);
        }
        Ok(Self { matrix, rows })
    }

    /// Number of cells in the subset.
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Width of the gene-space scratch buffer required by [`Self::matvec`].
    pub(crate) fn gene_count(&self) -> usize {
        self.matrix.n_genes()
    }

    /// Computes `out = S v` as `B (Bᵀ v)` without materializing `S`.
    ///
    /// `gene_scratch` must hold one slot per gene and is overwritten.
    pub(crate) fn matvec(&self, v: &[f64], gene_scratch: &mut [f64], out: &mut [f64]) {
        debug_assert_eq!(v.len(), self.rows.len());
        debug_assert_eq!(gene_scratch.len(), self.matrix.n_genes());
        debug_assert_eq!(out.len(), self.rows.len());

        gene_scratch.fill(0.0);
        for (local, &row) in self.rows.iter().enumerate() {
            let weight = v[local];
            if weight == 0.0 {
                continue;
            }
            let (cols, vals) = self.matrix.row(row);
            for (&column, &value) in cols.iter().zip(vals) {
                gene_scratch[column] += value * weight;
            }
        }
        for (local, &row) in self.rows.iter().enumerate() {
            let (cols, vals) = self.matrix.row(row);
            let mut acc = 0.0;
            for (&column, &value) in cols.iter().zip(vals) {
                acc += value * gene_scratch[column];
            }
            out[local] = acc;
        }
    }

    /// Row sums of the affinity matrix, i.e. the weighted degree of each cell.
    pub(crate) fn degrees(&self) -> Vec<f64> {
        let ones = vec![1.0; self.len()];
        let mut gene_scratch = vec![0.0; self.matrix.n_genes()];
        let mut out = vec![0.0; self.len()];
        self.matvec(&ones, &mut gene_scratch, &mut out);
        out
    }
}
