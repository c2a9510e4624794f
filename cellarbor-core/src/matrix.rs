//! Expression matrix storage, validation, and row normalization.
//!
//! Single-cell count matrices are majority-zero, so rows are held in
//! compressed sparse row form. Every per-split operation the pipeline
//! performs is a row-major sweep, which keeps this layout cache-friendly.
//!
//! The matrix is loaded once and read-only afterwards; normalization and
//! TF-IDF weighting consume the matrix and return a re-flagged copy so the
//! clustering entry point can insist on normalized input by construction.

use crate::error::MatrixError;

/// Row scaling applied to an [`ExpressionMatrix`] before clustering.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RowNorm {
    /// Scale each row to unit sum.
    L1,
    /// Scale each row to unit Euclidean norm.
    L2,
}

/// A cells-by-genes expression matrix in compressed sparse row form.
///
/// Rows are cells, columns are genes. Construction validates shape,
/// identifier counts, and value ranges up front so the clustering pipeline
/// never observes a malformed matrix.
///
/// # Examples
/// ```
/// use cellarbor_core::{ExpressionMatrix, RowNorm};
///
/// let matrix = ExpressionMatrix::from_dense(
///     vec!["c0".into(), "c1".into()],
///     vec!["g0".into(), "g1".into(), "g2".into()],
///     &[vec![3.0, 0.0, 1.0], vec![0.0, 2.0, 2.0]],
/// )?;
/// assert_eq!(matrix.n_cells(), 2);
/// assert_eq!(matrix.n_genes(), 3);
/// assert!(!matrix.is_normalized());
///
/// let matrix = matrix.normalize_rows(RowNorm::L1);
/// assert!(matrix.is_normalized());
/// # Ok::<(), cellarbor_core::MatrixError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionMatrix {
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
    cell_ids: Vec<String>,
    gene_ids: Vec<String>,
    norm: Option<RowNorm>,
}

impl ExpressionMatrix {
    /// Builds a matrix from dense rows, dropping zero entries.
    ///
    /// # Errors
    /// Returns [`MatrixError`] when the input has no rows or columns, when
    /// identifier counts disagree with the shape, when a row width differs
    /// from the gene list, or when a value is negative, non-finite, or a row
    /// is entirely zero.
    pub fn from_dense(
        cell_ids: Vec<String>,
        gene_ids: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self, MatrixError> {
        if rows.is_empty() {
            return Err(MatrixError::NoCells);
        }
        if gene_ids.is_empty() {
            return Err(MatrixError::NoGenes);
        }
        if cell_ids.len() != rows.len() {
            return Err(MatrixError::CellIdMismatch {
                ids: cell_ids.len(),
                rows: rows.len(),
            });
        }

        let genes = gene_ids.len();
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for (row, data) in rows.iter().enumerate() {
            if data.len() != genes {
                return Err(MatrixError::RowWidthMismatch {
                    row,
                    expected: genes,
                    got: data.len(),
                });
            }
            let row_start = values.len();
            for (column, &value) in data.iter().enumerate() {
                validate_value(row, column, value)?;
                if value > 0.0 {
                    col_indices.push(column);
                    values.push(value);
                }
            }
            if values.len() == row_start {
                return Err(MatrixError::EmptyRow { row });
            }
            row_ptr.push(values.len());
        }

        Ok(Self {
            row_ptr,
            col_indices,
            values,
            cell_ids,
            gene_ids,
            norm: None,
        })
    }

    /// Builds a matrix directly from compressed sparse row components.
    ///
    /// `row_ptr` must have one entry per cell plus a trailing total, and the
    /// column indices of each row must be strictly increasing.
    ///
    /// # Errors
    /// Returns [`MatrixError`] when the sparse structure is malformed or any
    /// value violates the non-negative, finite, non-empty-row contract.
    pub fn from_csr(
        cell_ids: Vec<String>,
        gene_ids: Vec<String>,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, MatrixError> {
        if cell_ids.is_empty() {
            return Err(MatrixError::NoCells);
        }
        if gene_ids.is_empty() {
            return Err(MatrixError::NoGenes);
        }
        if row_ptr.len() != cell_ids.len() + 1 {
            return Err(MatrixError::RowPointers {
                reason: "row pointer length must be the cell count plus one",
            });
        }
        if row_ptr.first() != Some(&0) {
            return Err(MatrixError::RowPointers {
                reason: "row pointers must start at zero",
            });
        }
        if col_indices.len() != values.len() {
            return Err(MatrixError::RowPointers {
                reason: "column index and value counts must match",
            });
        }
        if row_ptr.last() != Some(&values.len()) {
            return Err(MatrixError::RowPointers {
                reason: "row pointers must end at the number of stored entries",
            });
        }
        if row_ptr.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(MatrixError::RowPointers {
                reason: "row pointers must be non-decreasing",
            });
        }

        let genes = gene_ids.len();
        for row in 0..cell_ids.len() {
            let start = row_ptr[row];
            let end = row_ptr[row + 1];
            let mut previous: Option<usize> = None;
            let mut any_positive = false;
            for offset in start..end {
                let column = col_indices[offset];
                if column >= genes {
                    return Err(MatrixError::ColumnOutOfBounds { row, column, genes });
                }
                if previous.is_some_and(|last| column <= last) {
                    return Err(MatrixError::UnsortedColumns { row });
                }
                previous = Some(column);
                validate_value(row, column, values[offset])?;
                any_positive |= values[offset] > 0.0;
            }
            if !any_positive {
                return Err(MatrixError::EmptyRow { row });
            }
        }

        Ok(Self {
            row_ptr,
            col_indices,
            values,
            cell_ids,
            gene_ids,
            norm: None,
        })
    }

    /// Scales every row by the requested norm and flags the matrix normalized.
    ///
    /// Construction guarantees every row carries positive expression, so the
    /// scaling factor is always positive.
    #[must_use]
    pub fn normalize_rows(mut self, norm: RowNorm) -> Self {
        for row in 0..self.cell_ids.len() {
            let start = self.row_ptr[row];
            let end = self.row_ptr[row + 1];
            let slice = &self.values[start..end];
            let scale = match norm {
                RowNorm::L1 => slice.iter().sum::<f64>(),
                RowNorm::L2 => slice.iter().map(|v| v * v).sum::<f64>().sqrt(),
            };
            debug_assert!(scale > 0.0, "validated rows always have positive norm");
            for value in &mut self.values[start..end] {
                *value /= scale;
            }
        }
        self.norm = Some(norm);
        self
    }

    /// Re-weights counts by inverse document frequency across cells.
    ///
    /// Each stored entry is multiplied by `ln((1 + n) / (1 + df)) + 1` in the
    /// smoothed form, or `ln(n / df) + 1` otherwise, where `df` counts the
    /// cells expressing the gene. The result is no longer flagged normalized;
    /// apply [`Self::normalize_rows`] afterwards.
    #[must_use]
    pub fn apply_tf_idf(mut self, smooth: bool) -> Self {
        let mut document_frequency = vec![0usize; self.gene_ids.len()];
        for (&column, &value) in self.col_indices.iter().zip(&self.values) {
            if value > 0.0 {
                document_frequency[column] += 1;
            }
        }
        let cells = self.cell_ids.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| {
                if df == 0 {
                    // Gene never observed; its weight is irrelevant.
                    return 0.0;
                }
                let df = df as f64;
                if smooth {
                    ((1.0 + cells) / (1.0 + df)).ln() + 1.0
                } else {
                    (cells / df).ln() + 1.0
                }
            })
            .collect();
        for (&column, value) in self.col_indices.iter().zip(&mut self.values) {
            *value *= idf[column];
        }
        self.norm = None;
        self
    }

    /// Returns the number of cells (rows).
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cell_ids.len()
    }

    /// Returns the number of genes (columns).
    #[must_use]
    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    /// Returns the ordered cell identifiers.
    #[must_use]
    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    /// Returns the ordered gene identifiers.
    #[must_use]
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Returns whether the matrix has been row-normalized.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.norm.is_some()
    }

    /// Returns the applied row norm, if any.
    #[must_use]
    pub fn norm(&self) -> Option<RowNorm> {
        self.norm
    }

    /// Returns the sparse entries of one cell row as parallel slices.
    pub(crate) fn row(&self, index: usize) -> (&[usize], &[f64]) {
        let start = self.row_ptr[index];
        let end = self.row_ptr[index + 1];
        (&self.col_indices[start..end], &self.values[start..end])
    }
}

fn validate_value(row: usize, column: usize, value: f64) -> Result<(), MatrixError> {
    if !value.is_finite() {
        return Err(MatrixError::NonFiniteValue { row, column });
    }
    if value < 0.0 {
        return Err(MatrixError::NegativeValue { row, column, value });
    }
    Ok(())
}
