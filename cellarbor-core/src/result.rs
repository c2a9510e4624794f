//! Clustering outcome: the frozen tree plus per-cell assignments.

use crate::{hierarchy::Tree, paths::CellAssignment};

/// The two artifacts the pipeline commits to producing: the cluster tree
/// and the mapping from every cell to its leaf and lineage.
///
/// The assignments are derived from the tree and ordered by cell row index;
/// they are never mutated independently of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusteringResult {
    tree: Tree,
    assignments: Vec<CellAssignment>,
    cell_ids: Vec<String>,
}

impl ClusteringResult {
    pub(crate) fn new(
        tree: Tree,
        assignments: Vec<CellAssignment>,
        cell_ids: Vec<String>,
    ) -> Self {
        debug_assert_eq!(assignments.len(), cell_ids.len());
        Self {
            tree,
            assignments,
            cell_ids,
        }
    }

    /// Returns the frozen cluster tree.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns every cell's assignment, ordered by cell row index.
    #[must_use]
    pub fn assignments(&self) -> &[CellAssignment] {
        &self.assignments
    }

    /// Returns the cell identifiers in row order.
    #[must_use]
    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    /// Returns the number of terminal clusters.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.tree.leaves().count()
    }

    /// Looks up the assignment for a cell identifier. Linear in the number
    /// of cells.
    #[must_use]
    pub fn assignment_for(&self, cell_id: &str) -> Option<&CellAssignment> {
        let index = self.cell_ids.iter().position(|id| id == cell_id)?;
        self.assignments.get(index)
    }

    /// Iterates over `(cell identifier, assignment)` pairs in row order.
    pub fn labelled(&self) -> impl Iterator<Item = (&str, &CellAssignment)> + '_ {
        self.cell_ids
            .iter()
            .map(String::as_str)
            .zip(&self.assignments)
    }
}
