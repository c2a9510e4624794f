//! Per-cell leaf and root-to-leaf path materialization.

use crate::hierarchy::{Node, NodeId, Tree};

/// Final placement of one cell: its terminal cluster and full lineage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellAssignment {
    cell: usize,
    leaf: NodeId,
    path: Vec<NodeId>,
}

impl CellAssignment {
    /// Returns the cell's row index in the expression matrix.
    #[must_use]
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Returns the id of the leaf holding the cell.
    #[must_use]
    pub fn leaf(&self) -> NodeId {
        self.leaf
    }

    /// Returns the node ids from the root down to the leaf, inclusive.
    #[must_use]
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }
}

/// Walks the frozen tree once and records, for every cell, its leaf and the
/// root-to-leaf path.
///
/// Output is ordered by cell row index. Derived data: recompute after any
/// rebuild of the tree.
#[must_use]
pub fn assign_paths(tree: &Tree) -> Vec<CellAssignment> {
    let total: usize = tree.leaves().map(Node::cell_count).sum();
    let mut assignments: Vec<Option<CellAssignment>> = vec![None; total];
    for leaf in tree.leaves() {
        let path = lineage(tree, leaf);
        for &cell in leaf.cells() {
            debug_assert!(assignments[cell].is_none(), "leaf subsets are disjoint");
            assignments[cell] = Some(CellAssignment {
                cell,
                leaf: leaf.id(),
                path: path.clone(),
            });
        }
    }
    assignments
        .into_iter()
        .map(|assignment| assignment.expect("leaf subsets partition the cell set"))
        .collect()
}

/// Parent walk from `leaf` to the root, reversed into root-to-leaf order.
fn lineage(tree: &Tree, leaf: &Node) -> Vec<NodeId> {
    let mut path = vec![leaf.id()];
    let mut current = leaf;
    while let Some(parent) = current.parent() {
        current = tree
            .get(parent)
            .expect("parent links always point at arena nodes");
        path.push(current.id());
    }
    path.reverse();
    path
}
