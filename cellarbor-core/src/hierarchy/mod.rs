//! Cluster tree arena: node records, identifiers, and read accessors.
//!
//! Nodes live in a flat arena indexed by [`NodeId`]; parent and child links
//! are ids rather than pointers, which is what lets sibling subtrees be
//! built concurrently and the finished tree be walked without lifetimes
//! tangling (see the build module). Identifiers are canonicalized in
//! breadth-first order when the tree is frozen, so two runs over identical
//! input and configuration produce identical ids.

mod build;

use std::fmt;

pub(crate) use self::build::TreeBuilder;

/// Identifier of one tree node. The root is always id `0`.
///
/// # Examples
/// ```
/// use cellarbor_core::NodeId;
///
/// let id = NodeId::new(4);
/// assert_eq!(id.get(), 4);
/// assert_eq!(id.to_string(), "4");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a node identifier.
    #[rustfmt::skip]
    #[must_use]
    pub fn new(id: usize) -> Self { Self(id) }

    /// Returns the underlying numeric identifier.
    #[rustfmt::skip]
    #[must_use]
    pub fn get(self) -> usize { self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One vertex of the cluster tree: a subset of cell row indices together
/// with its position in the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    cells: Vec<usize>,
    depth: usize,
    split_gain: Option<f64>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        parent: Option<NodeId>,
        children: Option<(NodeId, NodeId)>,
        cells: Vec<usize>,
        depth: usize,
        split_gain: Option<f64>,
    ) -> Self {
        Self {
            id,
            parent,
            children,
            cells,
            depth,
            split_gain,
        }
    }

    /// Returns this node's identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the parent id, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the `(left, right)` child ids, or `None` for a leaf.
    #[must_use]
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    /// Returns whether this node is a terminal cluster.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Returns the cell row indices owned by this node, in ascending order.
    #[must_use]
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Returns the number of cells owned by this node.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the node's distance from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the modularity gain of the accepted split, or `None` for a
    /// leaf.
    #[must_use]
    pub fn split_gain(&self) -> Option<f64> {
        self.split_gain
    }
}

/// The frozen cluster tree.
///
/// Owns every [`Node`] by id. The union of all leaf cell subsets is exactly
/// the clustered cell set, and leaf subsets are pairwise disjoint; both
/// invariants hold by construction because every accepted split partitions
/// its parent's subset.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty(), "a tree always has a root");
        debug_assert!(
            nodes.iter().enumerate().all(|(i, n)| n.id().get() == i),
            "node ids must match arena positions"
        );
        Self { nodes }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.get())
    }

    /// Returns the total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree holds no nodes. Always `false` for trees
    /// produced by the pipeline, which emit at least the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns every node in id order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Iterates over the terminal clusters in id order.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Returns the parent→child edge list, suitable for rendering the tree
    /// as a directed acyclic graph.
    #[must_use]
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        for node in &self.nodes {
            if let Some((left, right)) = node.children() {
                edges.push((node.id(), left));
                edges.push((node.id(), right));
            }
        }
        edges
    }

    /// Returns `(leaf id, cell count)` for every terminal cluster.
    #[must_use]
    pub fn leaf_sizes(&self) -> Vec<(NodeId, usize)> {
        self.leaves()
            .map(|leaf| (leaf.id(), leaf.cell_count()))
            .collect()
    }

    /// Returns the depth of the deepest node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(Node::depth).max().unwrap_or(0)
    }
}
