//! Concurrent construction of the cluster tree.
//!
//! Each node walks the Pending → Splitting → Leaf | Internal state machine:
//! a pending subset is bisected spectrally, the candidate is scored, and an
//! accepted split recurses into both children with `rayon::join` while a
//! rejection of any kind terminates the subset as a leaf. Sibling subtrees
//! share nothing but the read-only matrix and the write-once arena, so they
//! are dispatched in parallel.
//!
//! Node records are inserted into a concurrent arena under provisional ids
//! drawn from an atomic counter; a node is inserted only after its subtree
//! is complete, so no partially-built node is ever observable. Freezing the
//! tree renumbers ids breadth-first (left child before right), which makes
//! the final ids independent of scheduling.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};

use crate::{
    cellarbor::Cellarbor,
    hierarchy::{Node, NodeId, Tree},
    matrix::ExpressionMatrix,
    similarity::AffinityGraph,
    spectral::{SolverOptions, fiedler_embedding, split_by_sign},
    stopping::{ModularityEvaluator, SplitRejection},
};

/// Subsets below this size are never bisected; a two-sided split of fewer
/// than three cells cannot leave both sides with any internal structure.
const MIN_SPLITTABLE: usize = 3;

/// An accepted bipartition of one subset, already canonically oriented.
struct SplitCandidate {
    left: Vec<usize>,
    right: Vec<usize>,
    gain: f64,
}

/// Node record as held in the build arena, keyed by provisional id.
struct Draft {
    children: Option<(usize, usize)>,
    cells: Vec<usize>,
    gain: Option<f64>,
}

pub(crate) struct TreeBuilder<'a> {
    matrix: &'a ExpressionMatrix,
    solver: SolverOptions,
    evaluator: ModularityEvaluator,
    min_leaf_size: usize,
    max_depth: Option<usize>,
    arena: DashMap<usize, Draft>,
    next_id: AtomicUsize,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(matrix: &'a ExpressionMatrix, config: &Cellarbor) -> Self {
        Self {
            matrix,
            solver: SolverOptions {
                max_iterations: config.max_iterations(),
                tolerance: config.convergence_tolerance(),
            },
            evaluator: ModularityEvaluator::new(
                config.min_leaf_size(),
                config.split_quality_threshold(),
            ),
            min_leaf_size: config.min_leaf_size().get(),
            max_depth: config.max_depth(),
            arena: DashMap::new(),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Grows the full tree from the root subset and freezes it.
    #[instrument(name = "core.build_tree", skip(self), fields(cells = self.matrix.n_cells()))]
    pub(crate) fn build(self) -> Tree {
        let cells: Vec<usize> = (0..self.matrix.n_cells()).collect();
        let root = self.grow(cells, 0);
        let tree = freeze(self.arena, root);
        info!(
            nodes = tree.len(),
            leaves = tree.leaves().count(),
            depth = tree.depth(),
            "cluster tree frozen"
        );
        tree
    }

    /// Processes one pending subset to a terminal classification and returns
    /// its provisional id.
    fn grow(&self, cells: Vec<usize>, depth: usize) -> usize {
        match self.attempt_split(&cells, depth) {
            Ok(SplitCandidate { left, right, gain }) => {
                let (left_id, right_id) = rayon::join(
                    || self.grow(left, depth + 1),
                    || self.grow(right, depth + 1),
                );
                self.insert(Draft {
                    children: Some((left_id, right_id)),
                    cells,
                    gain: Some(gain),
                })
            }
            Err(rejection) => {
                debug!(?rejection, size = cells.len(), depth, "subset becomes a leaf");
                self.insert(Draft {
                    children: None,
                    cells,
                    gain: None,
                })
            }
        }
    }

    fn insert(&self, draft: Draft) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.arena.insert(id, draft);
        debug_assert!(previous.is_none(), "provisional ids are never reused");
        id
    }

    fn attempt_split(
        &self,
        cells: &[usize],
        depth: usize,
    ) -> Result<SplitCandidate, SplitRejection> {
        if self.max_depth.is_some_and(|limit| depth >= limit) {
            return Err(SplitRejection::DepthLimit);
        }
        if cells.len() < MIN_SPLITTABLE || cells.len() < self.min_leaf_size {
            return Err(SplitRejection::TooSmall);
        }

        let graph = AffinityGraph::over(self.matrix, cells)?;
        let degrees = graph.degrees();
        let Some(embedding) = fiedler_embedding(&graph, &degrees, &self.solver) else {
            return Err(SplitRejection::NoInformativeSplit);
        };
        if !embedding.converged {
            warn!(
                size = cells.len(),
                iterations = embedding.iterations,
                "eigensolver hit its iteration cap, treating subset as a leaf"
            );
            return Err(SplitRejection::NoInformativeSplit);
        }
        let (positive, negative) =
            split_by_sign(&embedding.coordinates).ok_or(SplitRejection::NoInformativeSplit)?;

        let gain = self.evaluator.evaluate(&graph, &degrees, &positive, &negative)?;

        let positive_cells: Vec<usize> = positive.iter().map(|&local| cells[local]).collect();
        let negative_cells: Vec<usize> = negative.iter().map(|&local| cells[local]).collect();
        let (left, right) = orient(positive_cells, negative_cells);
        Ok(SplitCandidate { left, right, gain })
    }
}

/// Canonical child orientation: the larger side becomes the left child;
/// equal sizes tie-break to the side holding the smallest cell row index.
/// The eigenvector's sign is arbitrary, so ordering by content is what
/// keeps ids reproducible across runs.
pub(super) fn orient(a: Vec<usize>, b: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    if a.len() != b.len() {
        return if a.len() > b.len() { (a, b) } else { (b, a) };
    }
    if a.first() < b.first() { (a, b) } else { (b, a) }
}

/// Renumbers the provisional arena breadth-first into the frozen [`Tree`].
fn freeze(arena: DashMap<usize, Draft>, root: usize) -> Tree {
    let mut drafts: HashMap<usize, Draft> = arena.into_iter().collect();

    struct Placed {
        provisional: usize,
        parent: Option<NodeId>,
        depth: usize,
    }

    let mut layout = vec![Placed {
        provisional: root,
        parent: None,
        depth: 0,
    }];
    let mut cursor = 0;
    while cursor < layout.len() {
        let provisional = layout[cursor].provisional;
        let depth = layout[cursor].depth;
        let id = NodeId::new(cursor);
        if let Some((left, right)) = drafts
            .get(&provisional)
            .and_then(|draft| draft.children)
        {
            layout.push(Placed {
                provisional: left,
                parent: Some(id),
                depth: depth + 1,
            });
            layout.push(Placed {
                provisional: right,
                parent: Some(id),
                depth: depth + 1,
            });
        }
        cursor += 1;
    }

    let canonical: HashMap<usize, usize> = layout
        .iter()
        .enumerate()
        .map(|(index, placed)| (placed.provisional, index))
        .collect();

    let mut nodes = Vec::with_capacity(layout.len());
    for (index, placed) in layout.iter().enumerate() {
        let draft = drafts
            .remove(&placed.provisional)
            .expect("every reachable provisional id has a draft");
        let children = draft.children.map(|(left, right)| {
            (
                NodeId::new(canonical[&left]),
                NodeId::new(canonical[&right]),
            )
        });
        nodes.push(Node::new(
            NodeId::new(index),
            placed.parent,
            children,
            draft.cells,
            placed.depth,
            draft.gain,
        ));
    }
    Tree::from_nodes(nodes)
}
