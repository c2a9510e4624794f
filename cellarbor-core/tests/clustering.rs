//! End-to-end tests for the clustering pipeline.

mod common;

use cellarbor_core::{
    CellarborBuilder, CellarborError, ExpressionMatrix, NodeId, RowNorm, assign_paths,
};
use common::{assert_partition, assert_paths_valid, block_matrix, ids};
use rstest::rstest;

#[test]
fn single_cell_matrix_is_one_leaf() {
    let matrix = ExpressionMatrix::from_dense(ids("c", 1), ids("g", 2), &[vec![1.0, 2.0]])
        .expect("matrix must validate")
        .normalize_rows(RowNorm::L1);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    assert_eq!(result.tree().len(), 1);
    assert!(result.tree().root().is_leaf());
    assert_eq!(result.assignments().len(), 1);
    assert_eq!(result.assignments()[0].path(), [NodeId::new(0)]);
    assert_eq!(result.assignments()[0].leaf(), NodeId::new(0));
}

#[test]
fn two_separated_groups_split_once_at_the_root() {
    let matrix = block_matrix(2, 5);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    let tree = result.tree();
    assert_eq!(tree.len(), 3);
    assert_eq!(result.leaf_count(), 2);
    assert_eq!(tree.leaf_sizes(), [(NodeId::new(1), 5), (NodeId::new(2), 5)]);

    for assignment in &result.assignments()[..5] {
        assert_eq!(assignment.path(), [NodeId::new(0), NodeId::new(1)]);
    }
    for assignment in &result.assignments()[5..] {
        assert_eq!(assignment.path(), [NodeId::new(0), NodeId::new(2)]);
    }
    assert_partition(&result, 10);
    assert_paths_valid(&result);
}

#[test]
fn identical_cells_yield_a_single_leaf() {
    let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![2.0, 1.0, 1.0]).collect();
    let matrix = ExpressionMatrix::from_dense(ids("c", 10), ids("g", 3), &rows)
        .expect("matrix must validate")
        .normalize_rows(RowNorm::L2);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    assert_eq!(result.tree().len(), 1);
    assert_eq!(result.leaf_count(), 1);
    assert_eq!(result.tree().root().cell_count(), 10);
}

#[test]
fn three_groups_resolve_into_three_pure_leaves() {
    let matrix = block_matrix(3, 5);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    assert_eq!(result.leaf_count(), 3);
    assert_partition(&result, 15);
    assert_paths_valid(&result);
    for leaf in result.tree().leaves() {
        let block = leaf.cells()[0] / 5;
        assert!(leaf.cells().iter().all(|&cell| cell / 5 == block));
    }
}

#[test]
fn identical_runs_produce_identical_results() {
    let matrix = block_matrix(3, 4);
    let cellarbor = CellarborBuilder::new()
        .with_min_leaf_size(2)
        .build()
        .expect("configuration is valid");

    let first = cellarbor.run(&matrix).expect("first run must succeed");
    let second = cellarbor.run(&matrix).expect("second run must succeed");
    assert_eq!(first, second);
}

#[rstest]
#[case(0.6)]
#[case(f64::MAX)]
fn quality_threshold_blocks_marginal_splits(#[case] threshold: f64) {
    // The clean two-block split scores exactly 0.5.
    let matrix = block_matrix(2, 5);
    let cellarbor = CellarborBuilder::new()
        .with_split_quality_threshold(threshold)
        .build()
        .expect("configuration is valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    assert_eq!(result.tree().len(), 1);
}

#[test]
fn raw_counts_are_rejected_before_any_work() {
    let matrix = ExpressionMatrix::from_dense(
        ids("c", 2),
        ids("g", 2),
        &[vec![1.0, 0.0], vec![0.0, 1.0]],
    )
    .expect("matrix must validate");
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let err = cellarbor
        .run(&matrix)
        .expect_err("unnormalized matrices must be rejected");
    assert!(matches!(err, CellarborError::NotNormalized));
}

#[test]
fn tf_idf_weighted_pipeline_still_separates_blocks() {
    // Add a housekeeping gene expressed everywhere; TF-IDF damps it so the
    // block-specific genes keep driving the split.
    let rows: Vec<Vec<f64>> = (0..10)
        .map(|cell| {
            if cell < 5 {
                vec![3.0, 0.0, 1.0]
            } else {
                vec![0.0, 3.0, 1.0]
            }
        })
        .collect();
    let matrix = ExpressionMatrix::from_dense(ids("c", 10), ids("g", 3), &rows)
        .expect("matrix must validate")
        .apply_tf_idf(true)
        .normalize_rows(RowNorm::L2);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");

    let result = cellarbor.run(&matrix).expect("run must succeed");
    assert_eq!(result.leaf_count(), 2);
    let mut sides: Vec<Vec<usize>> = result
        .tree()
        .leaves()
        .map(|leaf| leaf.cells().to_vec())
        .collect();
    sides.sort();
    assert_eq!(sides, [vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8, 9]]);
}

#[test]
fn assignments_can_be_recomputed_from_the_frozen_tree() {
    let matrix = block_matrix(2, 5);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");
    let result = cellarbor.run(&matrix).expect("run must succeed");

    let recomputed = assign_paths(result.tree());
    assert_eq!(recomputed, result.assignments());
}

#[test]
fn labelled_pairs_cell_ids_with_assignments() {
    let matrix = block_matrix(2, 5);
    let cellarbor = CellarborBuilder::new().build().expect("defaults are valid");
    let result = cellarbor.run(&matrix).expect("run must succeed");

    let (cell_id, assignment) = result.labelled().next().expect("ten cells are labelled");
    assert_eq!(cell_id, "c0");
    assert_eq!(assignment.cell(), 0);

    let lookup = result
        .assignment_for("c7")
        .expect("known identifiers resolve");
    assert_eq!(lookup.cell(), 7);
    assert!(result.assignment_for("missing").is_none());
}
