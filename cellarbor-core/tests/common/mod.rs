//! Shared fixtures for cellarbor-core integration tests.

use cellarbor_core::{ClusteringResult, ExpressionMatrix, RowNorm};

/// Generates `prefix0`, `prefix1`, ... identifiers.
pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

/// Builds a matrix of equally sized cell blocks, one orthogonal gene pattern
/// per block, normalized to unit Euclidean row norm.
pub fn block_matrix(blocks: usize, per_block: usize) -> ExpressionMatrix {
    let rows: Vec<Vec<f64>> = (0..blocks * per_block)
        .map(|cell| {
            let mut row = vec![0.0; blocks];
            row[cell / per_block] = 1.0;
            row
        })
        .collect();
    ExpressionMatrix::from_dense(ids("c", blocks * per_block), ids("g", blocks), &rows)
        .expect("block matrix must validate")
        .normalize_rows(RowNorm::L2)
}

/// Asserts that leaf subsets exactly partition `0..cells`.
pub fn assert_partition(result: &ClusteringResult, cells: usize) {
    let mut seen: Vec<usize> = result
        .tree()
        .leaves()
        .flat_map(|leaf| leaf.cells().iter().copied())
        .collect();
    seen.sort_unstable();
    let expected: Vec<usize> = (0..cells).collect();
    assert_eq!(seen, expected, "leaf subsets must partition the cell set");
}

/// Asserts that every recorded path runs root-to-leaf along tree edges.
pub fn assert_paths_valid(result: &ClusteringResult) {
    let tree = result.tree();
    for assignment in result.assignments() {
        let path = assignment.path();
        assert_eq!(path.first(), Some(&tree.root().id()), "paths start at the root");
        assert_eq!(path.last(), Some(&assignment.leaf()), "paths end at the leaf");
        for step in path.windows(2) {
            let parent = tree.get(step[0]).expect("path nodes must exist");
            let (left, right) = parent
                .children()
                .expect("inner path nodes must have children");
            assert!(
                step[1] == left || step[1] == right,
                "consecutive path nodes must be connected by an edge"
            );
        }
    }
}
