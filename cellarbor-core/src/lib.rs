//! Cellarbor core library.
//!
//! Partitions a collection of single-cell expression profiles into a binary
//! hierarchy of increasingly homogeneous subpopulations by recursive
//! spectral bipartitioning, and reports, for every cell, the leaf cluster
//! it lands in together with its root-to-leaf lineage.

mod builder;
mod cellarbor;
mod error;
mod hierarchy;
mod matrix;
mod paths;
mod result;
mod similarity;
mod spectral;
mod stopping;

pub use crate::{
    builder::CellarborBuilder,
    cellarbor::Cellarbor,
    error::{CellarborError, CellarborErrorCode, MatrixError, MatrixErrorCode, Result},
    hierarchy::{Node, NodeId, Tree},
    matrix::{ExpressionMatrix, RowNorm},
    paths::{CellAssignment, assign_paths},
    result::ClusteringResult,
};
