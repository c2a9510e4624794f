//! Command-line front end for the cellarbor clustering library.
//!
//! The binary is glue around `cellarbor-core`: it loads a delimited count
//! matrix, normalizes rows, runs the clustering pipeline, and renders the
//! tree and per-cell assignments to stdout. All file handling lives here;
//! the core only ever sees in-memory matrices.

pub mod cli;
pub mod logging;
