//! Command implementations and argument parsing for the cellarbor CLI.
//!
//! The input format is deliberately small: UTF-8 delimited text with a
//! header row of gene identifiers and one row per cell, the first column
//! holding cell identifiers and the rest non-negative counts.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cellarbor_core::{
    Cellarbor, CellarborBuilder, CellarborError, ClusteringResult, ExpressionMatrix, MatrixError,
    RowNorm,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

const DEFAULT_MIN_LEAF_SIZE: usize = 3;
const DEFAULT_MAX_ITERATIONS: usize = 300;
const DEFAULT_TOLERANCE: f64 = 1e-6;
const DEFAULT_QUALITY_THRESHOLD: f64 = 0.0;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "cellarbor",
    about = "Cluster a single-cell count matrix into a binary hierarchy."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster a delimited count-matrix file.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to a delimited text file: header of gene ids, one row per cell.
    pub path: PathBuf,

    /// Field delimiter used in the input file.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Row normalization applied before clustering.
    #[arg(long, value_enum, default_value = "l2")]
    pub norm: NormChoice,

    /// Re-weight counts by inverse document frequency before normalizing.
    #[arg(long = "tf-idf")]
    pub tf_idf: bool,

    /// Minimum number of cells per leaf cluster.
    #[arg(long = "min-leaf-size", default_value_t = DEFAULT_MIN_LEAF_SIZE)]
    pub min_leaf_size: usize,

    /// Iteration budget for the spectral eigensolver.
    #[arg(long = "max-iterations", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Convergence tolerance for the spectral eigensolver.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Minimum modularity gain a split must clear.
    #[arg(long = "quality-threshold", default_value_t = DEFAULT_QUALITY_THRESHOLD)]
    pub quality_threshold: f64,

    /// Optional safety bound on tree depth.
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Row normalizations selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NormChoice {
    /// Scale each row to unit sum.
    L1,
    /// Scale each row to unit Euclidean norm.
    L2,
}

impl From<NormChoice> for RowNorm {
    fn from(choice: NormChoice) -> Self {
        match choice {
            NormChoice::L1 => Self::L1,
            NormChoice::L2 => Self::L2,
        }
    }
}

/// Errors raised while parsing a delimited count matrix.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file held no header row.
    #[error("input holds no header row")]
    MissingHeader,
    /// The header row declared no gene columns.
    #[error("header row declares no gene columns")]
    NoGeneColumns,
    /// A data row had the wrong number of fields.
    #[error("line {line} has {got} fields but the header declares {expected}")]
    RowWidth {
        /// One-based line number in the input file.
        line: usize,
        /// Field count implied by the header.
        expected: usize,
        /// Field count actually found.
        got: usize,
    },
    /// A count field failed to parse as a number.
    #[error("line {line}: `{value}` is not a valid count")]
    InvalidCount {
        /// One-based line number in the input file.
        line: usize,
        /// The raw unparseable field.
        value: String,
    },
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading the input.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input file was not a well-formed delimited matrix.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The parsed matrix failed core validation.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    /// Core clustering failed.
    #[error(transparent)]
    Core(#[from] CellarborError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Name of the clustered data source.
    pub source: String,
    /// Clustering produced by the core pipeline.
    pub result: ClusteringResult,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when parsing or execution fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use cellarbor_cli::cli::{Cli, run_cli};
/// # use clap::Parser;
/// # use std::io::Write;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mut file = tempfile::NamedTempFile::new()?;
/// writeln!(file, "cell,g0,g1")?;
/// writeln!(file, "a,1,0")?;
/// writeln!(file, "b,0,1")?;
/// let cli = Cli::parse_from([
///     "cellarbor",
///     "run",
///     file.path().to_str().expect("utf-8 path"),
/// ]);
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.result.assignments().len(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<RunSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(path = %command.path.display(), min_leaf_size = command.min_leaf_size),
)]
fn run_command(command: RunCommand) -> Result<RunSummary, CliError> {
    let cellarbor = CellarborBuilder::new()
        .with_min_leaf_size(command.min_leaf_size)
        .with_max_iterations(command.max_iterations)
        .with_convergence_tolerance(command.tolerance)
        .with_split_quality_threshold(command.quality_threshold)
        .with_max_depth(command.max_depth)
        .build()?;

    let source = derive_source_name(&command.path, command.name.as_deref());
    let matrix = load_matrix(&command.path, command.delimiter, command.tf_idf, command.norm)?;
    let result = run_clustering(&cellarbor, &matrix)?;

    info!(
        source = source.as_str(),
        cells = matrix.n_cells(),
        leaves = result.leaf_count(),
        "clustering completed"
    );
    Ok(RunSummary { source, result })
}

/// Loads, optionally re-weights, and normalizes the matrix at `path`.
///
/// # Errors
/// Returns [`CliError`] when the file cannot be read, parsed, or validated.
pub fn load_matrix(
    path: &Path,
    delimiter: char,
    tf_idf: bool,
    norm: NormChoice,
) -> Result<ExpressionMatrix, CliError> {
    let contents = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_matrix(&contents, delimiter)?;
    let matrix = ExpressionMatrix::from_dense(parsed.cell_ids, parsed.gene_ids, &parsed.rows)?;
    let matrix = if tf_idf {
        matrix.apply_tf_idf(true)
    } else {
        matrix
    };
    Ok(matrix.normalize_rows(norm.into()))
}

fn run_clustering(
    cellarbor: &Cellarbor,
    matrix: &ExpressionMatrix,
) -> Result<ClusteringResult, CliError> {
    Ok(cellarbor.run(matrix)?)
}

#[derive(Debug)]
struct ParsedMatrix {
    cell_ids: Vec<String>,
    gene_ids: Vec<String>,
    rows: Vec<Vec<f64>>,
}

fn parse_matrix(contents: &str, delimiter: char) -> Result<ParsedMatrix, ParseError> {
    let mut lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(ParseError::MissingHeader)?;
    let mut header_fields = header.split(delimiter);
    // First header field is the corner label over the cell-id column.
    let _ = header_fields.next();
    let gene_ids: Vec<String> = header_fields.map(|field| field.trim().to_owned()).collect();
    if gene_ids.is_empty() {
        return Err(ParseError::NoGeneColumns);
    }

    let mut cell_ids = Vec::new();
    let mut rows = Vec::new();
    for (index, line) in lines {
        let line_number = index + 1;
        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != gene_ids.len() + 1 {
            return Err(ParseError::RowWidth {
                line: line_number,
                expected: gene_ids.len() + 1,
                got: fields.len(),
            });
        }
        cell_ids.push(fields[0].trim().to_owned());
        let mut row = Vec::with_capacity(gene_ids.len());
        for field in &fields[1..] {
            let value: f64 = field.trim().parse().map_err(|_| ParseError::InvalidCount {
                line: line_number,
                value: (*field).to_owned(),
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    Ok(ParsedMatrix {
        cell_ids,
        gene_ids,
        rows,
    })
}

fn derive_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "matrix".to_owned())
}

/// Renders `summary` to `writer` in a human-readable text format: the tree
/// as an edge list with per-leaf cell counts, then one assignment line per
/// cell with its root-to-leaf path.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &RunSummary, mut writer: impl Write) -> io::Result<()> {
    let tree = summary.result.tree();
    writeln!(writer, "source: {}", summary.source)?;
    writeln!(writer, "cells: {}", summary.result.assignments().len())?;
    writeln!(writer, "nodes: {}", tree.len())?;
    writeln!(writer, "leaves: {}", summary.result.leaf_count())?;
    writeln!(writer, "depth: {}", tree.depth())?;

    writeln!(writer, "edges:")?;
    for (parent, child) in tree.edges() {
        writeln!(writer, "{parent} -> {child}")?;
    }

    writeln!(writer, "leaf cell counts:")?;
    for (leaf, count) in tree.leaf_sizes() {
        writeln!(writer, "{leaf}: {count}")?;
    }

    writeln!(writer, "assignments:")?;
    for (cell_id, assignment) in summary.result.labelled() {
        let path = assignment
            .path()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/");
        writeln!(writer, "{cell_id}\t{}\t{path}", assignment.leaf())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use clap::Parser;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    fn write_two_block_csv() -> NamedTempFile {
        let file = NamedTempFile::new().expect("temp file must be created");
        let mut contents = String::from("cell,g0,g1\n");
        for cell in 0..3 {
            contents.push_str(&format!("a{cell},4,0\n"));
        }
        for cell in 0..3 {
            contents.push_str(&format!("b{cell},0,4\n"));
        }
        fs::write(file.path(), contents).expect("temp file must be writable");
        file
    }

    #[test]
    fn parse_matrix_reads_header_and_rows() {
        let parsed = parse_matrix("id,g0,g1\nc0,1,2\nc1,3,0\n", ',')
            .expect("well-formed input must parse");
        assert_eq!(parsed.cell_ids, ["c0", "c1"]);
        assert_eq!(parsed.gene_ids, ["g0", "g1"]);
        assert_eq!(parsed.rows, [vec![1.0, 2.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn parse_matrix_skips_blank_lines() {
        let parsed = parse_matrix("id,g0\n\nc0,1\n\n", ',').expect("blank lines are ignored");
        assert_eq!(parsed.cell_ids, ["c0"]);
    }

    #[rstest]
    #[case("", ',')]
    #[case("  \n  \n", ',')]
    fn parse_matrix_rejects_missing_header(#[case] contents: &str, #[case] delimiter: char) {
        let err = parse_matrix(contents, delimiter).expect_err("header is required");
        assert!(matches!(err, ParseError::MissingHeader));
    }

    #[test]
    fn parse_matrix_rejects_short_rows_with_line_context() {
        let err = parse_matrix("id,g0,g1\nc0,1\n", ',').expect_err("short rows are invalid");
        match err {
            ParseError::RowWidth {
                line,
                expected,
                got,
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_matrix_rejects_unparseable_counts() {
        let err = parse_matrix("id,g0\nc0,abc\n", ',').expect_err("counts must be numeric");
        match err {
            ParseError::InvalidCount { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_cli_clusters_a_two_block_file() {
        let file = write_two_block_csv();
        let cli = Cli::parse_from([
            "cellarbor",
            "run",
            file.path().to_str().expect("utf-8 path"),
        ]);

        let summary = run_cli(cli).expect("run must succeed");
        assert_eq!(summary.result.assignments().len(), 6);
        assert_eq!(summary.result.leaf_count(), 2);
        let leaf_a = summary
            .result
            .assignment_for("a0")
            .expect("cell a0 is assigned")
            .leaf();
        let leaf_b = summary
            .result
            .assignment_for("b0")
            .expect("cell b0 is assigned")
            .leaf();
        assert_ne!(leaf_a, leaf_b);
    }

    #[test]
    fn run_cli_surfaces_missing_files_as_io_errors() {
        let cli = Cli::parse_from(["cellarbor", "run", "/no/such/matrix.csv"]);
        let err = run_cli(cli).expect_err("missing files must fail");
        assert!(matches!(err, CliError::Io { .. }));
    }

    #[test]
    fn run_cli_rejects_invalid_configuration() {
        let file = write_two_block_csv();
        let cli = Cli::parse_from([
            "cellarbor",
            "run",
            file.path().to_str().expect("utf-8 path"),
            "--min-leaf-size",
            "0",
        ]);
        let err = run_cli(cli).expect_err("zero min leaf size must fail");
        assert!(matches!(
            err,
            CliError::Core(CellarborError::InvalidMinLeafSize { got: 0 })
        ));
    }

    #[test]
    fn render_summary_lists_edges_and_assignments() {
        let file = write_two_block_csv();
        let cli = Cli::parse_from([
            "cellarbor",
            "run",
            file.path().to_str().expect("utf-8 path"),
            "--name",
            "demo",
        ]);
        let summary = run_cli(cli).expect("run must succeed");

        let mut buffer = Cursor::new(Vec::new());
        render_summary(&summary, &mut buffer).expect("rendering must succeed");
        let rendered = String::from_utf8(buffer.into_inner()).expect("output is UTF-8");

        assert!(rendered.starts_with("source: demo\n"));
        assert!(rendered.contains("cells: 6\n"));
        assert!(rendered.contains("leaves: 2\n"));
        assert!(rendered.contains("0 -> 1\n"));
        assert!(rendered.contains("0 -> 2\n"));
        assert!(rendered.contains("a0\t1\t0/1\n"));
        assert!(rendered.contains("b0\t2\t0/2\n"));
    }
}
