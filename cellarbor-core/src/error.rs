//! Error types for the cellarbor core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::fmt;

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced while validating or constructing an
/// [`crate::ExpressionMatrix`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MatrixError {
    /// The matrix contained no cell rows.
    #[error("expression matrix contains no cells")]
    NoCells,
    /// The matrix contained no gene columns.
    #[error("expression matrix contains no genes")]
    NoGenes,
    /// Number of cell identifiers did not match the number of rows.
    #[error("{ids} cell identifiers were given for {rows} rows")]
    CellIdMismatch {
        /// Number of cell identifiers supplied by the caller.
        ids: usize,
        /// Number of expression rows supplied by the caller.
        rows: usize,
    },
    /// A dense row had a different width than the gene identifier list.
    #[error("row {row} has {got} values but {expected} genes are declared")]
    RowWidthMismatch {
        /// Offending row index.
        row: usize,
        /// Expected number of values per row.
        expected: usize,
        /// Number of values actually present.
        got: usize,
    },
    /// The compressed sparse row structure was malformed.
    #[error("invalid sparse row structure: {reason}")]
    RowPointers {
        /// Description of the structural defect.
        reason: &'static str,
    },
    /// An expression value was NaN or infinite.
    #[error("row {row}, column {column} holds a non-finite value")]
    NonFiniteValue {
        /// Row index of the offending entry.
        row: usize,
        /// Column index of the offending entry.
        column: usize,
    },
    /// An expression value was negative; counts must be non-negative.
    #[error("row {row}, column {column} holds negative value {value}")]
    NegativeValue {
        /// Row index of the offending entry.
        row: usize,
        /// Column index of the offending entry.
        column: usize,
        /// The negative value observed.
        value: f64,
    },
    /// A cell row carried no expression at all and can never be normalized.
    #[error("row {row} has no positive expression values")]
    EmptyRow {
        /// Index of the all-zero row.
        row: usize,
    },
    /// A sparse entry referenced a gene column outside the matrix.
    #[error("row {row} references column {column}, but only {genes} genes exist")]
    ColumnOutOfBounds {
        /// Row containing the offending entry.
        row: usize,
        /// Out-of-range column index.
        column: usize,
        /// Number of gene columns in the matrix.
        genes: usize,
    },
    /// Sparse column indices within a row must be strictly increasing.
    #[error("row {row} has unsorted or duplicate column indices")]
    UnsortedColumns {
        /// Row with the ordering defect.
        row: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`MatrixError`] variants.
    enum MatrixErrorCode for MatrixError {
        /// The matrix contained no cell rows.
        NoCells => NoCells => "MATRIX_NO_CELLS",
        /// The matrix contained no gene columns.
        NoGenes => NoGenes => "MATRIX_NO_GENES",
        /// Number of cell identifiers did not match the number of rows.
        CellIdMismatch => CellIdMismatch { .. } => "MATRIX_CELL_ID_MISMATCH",
        /// A dense row had a different width than the gene identifier list.
        RowWidthMismatch => RowWidthMismatch { .. } => "MATRIX_ROW_WIDTH_MISMATCH",
        /// The compressed sparse row structure was malformed.
        RowPointers => RowPointers { .. } => "MATRIX_ROW_POINTERS",
        /// An expression value was NaN or infinite.
        NonFiniteValue => NonFiniteValue { .. } => "MATRIX_NON_FINITE_VALUE",
        /// An expression value was negative.
        NegativeValue => NegativeValue { .. } => "MATRIX_NEGATIVE_VALUE",
        /// A cell row carried no expression at all.
        EmptyRow => EmptyRow { .. } => "MATRIX_EMPTY_ROW",
        /// A sparse entry referenced a gene column outside the matrix.
        ColumnOutOfBounds => ColumnOutOfBounds { .. } => "MATRIX_COLUMN_OUT_OF_BOUNDS",
        /// Sparse column indices within a row must be strictly increasing.
        UnsortedColumns => UnsortedColumns { .. } => "MATRIX_UNSORTED_COLUMNS",
    }
}

/// Error type produced when configuring or running [`crate::Cellarbor`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CellarborError {
    /// Minimum leaf size must be greater than zero.
    #[error("min_leaf_size must be at least 1 (got {got})")]
    InvalidMinLeafSize {
        /// The invalid minimum leaf size supplied by the caller.
        got: usize,
    },
    /// The eigensolver iteration budget must be greater than zero.
    #[error("max_iterations must be at least 1 (got {got})")]
    InvalidMaxIterations {
        /// The invalid iteration budget supplied by the caller.
        got: usize,
    },
    /// The convergence tolerance must be a finite positive number.
    #[error("convergence_tolerance must be finite and positive (got {got})")]
    InvalidTolerance {
        /// The invalid tolerance supplied by the caller.
        got: f64,
    },
    /// The split quality threshold must be a finite number.
    #[error("split_quality_threshold must be finite (got {got})")]
    InvalidQualityThreshold {
        /// The invalid threshold supplied by the caller.
        got: f64,
    },
    /// Clustering requires a row-normalized matrix.
    #[error("expression matrix must be row-normalized before clustering")]
    NotNormalized,
    /// The input matrix failed validation.
    #[error("expression matrix is invalid: {source}")]
    Matrix {
        /// Underlying matrix validation failure.
        #[from]
        source: MatrixError,
    },
}

define_error_codes! {
    /// Stable codes describing [`CellarborError`] variants.
    enum CellarborErrorCode for CellarborError {
        /// Minimum leaf size must be greater than zero.
        InvalidMinLeafSize => InvalidMinLeafSize { .. } => "CELLARBOR_INVALID_MIN_LEAF_SIZE",
        /// The eigensolver iteration budget must be greater than zero.
        InvalidMaxIterations => InvalidMaxIterations { .. } => "CELLARBOR_INVALID_MAX_ITERATIONS",
        /// The convergence tolerance must be a finite positive number.
        InvalidTolerance => InvalidTolerance { .. } => "CELLARBOR_INVALID_TOLERANCE",
        /// The split quality threshold must be a finite number.
        InvalidQualityThreshold => InvalidQualityThreshold { .. } => "CELLARBOR_INVALID_QUALITY_THRESHOLD",
        /// Clustering requires a row-normalized matrix.
        NotNormalized => NotNormalized => "CELLARBOR_NOT_NORMALIZED",
        /// The input matrix failed validation.
        MatrixFailure => Matrix { .. } => "CELLARBOR_MATRIX_FAILURE",
    }
}

impl CellarborError {
    /// Retrieve the inner [`MatrixErrorCode`] when the error originated in matrix validation.
    #[must_use]
    pub const fn matrix_code(&self) -> Option<MatrixErrorCode> {
        match self {
            Self::Matrix { source } => Some(source.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, CellarborError>;
