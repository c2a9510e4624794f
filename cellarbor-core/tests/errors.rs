//! Tests for configuration and input validation errors.

mod common;

use cellarbor_core::{
    CellarborBuilder, CellarborError, CellarborErrorCode, ExpressionMatrix, MatrixError,
    MatrixErrorCode,
};
use common::ids;
use rstest::rstest;

#[test]
fn builder_rejects_zero_min_leaf_size() {
    let err = CellarborBuilder::new()
        .with_min_leaf_size(0)
        .build()
        .expect_err("zero min_leaf_size is invalid");
    assert!(matches!(err, CellarborError::InvalidMinLeafSize { got: 0 }));
    assert_eq!(err.code(), CellarborErrorCode::InvalidMinLeafSize);
}

#[test]
fn builder_rejects_zero_iteration_budget() {
    let err = CellarborBuilder::new()
        .with_max_iterations(0)
        .build()
        .expect_err("zero max_iterations is invalid");
    assert!(matches!(err, CellarborError::InvalidMaxIterations { got: 0 }));
}

#[rstest]
#[case(0.0)]
#[case(-1e-6)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn builder_rejects_bad_tolerances(#[case] tolerance: f64) {
    let err = CellarborBuilder::new()
        .with_convergence_tolerance(tolerance)
        .build()
        .expect_err("tolerance must be finite and positive");
    assert!(matches!(err, CellarborError::InvalidTolerance { .. }));
    assert_eq!(err.code(), CellarborErrorCode::InvalidTolerance);
}

#[test]
fn builder_rejects_non_finite_quality_threshold() {
    let err = CellarborBuilder::new()
        .with_split_quality_threshold(f64::NAN)
        .build()
        .expect_err("NaN thresholds are invalid");
    assert!(matches!(err, CellarborError::InvalidQualityThreshold { .. }));
}

#[test]
fn builder_accepts_negative_quality_threshold() {
    // A negative gain threshold is a legitimate "split aggressively" policy.
    let cellarbor = CellarborBuilder::new()
        .with_split_quality_threshold(-0.5)
        .build()
        .expect("negative finite thresholds are valid");
    assert!((cellarbor.split_quality_threshold() + 0.5).abs() < f64::EPSILON);
}

#[test]
fn not_normalized_carries_a_stable_code() {
    let err = CellarborError::NotNormalized;
    assert_eq!(err.code(), CellarborErrorCode::NotNormalized);
    assert_eq!(err.code().as_str(), "CELLARBOR_NOT_NORMALIZED");
    assert_eq!(
        format!("{err}"),
        "expression matrix must be row-normalized before clustering"
    );
}

#[test]
fn matrix_errors_convert_into_core_errors() {
    let inner = MatrixError::EmptyRow { row: 3 };
    let err = CellarborError::from(inner.clone());
    assert!(matches!(
        err,
        CellarborError::Matrix { ref source } if *source == inner
    ));
    assert_eq!(err.code(), CellarborErrorCode::MatrixFailure);
    assert_eq!(err.matrix_code(), Some(MatrixErrorCode::EmptyRow));
    assert!(format!("{err}").contains("row 3"));
}

#[test]
fn matrix_error_display_names_the_defect() {
    let err = ExpressionMatrix::from_dense(ids("c", 1), ids("g", 2), &[vec![1.0, -2.5]])
        .expect_err("negative counts are invalid");
    assert_eq!(
        format!("{err}"),
        "row 0, column 1 holds negative value -2.5"
    );
    assert_eq!(err.code(), MatrixErrorCode::NegativeValue);
    assert_eq!(err.code().as_str(), "MATRIX_NEGATIVE_VALUE");
}

#[test]
fn validation_errors_surface_before_any_clustering() {
    let err = ExpressionMatrix::from_dense(vec![], vec![], &[]).expect_err("empty input");
    assert_eq!(err, MatrixError::NoCells);
    assert_eq!(err.code(), MatrixErrorCode::NoCells);
}
