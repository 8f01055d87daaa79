//! Candidate index builder tests: shapes, index ranges, selection
//! semantics and parameter validation.

use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::candidates::construct_ab_matrices;
use crate::error::GsError;
use crate::projections::perform_projections;
use crate::tests::gaussian_blobs;

fn scores_from(rows: &[Vec<f64>], n_directions: usize) -> DenseMatrix<f64> {
    perform_projections(rows, n_directions, 99).unwrap()
}

#[test]
fn test_ab_shapes() {
    let rows = gaussian_blobs(&[vec![0.0; 4]], 30, 1.0, 3);
    let scores = scores_from(&rows, 10);
    let (a, b) = construct_ab_matrices(&scores, 3, 5).unwrap();

    assert_eq!(a.shape(), (30, 6)); // n x 2k
    assert_eq!(b.shape(), (20, 5)); // 2D x m
}

#[test]
fn test_index_ranges() {
    let rows = gaussian_blobs(&[vec![1.0, -1.0, 0.5]], 25, 2.0, 5);
    let scores = scores_from(&rows, 8);
    let (a, b) = construct_ab_matrices(&scores, 4, 6).unwrap();

    // Every A entry indexes the 2D signed direction set.
    assert!(a.iter().all(|p| p < 16));
    // Every B entry indexes dataset rows.
    assert!(b.iter().all(|i| i < 25));
}

#[test]
fn test_a_selects_extreme_directions() {
    // Two points on opposite rays: their closest/furthest halves swap.
    let scores = DenseMatrix::from_2d_vec(&vec![
        vec![5.0, -3.0, 0.1],
        vec![-5.0, 3.0, -0.1],
    ])
    .unwrap();
    let (a, _) = construct_ab_matrices(&scores, 1, 1).unwrap();

    // Point 0: closest direction 0, furthest direction 1 (signed index D+1).
    assert_eq!(a.row(0), &[0, 3 + 1]);
    // Point 1: mirrored.
    assert_eq!(a.row(1), &[1, 3]);
}

#[test]
fn test_b_orders_points_per_signed_direction() {
    // Three points, one direction: scores 2.0, -1.0, 0.5.
    let scores =
        DenseMatrix::from_2d_vec(&vec![vec![2.0], vec![-1.0], vec![0.5]]).unwrap();
    let (_, b) = construct_ab_matrices(&scores, 1, 3).unwrap();

    // Row 0 (positive direction): descending score.
    assert_eq!(b.row(0), &[0, 2, 1]);
    // Row 1 (negated direction): ascending score.
    assert_eq!(b.row(1), &[1, 2, 0]);
}

#[test]
fn test_tie_break_by_smaller_index() {
    let scores = DenseMatrix::from_2d_vec(&vec![
        vec![1.0, 1.0, 1.0, 0.0],
        vec![0.0, 1.0, 1.0, 1.0],
    ])
    .unwrap();
    let (a, _) = construct_ab_matrices(&scores, 2, 1).unwrap();

    // Equal top scores resolve to the smaller direction index first.
    assert_eq!(&a.row(0)[..2], &[0, 1]);
    assert_eq!(&a.row(1)[..2], &[1, 2]);
}

#[test]
fn test_rejects_k_larger_than_directions() {
    let rows = gaussian_blobs(&[vec![0.0, 0.0]], 10, 1.0, 1);
    let scores = scores_from(&rows, 4);
    let err = construct_ab_matrices(&scores, 5, 3).unwrap_err();
    assert!(matches!(err, GsError::InvalidParameter(_)));
}

#[test]
fn test_rejects_m_larger_than_dataset() {
    let rows = gaussian_blobs(&[vec![0.0, 0.0]], 5, 1.0, 1);
    let scores = scores_from(&rows, 4);
    let err = construct_ab_matrices(&scores, 2, 6).unwrap_err();
    assert!(matches!(err, GsError::InvalidParameter(_)));
}
