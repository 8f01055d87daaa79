//! Batched distance engine tests: batch-size invariance, self-masking and
//! metric semantics against hand-computed values.

use approx::assert_relative_eq;

use crate::candidates::{construct_ab_matrices, resolve_slot};
use crate::distances::{find_distances, DistanceMetric};
use crate::projections::perform_projections;
use crate::tests::gaussian_blobs;

fn small_setup(
    n_directions: usize,
    k: usize,
    m: usize,
) -> (Vec<Vec<f64>>, crate::candidates::IndexMatrix, crate::candidates::IndexMatrix) {
    let rows = gaussian_blobs(
        &[vec![0.0, 0.0, 0.0], vec![8.0, 8.0, 8.0]],
        12,
        1.0,
        21,
    );
    let scores = perform_projections(&rows, n_directions, 21).unwrap();
    let (a, b) = construct_ab_matrices(&scores, k, m).unwrap();
    (rows, a, b)
}

#[test]
fn test_batch_size_does_not_change_distances() {
    let (rows, a, b) = small_setup(6, 2, 4);

    let full = find_distances(&rows, &a, &b, DistanceMetric::L2, 1.0, Some(rows.len())).unwrap();
    for batch in [1, 3, 5, 7] {
        let batched =
            find_distances(&rows, &a, &b, DistanceMetric::L2, 1.0, Some(batch)).unwrap();
        // Bit-for-bit identical: batching is purely a memory device.
        assert_eq!(full, batched, "batch size {} changed results", batch);
    }
}

#[test]
fn test_distances_match_direct_computation() {
    let (rows, a, b) = small_setup(5, 2, 3);
    let slots = 2 * 2 * 3;
    let (_, m) = b.shape();

    let distances =
        find_distances(&rows, &a, &b, DistanceMetric::L2, 1.0, None).unwrap();

    for i in 0..rows.len() {
        for slot in 0..slots {
            let (a_col, b_col) = resolve_slot(slot, m);
            let candidate = b.get(a.get(i, a_col), b_col);
            let got = distances[i * slots + slot];
            if candidate == i {
                assert!(got.is_infinite(), "self slot not masked");
            } else {
                let expected = DistanceMetric::L2.eval(&rows[i], &rows[candidate]);
                assert_relative_eq!(got, expected);
            }
        }
    }
}

#[test]
fn test_distances_are_non_negative() {
    let (rows, a, b) = small_setup(6, 3, 4);
    for metric in [DistanceMetric::L1, DistanceMetric::L2, DistanceMetric::Cosine] {
        let distances = find_distances(&rows, &a, &b, metric, 1.0, None).unwrap();
        assert!(distances.iter().all(|&d| d >= 0.0), "{} produced negatives", metric);
    }
}

#[test]
fn test_cosine_is_one_minus_similarity() {
    // Orthogonal rows: distance 1. Opposite rows: distance 2.
    let x = vec![1.0, 0.0];
    let y = vec![0.0, 3.0];
    let z = vec![-2.0, 0.0];
    assert_relative_eq!(DistanceMetric::Cosine.eval(&x, &y), 1.0);
    assert_relative_eq!(DistanceMetric::Cosine.eval(&x, &z), 2.0);
}
