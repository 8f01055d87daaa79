mod test_candidates;
mod test_distances;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Two visually separated triples in 2D, interleaved so cluster ids are not
/// trivially position-dependent.
pub fn two_triples() -> Vec<Vec<f64>> {
    let mut rows = Vec::new();
    for i in 0..3 {
        rows.push(vec![10.0 + 0.1 * i as f64, 10.0]);
        rows.push(vec![-10.0, -10.0 - 0.1 * i as f64]);
    }
    rows
}

/// Gaussian blobs around the given centres, `per_blob` points each,
/// deterministic for a fixed seed.
pub fn gaussian_blobs(
    centres: &[Vec<f64>],
    per_blob: usize,
    spread: f64,
    seed: u64,
) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(centres.len() * per_blob);
    for centre in centres {
        for _ in 0..per_blob {
            rows.push(
                centre
                    .iter()
                    .map(|&c| c + spread * rng.sample::<f64, _>(StandardNormal))
                    .collect(),
            );
        }
    }
    rows
}
