//! Dataset normalisation and random projections.
//!
//! The projection engine draws D standard-normal direction vectors with a
//! seeded RNG and projects the dataset onto them with a dense matrix
//! product, producing the n×D score matrix the candidate index builder
//! consumes. The direction matrix itself is discarded afterwards.
//!
//! **DETERMINISTIC**: projections use a fixed seed (overridable through the
//! builder) so repeated runs on identical input yield identical clusters.

use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{GsError, Result};

/// Default seed for the projection directions.
pub const PROJECTION_SEED: u64 = 128;

/// Scale each row to unit L2 norm, in place. Rows with a vanishing norm are
/// left untouched.
pub fn normalise_dataset(rows: &mut [Vec<f64>]) {
    info!("Normalising {} rows to unit L2 norm", rows.len());
    rows.par_iter_mut().for_each(|row| {
        let norm = row.iter().map(|&x| x * x).sum::<f64>().sqrt();
        if norm > 1e-12 {
            for x in row.iter_mut() {
                *x /= norm;
            }
        }
    });
}

/// Project the dataset onto `n_directions` random standard-normal
/// directions, returning the n×D projection score matrix.
pub fn perform_projections(
    rows: &[Vec<f64>],
    n_directions: usize,
    seed: u64,
) -> Result<DenseMatrix<f64>> {
    let n = rows.len();
    let d = rows.first().map(|r| r.len()).unwrap_or(0);

    if n == 0 || d == 0 {
        return Err(GsError::InvalidParameter(format!(
            "dataset must be non-empty with positive dimension (n={}, d={})",
            n, d
        )));
    }
    if n_directions == 0 {
        return Err(GsError::InvalidParameter(
            "number of projection directions D must be positive".into(),
        ));
    }

    info!(
        "Projecting {} points of dimension {} onto {} random directions (seed={})",
        n, d, n_directions, seed
    );

    let x = DenseMatrix::from_iterator(rows.iter().flatten().copied(), n, d, 0);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let directions = DenseMatrix::from_iterator(
        (0..d * n_directions).map(|_| rng.sample::<f64, _>(StandardNormal)),
        d,
        n_directions,
        0,
    );
    trace!("Drew {}x{} direction matrix", d, n_directions);

    let scores = x.matmul(&directions);
    debug!("Projection score matrix computed: {:?}", scores.shape());

    Ok(scores)
}
