//! Candidate index construction from projection scores.
//!
//! From the n×D projection score matrix two integer index matrices are
//! derived:
//!
//! - `A` (n×2k): per point, the k most-positive then the k most-negative
//!   projection directions, as indices into the 2D *signed* direction set
//!   (the negative half lives at `D + p`).
//! - `B` (2D×m): per signed direction, the m dataset points most aligned
//!   with it (row `p` sorts projections descending, row `D + p` ascending).
//!
//! Composing A then B yields, per point, a bounded candidate-neighbour set
//! of at most 2km entries (duplicates permitted, never deduplicated).
//!
//! All selections break ties by smaller original index so results are
//! reproducible across runs and thread counts.

use log::{debug, info};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{GsError, Result};

/// Flat row-major integer matrix with bounds-checked access.
#[derive(Debug, Clone)]
pub struct IndexMatrix {
    data: Vec<usize>,
    rows: usize,
    cols: usize,
}

impl IndexMatrix {
    pub fn from_rows(rows: Vec<Vec<usize>>, cols: usize) -> Self {
        let nrows = rows.len();
        let mut data = Vec::with_capacity(nrows * cols);
        for row in &rows {
            debug_assert_eq!(row.len(), cols, "ragged index matrix row");
            data.extend_from_slice(row);
        }
        Self { data, rows: nrows, cols }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.data.iter().copied()
    }
}

/// Resolve a flattened candidate-slot index back to (A column, B column).
///
/// Slot `j` of the 2km candidate slots of a point maps to direction slot
/// `j / m` in its A row and candidate slot `j % m` in the corresponding
/// B row. This is the canonical composition order for the whole pipeline;
/// the distance buffer, degree counts and adjacency assembly all follow it.
#[inline]
pub fn resolve_slot(slot: usize, m: usize) -> (usize, usize) {
    (slot / m, slot % m)
}

/// Indices of the k largest scores, descending, ties by smaller index.
fn top_k_indices_desc(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort keeps smaller indices first on equal scores.
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(k);
    order
}

/// Indices of the k smallest scores, ascending, ties by smaller index.
fn top_k_indices_asc(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(k);
    order
}

/// Build the A (n×2k) and B (2D×m) index matrices from projection scores.
///
/// Fails with `InvalidParameter` when there are not enough directions
/// (`k > D`) or points (`m > n`) to select from.
pub fn construct_ab_matrices(
    projections: &DenseMatrix<f64>,
    k: usize,
    m: usize,
) -> Result<(IndexMatrix, IndexMatrix)> {
    let (n, n_directions) = projections.shape();

    if k > n_directions {
        return Err(GsError::InvalidParameter(format!(
            "k ({}) exceeds number of projection directions D ({})",
            k, n_directions
        )));
    }
    if m > n {
        return Err(GsError::InvalidParameter(format!(
            "m ({}) exceeds dataset size n ({})",
            m, n
        )));
    }

    info!(
        "Constructing A/B index matrices: n={}, D={}, k={}, m={}",
        n, n_directions, k, m
    );

    // A: per-point closest (largest score) and furthest (smallest score)
    // signed directions. Row layout: k closest descending, then k furthest
    // ascending with the negative half mapped to D + p.
    let a_rows: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let scores: Vec<f64> =
                (0..n_directions).map(|p| *projections.get((i, p))).collect();

            let mut row = Vec::with_capacity(2 * k);
            row.extend(top_k_indices_desc(&scores, k));
            row.extend(
                top_k_indices_asc(&scores, k)
                    .into_iter()
                    .map(|p| n_directions + p),
            );
            row
        })
        .collect();

    // B: per signed direction, the m most aligned dataset points. Row p
    // sorts the column descending; row D + p sorts it ascending (points
    // most aligned with the negated direction).
    let b_halves: Vec<(Vec<usize>, Vec<usize>)> = (0..n_directions)
        .into_par_iter()
        .map(|p| {
            let column: Vec<f64> = (0..n).map(|i| *projections.get((i, p))).collect();
            (top_k_indices_desc(&column, m), top_k_indices_asc(&column, m))
        })
        .collect();

    let mut b_rows: Vec<Vec<usize>> = Vec::with_capacity(2 * n_directions);
    for (closest, _) in &b_halves {
        b_rows.push(closest.clone());
    }
    for (_, furthest) in b_halves {
        b_rows.push(furthest);
    }

    let a = IndexMatrix::from_rows(a_rows, 2 * k);
    let b = IndexMatrix::from_rows(b_rows, m);

    debug!(
        "Index matrices built: A is {:?}, B is {:?}",
        a.shape(),
        b.shape()
    );

    Ok((a, b))
}
