//! Batched exact-distance evaluation over candidate sets.
//!
//! For each point the engine gathers its 2km candidate rows (A then B
//! composition) and computes the chosen metric against each of them. The
//! dataset is processed in row-batches sized to a memory budget; batching is
//! purely a memory-management device, so the resulting distance buffer is
//! bit-for-bit identical regardless of batch size (each slot is an
//! independent computation, there is no cross-slot reduction).
//!
//! A slot whose candidate resolves to the point itself is masked to `+inf`
//! so self-distances never count towards degrees or adjacency.

use std::str::FromStr;

use log::{debug, info};
use rayon::prelude::*;

use crate::candidates::{resolve_slot, IndexMatrix};
use crate::error::{GsError, Result};

/// Distance metric between a point and its candidate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    L1,
    L2,
    /// 1 − cosine similarity, in [0, 2].
    Cosine,
}

impl FromStr for DistanceMetric {
    type Err = GsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L1" => Ok(DistanceMetric::L1),
            "L2" => Ok(DistanceMetric::L2),
            "COSINE" => Ok(DistanceMetric::Cosine),
            other => Err(GsError::InvalidParameter(format!(
                "unsupported distance metric '{}' (expected L1, L2 or COSINE)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::L1 => write!(f, "L1"),
            DistanceMetric::L2 => write!(f, "L2"),
            DistanceMetric::Cosine => write!(f, "COSINE"),
        }
    }
}

#[inline]
fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[inline]
fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[inline]
fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    let denom = na * nb;
    let sim = if denom > 1e-15 {
        (dot / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    1.0 - sim
}

impl DistanceMetric {
    #[inline]
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::L1 => l1_distance(a, b),
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

/// Rows per batch so that the per-batch working set (2km gathered candidate
/// rows of dimension d, plus the distance rows) stays within `alpha` GiB.
pub fn find_distance_batch_size(alpha: f64, n: usize, d: usize, k: usize, m: usize) -> usize {
    let slots = 2 * k * m;
    let bytes_per_row = (slots * d + slots) * std::mem::size_of::<f64>();
    let budget = (alpha * (1u64 << 30) as f64) as usize;
    let batch = (budget / bytes_per_row.max(1)).clamp(1, n.max(1));
    debug!(
        "Distance batch size: {} rows ({} bytes/row, budget {} bytes)",
        batch, bytes_per_row, budget
    );
    batch
}

/// Allocate the flat n×2km distance buffer, surfacing allocation failure as
/// `ResourceExhausted` instead of aborting.
pub fn allocate_distance_buffer(n: usize, slots: usize) -> Result<Vec<f64>> {
    let len = n * slots;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        GsError::ResourceExhausted(format!(
            "failed to allocate distance buffer of {} entries: {}",
            len, e
        ))
    })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// Compute distances for rows `[start, end)` into `out`, which must cover
/// exactly that range (`(end - start) * 2km` entries, row-major in slot
/// composition order).
pub fn find_distances_in_range(
    rows: &[Vec<f64>],
    a: &IndexMatrix,
    b: &IndexMatrix,
    metric: DistanceMetric,
    start: usize,
    end: usize,
    out: &mut [f64],
) {
    let (_, two_k) = a.shape();
    let (_, m) = b.shape();
    let slots = two_k * m;
    debug_assert_eq!(out.len(), (end - start) * slots);

    out.par_chunks_mut(slots).enumerate().for_each(|(off, row_out)| {
        let i = start + off;
        let point = &rows[i];
        for (slot, dist) in row_out.iter_mut().enumerate() {
            let (a_col, b_col) = resolve_slot(slot, m);
            let candidate = b.get(a.get(i, a_col), b_col);
            *dist = if candidate == i {
                f64::INFINITY
            } else {
                metric.eval(point, &rows[candidate])
            };
        }
    });
}

/// Convenience driver: full n×2km distance buffer computed batch by batch.
///
/// `batch_size` overrides the alpha-derived budget when `Some`; results are
/// identical either way.
pub fn find_distances(
    rows: &[Vec<f64>],
    a: &IndexMatrix,
    b: &IndexMatrix,
    metric: DistanceMetric,
    alpha: f64,
    batch_size: Option<usize>,
) -> Result<Vec<f64>> {
    let n = rows.len();
    let d = rows.first().map(|r| r.len()).unwrap_or(0);
    let (_, two_k) = a.shape();
    let (_, m) = b.shape();
    let slots = two_k * m;

    let batch = batch_size
        .unwrap_or_else(|| find_distance_batch_size(alpha, n, d, two_k / 2, m))
        .max(1);

    info!(
        "Computing {} distances ({} metric) in batches of {} rows",
        n * slots,
        metric,
        batch
    );

    let mut distances = allocate_distance_buffer(n, slots)?;
    let mut start = 0;
    while start < n {
        let end = (start + batch).min(n);
        find_distances_in_range(
            rows,
            a,
            b,
            metric,
            start,
            end,
            &mut distances[start * slots..end * slots],
        );
        start = end;
    }

    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_metric_parsing() {
        assert_eq!(DistanceMetric::from_str("l2").unwrap(), DistanceMetric::L2);
        assert_eq!(
            DistanceMetric::from_str("COSINE").unwrap(),
            DistanceMetric::Cosine
        );
        assert!(DistanceMetric::from_str("hamming").is_err());
    }

    #[test]
    fn test_metric_values() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_relative_eq!(DistanceMetric::L1.eval(&a, &b), 2.0);
        assert_relative_eq!(DistanceMetric::L2.eval(&a, &b), 2.0_f64.sqrt());
        assert_relative_eq!(DistanceMetric::Cosine.eval(&a, &b), 1.0);
        assert_relative_eq!(DistanceMetric::Cosine.eval(&a, &a), 0.0);
    }

    #[test]
    fn test_batch_size_respects_budget() {
        // Tiny budget forces single-row batches.
        assert_eq!(find_distance_batch_size(1e-9, 100, 64, 4, 8), 1);
        // Generous budget caps at n.
        assert_eq!(find_distance_batch_size(8.0, 100, 4, 2, 2), 100);
    }
}
