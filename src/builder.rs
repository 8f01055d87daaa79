//! Pipeline entry point and configuration.
//!
//! `GsDbscanBuilder` collects the sketch and density parameters, validates
//! them before any heavy work, and drives the full pipeline:
//! projections → A/B index matrices → batched distances (with degree and
//! offset folding per batch) → adjacency assembly → cluster formation.
//!
//! Batching is a memory-management device only: results are identical for
//! any batch size. The running offset total is the one piece of cross-batch
//! state and is threaded sequentially through the loop.

use std::time::Instant;

use log::{debug, info};

use crate::candidates::construct_ab_matrices;
use crate::clustering::{form_clusters, PointType};
use crate::distances::{
    allocate_distance_buffer, find_distance_batch_size, find_distances_in_range,
    DistanceMetric,
};
use crate::error::{GsError, Result};
use crate::graph::{assemble_adjacency, extend_offsets, row_degrees, NeighbourGraph};
use crate::projections::{normalise_dataset, perform_projections, PROJECTION_SEED};
use crate::timing::TimingReport;

/// Full parameter set for one pipeline run.
#[derive(Debug, Clone)]
pub struct GsParams {
    /// Number of random projection directions (D).
    pub n_directions: usize,
    /// Minimum neighbours within eps for a core point.
    pub min_pts: usize,
    /// Closest/furthest projection directions kept per point.
    pub k: usize,
    /// Closest/furthest dataset points kept per signed direction.
    pub m: usize,
    /// Density threshold on exact distances.
    pub eps: f64,
    /// Batch memory budget in GiB for the distance engine.
    pub alpha: f64,
    /// Explicit batch size; overrides the alpha-derived budget when set.
    pub batch_size: Option<usize>,
    pub metric: DistanceMetric,
    /// Minimum rows per parallel chunk in the adjacency assembler.
    pub cluster_block_size: usize,
    /// L2-normalise rows in place before projecting.
    pub normalise: bool,
    /// Seed for the projection directions.
    pub seed: u64,
}

// Approximate equality for the float fields, exact for the rest.
impl PartialEq for GsParams {
    fn eq(&self, other: &Self) -> bool {
        self.n_directions == other.n_directions
            && self.min_pts == other.min_pts
            && self.k == other.k
            && self.m == other.m
            && approx::relative_eq!(self.eps, other.eps)
            && approx::relative_eq!(self.alpha, other.alpha)
            && self.batch_size == other.batch_size
            && self.metric == other.metric
            && self.cluster_block_size == other.cluster_block_size
            && self.normalise == other.normalise
            && self.seed == other.seed
    }
}

impl Default for GsParams {
    fn default() -> Self {
        Self {
            n_directions: 1024,
            min_pts: 50,
            k: 5,
            m: 50,
            eps: 0.11,
            alpha: 1.2,
            batch_size: None,
            metric: DistanceMetric::L2,
            cluster_block_size: 256,
            normalise: true,
            seed: PROJECTION_SEED,
        }
    }
}

impl GsParams {
    /// Fail fast on malformed configuration, before any projection or
    /// distance work begins. Dataset-dependent constraints (m ≤ n,
    /// consistent dimensions) are checked at build time.
    pub fn validate(&self) -> Result<()> {
        if self.n_directions == 0 {
            return Err(GsError::InvalidParameter("D must be positive".into()));
        }
        if self.k == 0 || self.k > self.n_directions {
            return Err(GsError::InvalidParameter(format!(
                "k must satisfy 0 < k <= D (k={}, D={})",
                self.k, self.n_directions
            )));
        }
        if self.min_pts == 0 || self.m < self.min_pts {
            return Err(GsError::InvalidParameter(format!(
                "min_pts must satisfy 0 < min_pts <= m (min_pts={}, m={})",
                self.min_pts, self.m
            )));
        }
        if !(self.eps > 0.0) {
            return Err(GsError::InvalidParameter(format!(
                "eps must be positive (eps={})",
                self.eps
            )));
        }
        if !(self.alpha > 0.0) {
            return Err(GsError::InvalidParameter(format!(
                "alpha must be positive (alpha={})",
                self.alpha
            )));
        }
        if self.batch_size == Some(0) {
            return Err(GsError::InvalidParameter(
                "explicit batch size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Output of one pipeline run. The label arrays are owned by the caller;
/// every intermediate buffer is released before this is returned.
#[derive(Debug, Clone)]
pub struct GsResult {
    /// Cluster id per point, `NOISE_LABEL` for noise.
    pub cluster_labels: Vec<i64>,
    /// Core/Border/Noise per point.
    pub type_labels: Vec<PointType>,
    pub n_clusters: usize,
    /// Stage durations in pipeline order.
    pub timings: TimingReport,
}

/// Builder for a sketch-based DBSCAN run.
pub struct GsDbscanBuilder {
    params: GsParams,
}

impl Default for GsDbscanBuilder {
    fn default() -> Self {
        debug!("Creating GsDbscanBuilder with default parameters");
        Self { params: GsParams::default() }
    }
}

impl GsDbscanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sketch parameters: D projection directions, k directions per point,
    /// m dataset points per signed direction.
    pub fn with_sketch(mut self, n_directions: usize, k: usize, m: usize) -> Self {
        self.params.n_directions = n_directions;
        self.params.k = k;
        self.params.m = m;
        self
    }

    /// Density parameters: eps distance threshold and min_pts core cutoff.
    pub fn with_density(mut self, eps: f64, min_pts: usize) -> Self {
        self.params.eps = eps;
        self.params.min_pts = min_pts;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.params.metric = metric;
        self
    }

    /// Batch memory budget in GiB for the distance engine.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.params.alpha = alpha;
        self
    }

    /// Fix the batch size explicitly instead of deriving it from alpha.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.params.batch_size = Some(batch_size);
        self
    }

    pub fn with_normalisation(mut self, normalise: bool) -> Self {
        self.params.normalise = normalise;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn with_cluster_block_size(mut self, block_size: usize) -> Self {
        self.params.cluster_block_size = block_size;
        self
    }

    pub fn params(&self) -> &GsParams {
        &self.params
    }

    /// Run the full pipeline on `rows` (n points of dimension d).
    ///
    /// The dataset is consumed; when normalisation is enabled the rows are
    /// scaled in place before projecting.
    pub fn build(self, mut rows: Vec<Vec<f64>>) -> Result<GsResult> {
        self.params.validate()?;
        let params = self.params;

        let n = rows.len();
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        if n == 0 || d == 0 {
            return Err(GsError::InvalidParameter(format!(
                "dataset must be non-empty with positive dimension (n={}, d={})",
                n, d
            )));
        }
        if rows.iter().any(|r| r.len() != d) {
            return Err(GsError::InvalidParameter(
                "dataset rows have inconsistent dimensions".into(),
            ));
        }
        if params.m > n {
            return Err(GsError::InvalidParameter(format!(
                "m ({}) exceeds dataset size n ({})",
                params.m, n
            )));
        }

        info!(
            "GS-DBSCAN over {} points, d={}: D={}, k={}, m={}, eps={}, min_pts={}, metric={}",
            n,
            d,
            params.n_directions,
            params.k,
            params.m,
            params.eps,
            params.min_pts,
            params.metric
        );

        let mut timings = TimingReport::new();
        let overall = Instant::now();

        // Projections
        let projections = timings.span("projections", || {
            if params.normalise {
                normalise_dataset(&mut rows);
            }
            perform_projections(&rows, params.n_directions, params.seed)
        })?;

        // Candidate index matrices
        let (a, b) = timings.span("construct_ab_matrices", || {
            construct_ab_matrices(&projections, params.k, params.m)
        })?;
        drop(projections);

        // Batched distances, with degrees and offsets folded per batch.
        // The running offset is the only cross-batch state and advances
        // strictly in batch order.
        let slots = 2 * params.k * params.m;
        let batch = params
            .batch_size
            .unwrap_or_else(|| find_distance_batch_size(params.alpha, n, d, params.k, params.m));
        debug!("Distance loop: {} slots per point, batches of {} rows", slots, batch);

        let start_distances = Instant::now();
        let mut distances = allocate_distance_buffer(n, slots)?;
        let mut degrees: Vec<usize> = Vec::with_capacity(n);
        let mut offsets: Vec<usize> = Vec::with_capacity(n);
        let mut running_offset = 0usize;

        let mut batch_start = 0;
        while batch_start < n {
            let batch_end = (batch_start + batch).min(n);
            let out = &mut distances[batch_start * slots..batch_end * slots];
            find_distances_in_range(
                &rows,
                &a,
                &b,
                params.metric,
                batch_start,
                batch_end,
                out,
            );

            let batch_degrees = row_degrees(out, slots, params.eps);
            extend_offsets(&mut offsets, &batch_degrees, &mut running_offset);
            degrees.extend(batch_degrees);

            batch_start = batch_end;
        }
        timings.record("distances", start_distances.elapsed());

        // Adjacency assembly into pre-reserved disjoint ranges, then
        // cluster formation.
        let start_clustering = Instant::now();
        let total = running_offset;
        let mut adjacency = Vec::new();
        adjacency.try_reserve_exact(total).map_err(|e| {
            GsError::ResourceExhausted(format!(
                "failed to allocate adjacency list of {} entries: {}",
                total, e
            ))
        })?;
        adjacency.resize(total, 0usize);

        {
            let mut slices: Vec<&mut [usize]> = Vec::with_capacity(n);
            let mut rest = adjacency.as_mut_slice();
            for &deg in &degrees {
                let (head, tail) = rest.split_at_mut(deg);
                slices.push(head);
                rest = tail;
            }

            // Each batch owns an exclusive, contiguous run of slices.
            let mut batch_start = 0;
            while batch_start < n {
                let batch_end = (batch_start + batch).min(n);
                assemble_adjacency(
                    &distances[batch_start * slots..batch_end * slots],
                    &a,
                    &b,
                    params.eps,
                    batch_start,
                    batch_end,
                    &mut slices[batch_start..batch_end],
                    params.cluster_block_size,
                )?;
                batch_start = batch_end;
            }
        }
        drop(distances);

        let graph = NeighbourGraph::from_parts(degrees, offsets, adjacency, params.eps)?;
        debug!("{}", graph);

        let (cluster_labels, type_labels, n_clusters) = form_clusters(&graph, params.min_pts);
        timings.record("clustering", start_clustering.elapsed());

        timings.record("overall", overall.elapsed());
        info!("Pipeline finished: {} clusters", n_clusters);

        Ok(GsResult { cluster_labels, type_labels, n_clusters, timings })
    }
}
