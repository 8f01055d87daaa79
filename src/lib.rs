//! gsdbscan: sketch-based DBSCAN for very large point datasets.
//!
//! Instead of computing all pairwise distances (O(n²)), the pipeline builds
//! a small candidate-neighbour set per point via random-projection
//! sketching, computes exact distances only against those candidates, and
//! runs graph-based density clustering (G-DBSCAN) over the resulting sparse
//! neighbour graph:
//!
//! 1. [`projections`] — optional L2 normalisation and random projections.
//! 2. [`candidates`] — A/B index matrices whose composition yields, per
//!    point, a bounded candidate set of at most 2km neighbours.
//! 3. [`distances`] — exact L1/L2/Cosine distances to candidates only,
//!    batched under a memory budget.
//! 4. [`graph`] — degrees, exclusive-prefix-sum offsets and a flattened
//!    adjacency list assembled in parallel into disjoint reserved ranges.
//! 5. [`clustering`] — core/border/noise classification and connected
//!    components over core points.
//!
//! The output is approximate by design: accuracy depends on the sketch
//! parameters (D, k, m). With a fixed seed the whole pipeline is
//! deterministic.
//!
//! # Example
//!
//! ```
//! use gsdbscan::{GsDbscanBuilder, PointType};
//!
//! let mut rows = Vec::new();
//! for i in 0..3 {
//!     rows.push(vec![10.0 + 0.1 * i as f64, 10.0]);
//!     rows.push(vec![-10.0, -10.0 - 0.1 * i as f64]);
//! }
//!
//! let result = GsDbscanBuilder::new()
//!     .with_sketch(4, 2, 3)
//!     .with_density(1.0, 2)
//!     .with_normalisation(false)
//!     .build(rows)
//!     .unwrap();
//!
//! assert_eq!(result.n_clusters, 2);
//! assert!(result.type_labels.iter().all(|&t| t == PointType::Core));
//! ```

pub mod builder;
pub mod candidates;
pub mod clustering;
pub mod distances;
pub mod error;
pub mod graph;
pub mod projections;
pub mod timing;

#[cfg(test)]
mod tests;

pub use builder::{GsDbscanBuilder, GsParams, GsResult};
pub use clustering::{PointType, NOISE_LABEL};
pub use distances::DistanceMetric;
pub use error::{GsError, Result};
pub use graph::NeighbourGraph;
pub use timing::TimingReport;
