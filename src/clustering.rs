//! Density-based cluster formation over the approximate neighbour graph.
//!
//! Points with at least `min_pts` neighbours are core; connected components
//! over core points (union-find) become clusters; non-core points adjacent
//! to a core point become border points of that core point's cluster; the
//! rest stay noise.
//!
//! The stored graph may be asymmetric (the sketch does not guarantee that
//! i listing j implies j listing i). Core-core connectivity treats an edge
//! in either direction as sufficient: scanning every core point's list and
//! unioning with its core neighbours covers both orientations without
//! materialising reverse edges.
//!
//! **DETERMINISTIC**: cluster ids are assigned in increasing order of the
//! smallest point index in each component, and a border point takes the
//! first core neighbour in its adjacency-list order.

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::graph::NeighbourGraph;

/// Cluster label for points belonging to no cluster.
pub const NOISE_LABEL: i64 = -1;

/// Density classification of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointType {
    Core,
    Border,
    Noise,
}

/// Union-find over point indices, path-halving with union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), size: vec![1; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Classify points and propagate connectivity, producing per-point cluster
/// labels (`NOISE_LABEL` sentinel for noise) and type labels.
///
/// Returns `(cluster_labels, type_labels, n_clusters)`.
pub fn form_clusters(
    graph: &NeighbourGraph,
    min_pts: usize,
) -> (Vec<i64>, Vec<PointType>, usize) {
    let n = graph.nnodes();
    info!("Forming clusters over {} points (min_pts={})", n, min_pts);

    let is_core: Vec<bool> = graph
        .degrees
        .par_iter()
        .map(|&deg| deg >= min_pts)
        .collect();
    let core_count = is_core.iter().filter(|&&c| c).count();
    debug!("{} of {} points are core", core_count, n);

    // Core-core connectivity. Scanning every core list covers edges in
    // either direction, which is the symmetric-or reading of the sketch.
    let mut sets = DisjointSets::new(n);
    for i in 0..n {
        if !is_core[i] {
            continue;
        }
        for &j in graph.neighbours(i) {
            if is_core[j] {
                sets.union(i, j);
            }
        }
    }

    // Cluster ids in increasing order of the smallest member index.
    let mut cluster_labels = vec![NOISE_LABEL; n];
    let mut type_labels = vec![PointType::Noise; n];
    let mut root_to_id = std::collections::HashMap::new();
    let mut next_id: i64 = 0;

    for i in 0..n {
        if !is_core[i] {
            continue;
        }
        let root = sets.find(i);
        let id = *root_to_id.entry(root).or_insert_with(|| {
            let id = next_id;
            next_id += 1;
            id
        });
        cluster_labels[i] = id;
        type_labels[i] = PointType::Core;
    }

    // Border attachment: first core neighbour in adjacency-list order.
    for i in 0..n {
        if is_core[i] {
            continue;
        }
        if let Some(&j) = graph.neighbours(i).iter().find(|&&j| is_core[j]) {
            cluster_labels[i] = cluster_labels[j];
            type_labels[i] = PointType::Border;
        }
    }

    let n_clusters = next_id as usize;
    let border_count = type_labels
        .iter()
        .filter(|&&t| t == PointType::Border)
        .count();
    info!(
        "Formed {} clusters: {} core, {} border, {} noise",
        n_clusters,
        core_count,
        border_count,
        n - core_count - border_count
    );

    (cluster_labels, type_labels, n_clusters)
}
