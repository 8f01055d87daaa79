//! Sparse neighbour graph: degrees, offsets and the flattened adjacency list.
//!
//! Thresholding the distance buffer by eps yields a per-point neighbour
//! count (degree); the exclusive prefix sum of degrees reserves a disjoint
//! contiguous range per point inside one flat adjacency array. The assembler
//! then fills each range in parallel with no atomics or locks, since ranges
//! never overlap by construction.
//!
//! Across batches the prefix sum is the single serialization point: a
//! batch's offsets are shifted by the running total of all prior batches
//! before being merged.

use std::fmt;

use log::{debug, info, trace};
use rayon::prelude::*;

use crate::candidates::{resolve_slot, IndexMatrix};
use crate::error::{GsError, Result};

/// Per-point neighbour counts for a row range of the distance buffer.
///
/// `distances` must hold whole rows of `slots` entries in slot composition
/// order. Counting uses strict `< eps` and is independent of slot order.
pub fn row_degrees(distances: &[f64], slots: usize, eps: f64) -> Vec<usize> {
    distances
        .par_chunks(slots)
        .map(|row| row.iter().filter(|&&d| d < eps).count())
        .collect()
}

/// Fold one batch of degrees into the global offset table.
///
/// Appends the exclusive prefix position of every row and advances the
/// running total. Must be called in batch order; this is the cross-batch
/// state the batching loop threads sequentially.
pub fn extend_offsets(
    offsets: &mut Vec<usize>,
    batch_degrees: &[usize],
    running_offset: &mut usize,
) {
    offsets.reserve(batch_degrees.len());
    for &deg in batch_degrees {
        offsets.push(*running_offset);
        *running_offset += deg;
    }
}

/// Fill the reserved adjacency slices for rows `[start, end)`.
///
/// `slices[i - start]` is the pre-reserved output range of point i (length
/// degree[i]). Each lane scans its 2km candidate slots in composition order
/// and writes the dataset-global candidate index for every slot with
/// distance strictly below eps. A lane running past or short of its
/// reserved range means the degree counts and the threshold disagree;
/// that is fatal (`InternalInconsistency`), never user-recoverable.
pub fn assemble_adjacency(
    distances: &[f64],
    a: &IndexMatrix,
    b: &IndexMatrix,
    eps: f64,
    start: usize,
    end: usize,
    slices: &mut [&mut [usize]],
    block_size: usize,
) -> Result<()> {
    let (_, two_k) = a.shape();
    let (_, m) = b.shape();
    let slots = two_k * m;
    debug_assert_eq!(slices.len(), end - start);
    debug_assert_eq!(distances.len(), (end - start) * slots);

    slices
        .par_iter_mut()
        .enumerate()
        .with_min_len(block_size.max(1))
        .try_for_each(|(off, slice)| {
            let i = start + off;
            let row = &distances[off * slots..(off + 1) * slots];
            let mut cursor = 0usize;

            for (slot, &dist) in row.iter().enumerate() {
                if dist < eps {
                    if cursor >= slice.len() {
                        return Err(GsError::InternalInconsistency(format!(
                            "point {} overran its reserved adjacency range of {}",
                            i,
                            slice.len()
                        )));
                    }
                    let (a_col, b_col) = resolve_slot(slot, m);
                    slice[cursor] = b.get(a.get(i, a_col), b_col);
                    cursor += 1;
                }
            }

            if cursor != slice.len() {
                return Err(GsError::InternalInconsistency(format!(
                    "point {} wrote {} neighbours but reserved {}",
                    i,
                    cursor,
                    slice.len()
                )));
            }
            Ok(())
        })
}

/// The sparse approximate neighbour graph produced by the pipeline.
///
/// `adjacency[offsets[i]..offsets[i] + degrees[i]]` holds the dataset
/// indices within eps of point i, in candidate scan order (not sorted, not
/// deduplicated, and not necessarily symmetric: asymmetry is an inherent
/// property of the sketch, tolerated downstream rather than repaired).
#[derive(Debug, Clone)]
pub struct NeighbourGraph {
    pub degrees: Vec<usize>,
    pub offsets: Vec<usize>,
    pub adjacency: Vec<usize>,
    pub eps: f64,
}

impl NeighbourGraph {
    /// Wrap the assembled parts, verifying that the offset table and the
    /// written adjacency agree.
    pub fn from_parts(
        degrees: Vec<usize>,
        offsets: Vec<usize>,
        adjacency: Vec<usize>,
        eps: f64,
    ) -> Result<Self> {
        let total: usize = degrees.iter().sum();
        if total != adjacency.len() {
            return Err(GsError::InternalInconsistency(format!(
                "degree total {} disagrees with adjacency length {}",
                total,
                adjacency.len()
            )));
        }
        if degrees.len() != offsets.len() {
            return Err(GsError::InternalInconsistency(format!(
                "{} degrees but {} offsets",
                degrees.len(),
                offsets.len()
            )));
        }
        Ok(Self { degrees, offsets, adjacency, eps })
    }

    pub fn nnodes(&self) -> usize {
        self.degrees.len()
    }

    /// Total graph size (number of directed edges stored).
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    #[inline]
    pub fn neighbours(&self, i: usize) -> &[usize] {
        let start = self.offsets[i];
        &self.adjacency[start..start + self.degrees[i]]
    }

    pub fn max_degree(&self) -> usize {
        self.degrees.iter().copied().max().unwrap_or(0)
    }

    pub fn mean_degree(&self) -> f64 {
        if self.degrees.is_empty() {
            return 0.0;
        }
        self.len() as f64 / self.nnodes() as f64
    }
}

impl fmt::Display for NeighbourGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "NeighbourGraph: {} nodes, {} edges, eps={}",
            self.nnodes(),
            self.len(),
            self.eps
        )?;
        writeln!(
            f,
            "  degree range: [{}, {}], mean {:.2}",
            self.degrees.iter().copied().min().unwrap_or(0),
            self.max_degree(),
            self.mean_degree()
        )
    }
}

/// Degrees, offsets and adjacency computed in one pass over an in-memory
/// distance buffer. The pipeline builds these incrementally per batch; this
/// helper serves callers (and tests) that already hold the full buffer.
pub fn build_neighbour_graph(
    distances: &[f64],
    a: &IndexMatrix,
    b: &IndexMatrix,
    eps: f64,
    block_size: usize,
) -> Result<NeighbourGraph> {
    let (n, two_k) = a.shape();
    let (_, m) = b.shape();
    let slots = two_k * m;
    debug_assert_eq!(distances.len(), n * slots);

    info!("Building neighbour graph for {} points (eps={})", n, eps);

    let degrees = row_degrees(distances, slots, eps);

    let mut offsets = Vec::new();
    let mut running_offset = 0usize;
    extend_offsets(&mut offsets, &degrees, &mut running_offset);
    trace!("Total graph size: {} entries", running_offset);

    let mut adjacency = vec![0usize; running_offset];
    {
        let mut slices: Vec<&mut [usize]> = Vec::with_capacity(n);
        let mut rest = adjacency.as_mut_slice();
        for &deg in &degrees {
            let (head, tail) = rest.split_at_mut(deg);
            slices.push(head);
            rest = tail;
        }
        assemble_adjacency(distances, a, b, eps, 0, n, &mut slices, block_size)?;
    }

    let graph = NeighbourGraph::from_parts(degrees, offsets, adjacency, eps)?;
    debug!("{}", graph);
    Ok(graph)
}
