//! Error types for the gsdbscan pipeline.
//!
//! Every error aborts the current pipeline invocation; there is no partial
//! result contract. `InvalidParameter` is raised before any heavy computation
//! and is recoverable by correcting the configuration. The other kinds
//! surface mid-run conditions.

use thiserror::Error;

/// Errors produced by the gsdbscan pipeline.
#[derive(Debug, Clone, Error)]
pub enum GsError {
    /// Malformed or inconsistent configuration, caught before any
    /// projection/distance work begins.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Allocation of a per-batch or global buffer failed. Retrying with a
    /// smaller batch budget (lower `alpha`) may succeed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Internal invariant violated (e.g. an assembler lane overran its
    /// reserved adjacency range). Indicates a logic defect, not a
    /// recoverable input problem.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

pub type Result<T> = std::result::Result<T, GsError>;
