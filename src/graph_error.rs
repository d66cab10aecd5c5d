//! DistGraphError: Unified error type for distgraph public APIs
//!
//! Contract violations (double allocation, out-of-range vertices, lookups on an
//! uninitialized table) are reported as typed errors instead of assertions, so
//! a misrouted vertex can never silently corrupt a downstream edge exchange.

use thiserror::Error;

/// Unified error type for distgraph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistGraphError {
    /// `allocate_local` was called on a graph that already owns a local subgraph.
    #[error("local subgraph already allocated for this distributed graph")]
    AlreadyAllocated,
    /// A query needed the local subgraph before `allocate_local` ran.
    #[error("local subgraph has not been allocated")]
    LocalGraphMissing,
    /// Global vertex id outside `[0, total_vertices)`.
    #[error("vertex {vertex} out of range (graph has {total} vertices)")]
    VertexOutOfRange { vertex: u64, total: u64 },
    /// Local vertex index outside the local subgraph.
    #[error("local vertex {local} out of range (local subgraph has {len} vertices)")]
    LocalVertexOutOfRange { local: usize, len: usize },
    /// Rank outside `[0, num_parts)`.
    #[error("rank {rank} out of range ({parts} parts)")]
    RankOutOfRange { rank: usize, parts: usize },
    /// The partition table is empty or has not been installed yet.
    #[error("partition table is empty or uninitialized")]
    EmptyPartitionTable,
    /// Boundary array violates the coverage/ordering invariants.
    #[error("invalid partition table: {0}")]
    InvalidPartitionTable(String),
    /// Upper-bound search over the boundaries found no owning range.
    #[error("partition table lookup found no owner for vertex {0}")]
    PartitionLookupMiss(u64),
    /// `set_total_edges` may only correct the estimate once.
    #[error("global edge count was already corrected")]
    EdgeCountAlreadyCorrected,
    /// A partition was requested for zero processes.
    #[error("cannot partition across zero processes")]
    ZeroParts,
    /// Operating-system level I/O failure.
    #[error("I/O error on `{path}`: {message}")]
    Io { path: String, message: String },
    /// A byte-range read returned fewer bytes than requested.
    #[error("short read at byte offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },
    /// Graph file contents disagree with its own header.
    #[error("corrupt graph file: {0}")]
    CorruptGraphFile(String),
    /// Point-to-point or collective communication failure.
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
    /// The message-passing runtime could not be initialized.
    #[error("failed to initialize the communicator: {0}")]
    CommInit(String),
    /// One or more other ranks failed their part of a collective step.
    #[error("collective step failed on {failed_ranks} rank(s)")]
    PeerLoadFailed { failed_ranks: u64 },
    /// Global totals after loading disagree with the file header.
    #[error("inconsistent load: {what} sum to {actual}, expected {expected}")]
    InconsistentLoad {
        what: &'static str,
        expected: u64,
        actual: u64,
    },
    /// Configuration rejected before any collective was entered.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DistGraphError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        DistGraphError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}
