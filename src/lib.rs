#![cfg_attr(docsrs, feature(doc_cfg))]
//! # distgraph
//!
//! distgraph stages a very large graph for distributed clustering: it splits
//! the vertex set into contiguous per-rank ranges, rebalances those ranges by
//! edge count for skewed degree distributions, and reads a binary graph file
//! in parallel so that each rank only ever touches its own slice.
//!
//! ## Features
//! - [`PartitionTable`](partitioning::PartitionTable): `P + 1` boundaries,
//!   O(log P) vertex ownership lookups
//! - Edge balancing by greedy prefix sums over the file's edge index
//! - Naive and balanced two-phase parallel loaders producing a
//!   [`DistributedGraph`](graph::DistributedGraph)
//! - Pluggable communication backends (single rank, in-process threads, MPI)
//!   passed explicitly to every collective step
//! - Collective edge-distribution diagnostics
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! distgraph = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ## Failure model
//! Contract violations come back as [`DistGraphError`](graph_error::DistGraphError)
//! values. A load failure on any rank fails the load on every rank. A rank that
//! never reaches a collective deadlocks the run; there is no timeout or retry.

pub mod algs;
pub mod debug_invariants;
pub mod graph;
pub mod graph_error;
pub mod io;
pub mod partitioning;

pub use debug_invariants::DebugInvariants;
pub use graph_error::DistGraphError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, ReduceOp, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::graph::{DistributedGraph, DistributionStats, Edge, LocalGraph};
    pub use crate::graph_error::DistGraphError;
    pub use crate::io::{LoaderConfig, load_dist_graph, load_dist_graph_balanced, load_dist_graph_naive};
    pub use crate::partitioning::{
        PartitionStrategy, PartitionTable, Rank, VertexId, balance_edge_index, balance_edges,
    };
}
