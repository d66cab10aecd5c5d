//! Distributed graph container and the per-rank local subgraph it owns.

pub mod distributed;
pub mod local;

pub use distributed::{DistributedGraph, DistributionStats};
pub use local::{Edge, LocalGraph};
