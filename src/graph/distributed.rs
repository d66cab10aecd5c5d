//! One rank's view of a graph partitioned across all ranks.
//!
//! A [`DistributedGraph`] knows the global vertex/edge counts, exclusively owns
//! the rank's [`LocalGraph`], and holds a copy of the [`PartitionTable`] that
//! every other rank also holds. The local subgraph and table are installed
//! together, exactly once, by [`DistributedGraph::allocate_local`].
//!
//! The type is not `Clone`; copying the local adjacency goes through
//! [`DistributedGraph::deep_clone`].

use crate::algs::communicator::{Communicator, ReduceOp, agree};
use crate::debug_invariants::DebugInvariants;
use crate::graph::local::LocalGraph;
use crate::graph_error::DistGraphError;
use crate::partitioning::{PartitionTable, Rank, VertexId};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

#[derive(Clone, Debug)]
struct LocalPartition {
    graph: LocalGraph,
    table: PartitionTable,
}

#[derive(Debug)]
pub struct DistributedGraph {
    total_vertices: u64,
    total_edges: u64,
    edges_corrected: bool,
    local: Option<LocalPartition>,
}

impl DistributedGraph {
    /// Global counts known up front; `total_edges` may be a placeholder that is
    /// corrected later with [`set_total_edges`](Self::set_total_edges).
    pub fn new(total_vertices: u64, total_edges: u64) -> Self {
        Self {
            total_vertices,
            total_edges,
            edges_corrected: false,
            local: None,
        }
    }

    pub fn total_vertices(&self) -> u64 {
        self.total_vertices
    }

    pub fn total_edges(&self) -> u64 {
        self.total_edges
    }

    pub fn is_allocated(&self) -> bool {
        self.local.is_some()
    }

    /// Allocate the local subgraph and take ownership of the partition table.
    ///
    /// # Errors
    /// `AlreadyAllocated` on a second call; `InvalidPartitionTable` if the
    /// table does not span exactly `[0, total_vertices)`.
    pub fn allocate_local(
        &mut self,
        local_vertices: usize,
        local_edges: usize,
        table: PartitionTable,
    ) -> Result<&mut LocalGraph, DistGraphError> {
        if self.is_allocated() {
            return Err(DistGraphError::AlreadyAllocated);
        }
        table.validate_invariants()?;
        if table.total_vertices() != self.total_vertices {
            return Err(DistGraphError::InvalidPartitionTable(format!(
                "table spans {} vertices, graph has {}",
                table.total_vertices(),
                self.total_vertices
            )));
        }
        let part = self.local.insert(LocalPartition {
            graph: LocalGraph::new(local_vertices, local_edges),
            table,
        });
        Ok(&mut part.graph)
    }

    pub fn local_graph(&self) -> Result<&LocalGraph, DistGraphError> {
        self.local
            .as_ref()
            .map(|p| &p.graph)
            .ok_or(DistGraphError::LocalGraphMissing)
    }

    pub fn local_graph_mut(&mut self) -> Result<&mut LocalGraph, DistGraphError> {
        self.local
            .as_mut()
            .map(|p| &mut p.graph)
            .ok_or(DistGraphError::LocalGraphMissing)
    }

    pub fn partition_table(&self) -> Result<&PartitionTable, DistGraphError> {
        self.local
            .as_ref()
            .map(|p| &p.table)
            .ok_or(DistGraphError::EmptyPartitionTable)
    }

    /// Rank owning global vertex `v`, in O(log P).
    pub fn owner(&self, v: VertexId) -> Result<Rank, DistGraphError> {
        if v >= self.total_vertices {
            return Err(DistGraphError::VertexOutOfRange {
                vertex: v,
                total: self.total_vertices,
            });
        }
        self.partition_table()?.owner(v)
    }

    /// `b[rank]`.
    pub fn range_start(&self, rank: Rank) -> Result<VertexId, DistGraphError> {
        self.partition_table()?.start(rank)
    }

    /// `b[rank + 1]`.
    pub fn range_end(&self, rank: Rank) -> Result<VertexId, DistGraphError> {
        self.partition_table()?.end(rank)
    }

    pub fn local_range(&self, rank: Rank) -> Result<Range<VertexId>, DistGraphError> {
        self.partition_table()?.range(rank)
    }

    /// One-shot correction of the global edge count.
    pub fn set_total_edges(&mut self, total_edges: u64) -> Result<(), DistGraphError> {
        if self.edges_corrected {
            return Err(DistGraphError::EdgeCountAlreadyCorrected);
        }
        self.total_edges = total_edges;
        self.edges_corrected = true;
        Ok(())
    }

    /// Full copy, local adjacency included.
    pub fn deep_clone(&self) -> Self {
        Self {
            total_vertices: self.total_vertices,
            total_edges: self.total_edges,
            edges_corrected: self.edges_corrected,
            local: self.local.clone(),
        }
    }

    /// Collective: every rank must call this. Reduces the per-rank edge
    /// counts, waits on a barrier, then logs the report on rank 0. Every rank
    /// gets the same numbers back.
    ///
    /// # Errors
    /// `LocalGraphMissing` on a rank without a local subgraph, and
    /// `PeerLoadFailed` on every other rank, so no rank is left waiting in
    /// the reduction.
    pub fn report_distribution_stats<C: Communicator>(
        &self,
        comm: &C,
    ) -> Result<DistributionStats, DistGraphError> {
        let local = self.local_graph().map(|g| g.num_edges() as u64);
        let local_edges = agree(comm, local)?;

        let sum = comm.all_reduce_u64(local_edges, ReduceOp::Sum)?;
        let max = comm.all_reduce_u64(local_edges, ReduceOp::Max)?;
        let sum_sq = comm.all_reduce_f64((local_edges as f64).powi(2), ReduceOp::Sum)?;

        let stats = DistributionStats::from_sums(
            comm.size(),
            self.total_vertices,
            self.total_edges,
            sum,
            max,
            sum_sq,
        );

        comm.barrier()?;
        if comm.rank() == 0 {
            for line in stats.to_string().lines() {
                log::info!("{line}");
            }
        }
        Ok(stats)
    }
}

impl DebugInvariants for DistributedGraph {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "DistributedGraph invalid");
    }

    fn validate_invariants(&self) -> Result<(), DistGraphError> {
        let Some(part) = &self.local else {
            return Ok(());
        };
        part.table.validate_invariants()?;
        if part.table.total_vertices() != self.total_vertices {
            return Err(DistGraphError::InvalidPartitionTable(format!(
                "table spans {} vertices, graph has {}",
                part.table.total_vertices(),
                self.total_vertices
            )));
        }
        part.graph.validate_invariants()?;
        if part.graph.num_vertices() as u64 > self.total_vertices {
            return Err(DistGraphError::InconsistentLoad {
                what: "local vertices",
                expected: self.total_vertices,
                actual: part.graph.num_vertices() as u64,
            });
        }
        Ok(())
    }
}

/// Per-rank edge load statistics, identical on every rank.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionStats {
    pub num_ranks: usize,
    pub num_vertices: u64,
    pub num_edges: u64,
    pub local_edge_sum: u64,
    pub max_edges: u64,
    pub mean_edges: f64,
    pub expected_square: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl DistributionStats {
    /// Population statistics from the reduced sums. Variance is computed as
    /// `E[X^2] - E[X]^2` and clamped at zero against rounding.
    pub fn from_sums(
        num_ranks: usize,
        num_vertices: u64,
        num_edges: u64,
        sum: u64,
        max: u64,
        sum_sq: f64,
    ) -> Self {
        let n = num_ranks.max(1) as f64;
        let mean_edges = sum as f64 / n;
        let expected_square = sum_sq / n;
        let variance = (expected_square - mean_edges * mean_edges).max(0.0);
        Self {
            num_ranks,
            num_vertices,
            num_edges,
            local_edge_sum: sum,
            max_edges: max,
            mean_edges,
            expected_square,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}

impl fmt::Display for DistributionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(55);
        writeln!(f, "{rule}")?;
        writeln!(f, "Graph edge distribution characteristics")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Number of ranks: {}", self.num_ranks)?;
        writeln!(f, "Number of vertices: {}", self.num_vertices)?;
        writeln!(f, "Number of edges: {}", self.num_edges)?;
        writeln!(f, "Maximum number of edges: {}", self.max_edges)?;
        writeln!(f, "Average number of edges: {}", self.mean_edges)?;
        writeln!(f, "Expected value of X^2: {}", self.expected_square)?;
        writeln!(f, "Variance: {}", self.variance)?;
        writeln!(f, "Standard deviation: {}", self.std_dev)?;
        write!(f, "{rule}")
    }
}
