//! Parallel loading of a graph file into per-rank local subgraphs.
//!
//! Both variants follow the same protocol:
//!
//! 1. every rank opens the file and reads the header;
//! 2. the partition table is fixed identically on every rank (naive: computed
//!    locally; balanced: rank 0 reads the edge index, balances it and
//!    broadcasts the boundaries);
//! 3. each rank reads only the edge-index slice and edge records of its own
//!    vertex range;
//! 4. success is agreed collectively before anyone allocates, and the global
//!    vertex/edge totals are checked against the header afterwards.
//!
//! A failure on any rank becomes a failure on every rank. Partially loaded
//! graphs are never returned.

use crate::algs::communicator::{Communicator, ReduceOp, agree};
use crate::debug_invariants::DebugInvariants;
use crate::graph::{DistributedGraph, Edge};
use crate::graph_error::DistGraphError;
use crate::io::graph_file::GraphFile;
use crate::partitioning::metrics::BalanceReport;
use crate::partitioning::{PartitionStrategy, PartitionTable, balance_edge_index};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

fn default_ranks_per_node() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Binary graph file.
    pub path: PathBuf,
    #[serde(default)]
    pub strategy: PartitionStrategy,
    /// Ranks sharing a node; only used to describe the layout in logs.
    #[serde(default = "default_ranks_per_node")]
    pub ranks_per_node: usize,
    /// Run the distribution report after loading.
    #[serde(default)]
    pub report_stats: bool,
}

impl LoaderConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            strategy: PartitionStrategy::Naive,
            ranks_per_node: default_ranks_per_node(),
            report_stats: false,
        }
    }

    pub fn with_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ranks_per_node(mut self, ranks_per_node: usize) -> Self {
        self.ranks_per_node = ranks_per_node;
        self
    }

    pub fn with_stats(mut self, report_stats: bool) -> Self {
        self.report_stats = report_stats;
        self
    }

    /// Checks that depend only on the config, so every rank reaches the same
    /// verdict without communicating.
    pub fn validate(&self) -> Result<(), DistGraphError> {
        if self.path.as_os_str().is_empty() {
            return Err(DistGraphError::InvalidConfig(
                "a graph file path is required".into(),
            ));
        }
        if self.ranks_per_node == 0 {
            return Err(DistGraphError::InvalidConfig(
                "ranks per node must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load according to `config`. Collective over `comm`.
pub fn load_dist_graph<C: Communicator>(
    comm: &C,
    config: &LoaderConfig,
) -> Result<DistributedGraph, DistGraphError> {
    config.validate()?;
    let started = Instant::now();
    if comm.rank() == 0 {
        log::info!(
            "loading {} with {:?} partitioning on {} rank(s) ({} node(s) at {} rank(s)/node)",
            config.path.display(),
            config.strategy,
            comm.size(),
            comm.size().div_ceil(config.ranks_per_node),
            config.ranks_per_node
        );
    }

    let dg = match config.strategy {
        PartitionStrategy::Naive => load_dist_graph_naive(comm, &config.path)?,
        PartitionStrategy::Balanced => load_dist_graph_balanced(comm, &config.path)?,
    };

    comm.barrier()?;
    if comm.rank() == 0 {
        log::info!(
            "time to create distributed graph: {:.6}s",
            started.elapsed().as_secs_f64()
        );
    }
    if config.report_stats {
        dg.report_distribution_stats(comm)?;
    }
    Ok(dg)
}

/// Read against the even vertex split.
pub fn load_dist_graph_naive<C: Communicator>(
    comm: &C,
    path: impl AsRef<Path>,
) -> Result<DistributedGraph, DistGraphError> {
    let file = agree(comm, GraphFile::open(path))?;
    let table = PartitionTable::naive(file.header().num_vertices, comm.size())?;
    read_partition(comm, file, table)
}

/// Balance edge counts first, then read against the balanced table.
pub fn load_dist_graph_balanced<C: Communicator>(
    comm: &C,
    path: impl AsRef<Path>,
) -> Result<DistributedGraph, DistGraphError> {
    let mut file = agree(comm, GraphFile::open(path))?;
    let table = balanced_table(comm, &mut file)?;
    read_partition(comm, file, table)
}

/// Rank 0 balances; everyone else receives the same boundaries.
fn balanced_table<C: Communicator>(
    comm: &C,
    file: &mut GraphFile,
) -> Result<PartitionTable, DistGraphError> {
    let nparts = comm.size();
    let nv = file.header().num_vertices;

    let computed = if comm.rank() == 0 {
        balance_on_root(file, nparts).map(Some)
    } else {
        Ok(None)
    };
    let computed = agree(comm, computed)?;

    let mut bytes = vec![0u8; (nparts + 1) * 8];
    if let Some(table) = &computed {
        for (chunk, b) in bytes.chunks_exact_mut(8).zip(table.as_slice()) {
            chunk.copy_from_slice(&b.to_le_bytes());
        }
    }
    comm.broadcast(0, &mut bytes)?;

    let bounds = bytes
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            u64::from_le_bytes(raw)
        })
        .collect();
    let table = PartitionTable::from_bounds(bounds)?;
    if table.total_vertices() != nv {
        return Err(DistGraphError::InvalidPartitionTable(format!(
            "broadcast table spans {} vertices, file has {nv}",
            table.total_vertices()
        )));
    }
    Ok(table)
}

fn balance_on_root(file: &mut GraphFile, nparts: usize) -> Result<PartitionTable, DistGraphError> {
    let nv = file.header().num_vertices;
    let prefix = file.read_edge_index(0..nv)?;
    let table = balance_edge_index(&prefix, nparts)?;

    let balanced = BalanceReport::new(&table, &prefix)?;
    let naive = BalanceReport::new(&PartitionTable::naive(nv, nparts)?, &prefix)?;
    log::info!(
        "balanced max edges/rank {} (imbalance {:.3}), naive {} (imbalance {:.3})",
        balanced.max_load,
        balanced.imbalance,
        naive.max_load,
        naive.imbalance
    );
    Ok(table)
}

fn read_local_slice(
    file: &mut GraphFile,
    table: &PartitionTable,
    rank: usize,
) -> Result<(Vec<u64>, Vec<Edge>), DistGraphError> {
    let vertices = table.range(rank)?;
    let offsets = file.read_edge_index(vertices.clone())?;
    let edges = offsets[0]..offsets[offsets.len() - 1];
    log::debug!("rank {rank}: vertices {vertices:?}, edges {edges:?}");
    let records = file.read_edges(edges)?;
    Ok((offsets, records))
}

fn read_partition<C: Communicator>(
    comm: &C,
    mut file: GraphFile,
    table: PartitionTable,
) -> Result<DistributedGraph, DistGraphError> {
    let header = file.header();
    let slice = read_local_slice(&mut file, &table, comm.rank());
    let (offsets, edges) = agree(comm, slice)?;
    let local_vertices = offsets.len() - 1;
    let local_edges = edges.len();

    let mut dg = DistributedGraph::new(header.num_vertices, header.num_edges);
    let filled = dg
        .allocate_local(local_vertices, local_edges, table)
        .and_then(|g| g.fill(&offsets, edges));
    agree(comm, filled)?;

    let vertex_sum = comm.all_reduce_u64(local_vertices as u64, ReduceOp::Sum)?;
    if vertex_sum != header.num_vertices {
        return Err(DistGraphError::InconsistentLoad {
            what: "local vertex counts",
            expected: header.num_vertices,
            actual: vertex_sum,
        });
    }
    let edge_sum = comm.all_reduce_u64(local_edges as u64, ReduceOp::Sum)?;
    if edge_sum != header.num_edges {
        return Err(DistGraphError::InconsistentLoad {
            what: "local edge counts",
            expected: header.num_edges,
            actual: edge_sum,
        });
    }
    dg.debug_assert_invariants();
    Ok(dg)
}
