//! Partitioning metrics utilities.
//!
//! Quality measures for a [`PartitionTable`] against an edge index. Used by the
//! balanced loader to log the achieved balance, and by tests.

use super::PartitionTable;
use crate::graph_error::DistGraphError;
use serde::Serialize;

/// Per-rank edge totals under `table`, given the global edge index
/// (`prefix[v]` = edges of all vertices below `v`, length `nv + 1`).
pub fn edge_loads(table: &PartitionTable, prefix: &[u64]) -> Result<Vec<u64>, DistGraphError> {
    let nv = table.total_vertices();
    if prefix.len() as u64 != nv + 1 {
        return Err(DistGraphError::InvalidPartitionTable(format!(
            "table covers {nv} vertices but edge index has {} offsets",
            prefix.len()
        )));
    }
    Ok(table
        .ranges()
        .map(|(_, r)| prefix[r.end as usize] - prefix[r.start as usize])
        .collect())
}

/// Max-to-mean ratio of `loads`. `1.0` is perfect balance; an all-zero or
/// empty load vector also counts as balanced.
pub fn imbalance(loads: &[u64]) -> f64 {
    let total: u64 = loads.iter().sum();
    if loads.is_empty() || total == 0 {
        return 1.0;
    }
    let max = loads.iter().copied().max().unwrap_or(0) as f64;
    max / (total as f64 / loads.len() as f64)
}

/// Summary logged after balancing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BalanceReport {
    pub loads: Vec<u64>,
    pub max_load: u64,
    pub mean_load: f64,
    pub imbalance: f64,
}

impl BalanceReport {
    pub fn new(table: &PartitionTable, prefix: &[u64]) -> Result<Self, DistGraphError> {
        let loads = edge_loads(table, prefix)?;
        let max_load = loads.iter().copied().max().unwrap_or(0);
        let mean_load = if loads.is_empty() {
            0.0
        } else {
            loads.iter().sum::<u64>() as f64 / loads.len() as f64
        };
        let imbalance = imbalance(&loads);
        Ok(Self {
            loads,
            max_load,
            mean_load,
            imbalance,
        })
    }
}
