//! Edge-count balancing of contiguous vertex ranges.
//!
//! Greedy prefix-sum partitioning over the edge index (`prefix[v]` = edges of
//! all vertices below `v`). Rank `p < P-1` closes its range at the first
//! vertex boundary where the running edge count reaches the cumulative target
//! `floor(E * (p+1) / P)`. The vertex that reaches or crosses the target,
//! including an exact hit, stays with the current rank. Boundaries are then
//! clamped so every rank keeps at least one vertex while `nv >= P`; the last
//! rank absorbs whatever is left so the table always ends at `nv`.
//!
//! Cumulative targets keep rounding error from drifting across ranks, which
//! bounds every rank's load by `ceil(E / P) + max_degree`.

use super::{PartitionTable, VertexId};
use crate::debug_invariants::DebugInvariants;
use crate::graph_error::DistGraphError;

/// Balance from per-vertex degrees.
pub fn balance_edges(degrees: &[u64], nparts: usize) -> Result<PartitionTable, DistGraphError> {
    let mut prefix = Vec::with_capacity(degrees.len() + 1);
    prefix.push(0u64);
    let mut acc = 0u64;
    for &d in degrees {
        acc += d;
        prefix.push(acc);
    }
    balance_edge_index(&prefix, nparts)
}

/// Balance from an edge index (`nv + 1` non-decreasing offsets starting at 0),
/// the layout stored in the graph file.
pub fn balance_edge_index(
    prefix: &[u64],
    nparts: usize,
) -> Result<PartitionTable, DistGraphError> {
    if nparts == 0 {
        return Err(DistGraphError::ZeroParts);
    }
    let Some((&first, _)) = prefix.split_first() else {
        return Err(DistGraphError::CorruptGraphFile(
            "edge index must hold at least one offset".into(),
        ));
    };
    if first != 0 {
        return Err(DistGraphError::CorruptGraphFile(format!(
            "edge index starts at {first}, expected 0"
        )));
    }
    if let Some(i) = prefix.windows(2).position(|w| w[0] > w[1]) {
        return Err(DistGraphError::CorruptGraphFile(format!(
            "edge index decreases at vertex {i}"
        )));
    }

    let nv = (prefix.len() - 1) as u64;
    let total_edges = prefix[prefix.len() - 1];
    let p = nparts as u64;
    if nv < p {
        log::warn!(
            "balancing {nv} vertices over {nparts} ranks: {} rank(s) get empty ranges",
            nparts as u64 - nv
        );
    }

    let mut bounds: Vec<VertexId> = Vec::with_capacity(nparts + 1);
    bounds.push(0);
    for rank in 0..p - 1 {
        let target = (u128::from(total_edges) * u128::from(rank + 1) / u128::from(p)) as u64;
        let reached = prefix.partition_point(|&e| e < target) as u64;
        let prev = bounds[rank as usize];
        let (lo, hi) = if nv >= p {
            (prev + 1, nv - (p - rank - 1))
        } else {
            ((prev + 1).min(nv), nv)
        };
        bounds.push(reached.clamp(lo, hi));
    }
    bounds.push(nv);

    let table = PartitionTable::from_bounds(bounds)?;
    table.debug_assert_invariants();
    Ok(table)
}
