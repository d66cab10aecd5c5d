//! Contiguous range partitioning of global vertex ids across ranks.
//!
//! A [`PartitionTable`] is the boundary array `b[0..=P]` with `b[0] = 0`,
//! `b[P] = total_vertices` and `b[i] <= b[i+1]`. Rank `p` owns `[b[p], b[p+1])`.
//! Every rank holds an identical copy; it is never mutated after construction.

pub mod balance;
pub mod metrics;

pub use self::balance::{balance_edge_index, balance_edges};
pub use self::metrics::{BalanceReport, edge_loads, imbalance};

use crate::debug_invariants::DebugInvariants;
use crate::graph_error::DistGraphError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Global vertex identifier.
pub type VertexId = u64;
/// Zero-based process index.
pub type Rank = usize;

/// Which partitioning the loader reads against.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStrategy {
    /// `total_vertices / P` vertices per rank.
    #[default]
    Naive,
    /// Vertex ranges resized so every rank holds about `total_edges / P` edges.
    Balanced,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPartitionTable")]
pub struct PartitionTable {
    bounds: Vec<VertexId>,
}

/// Unchecked wire shape; deserialized tables go through `from_bounds`.
#[derive(Deserialize)]
struct RawPartitionTable {
    bounds: Vec<VertexId>,
}

impl TryFrom<RawPartitionTable> for PartitionTable {
    type Error = DistGraphError;

    fn try_from(raw: RawPartitionTable) -> Result<Self, Self::Error> {
        Self::from_bounds(raw.bounds)
    }
}

impl PartitionTable {
    /// Validate and wrap a boundary array.
    pub fn from_bounds(bounds: Vec<VertexId>) -> Result<Self, DistGraphError> {
        let table = Self { bounds };
        table.validate_invariants()?;
        Ok(table)
    }

    /// Even split: `nv / P` vertices each, the remainder handed one apiece to
    /// the lowest ranks. `naive(10, 3)` is `[0, 4, 7, 10]`.
    pub fn naive(total_vertices: u64, nparts: usize) -> Result<Self, DistGraphError> {
        if nparts == 0 {
            return Err(DistGraphError::ZeroParts);
        }
        let p = nparts as u64;
        let (share, extra) = (total_vertices / p, total_vertices % p);
        let mut bounds = Vec::with_capacity(nparts + 1);
        bounds.push(0);
        let mut acc = 0u64;
        for rank in 0..p {
            acc += share + u64::from(rank < extra);
            bounds.push(acc);
        }
        Self::from_bounds(bounds)
    }

    pub fn num_parts(&self) -> usize {
        self.bounds.len().saturating_sub(1)
    }

    pub fn total_vertices(&self) -> u64 {
        self.bounds.last().copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[VertexId] {
        &self.bounds
    }

    fn check_rank(&self, rank: Rank) -> Result<(), DistGraphError> {
        if self.bounds.is_empty() {
            return Err(DistGraphError::EmptyPartitionTable);
        }
        if rank >= self.num_parts() {
            return Err(DistGraphError::RankOutOfRange {
                rank,
                parts: self.num_parts(),
            });
        }
        Ok(())
    }

    /// First vertex owned by `rank` (`b[rank]`).
    pub fn start(&self, rank: Rank) -> Result<VertexId, DistGraphError> {
        self.check_rank(rank)?;
        Ok(self.bounds[rank])
    }

    /// One past the last vertex owned by `rank` (`b[rank + 1]`).
    pub fn end(&self, rank: Rank) -> Result<VertexId, DistGraphError> {
        self.check_rank(rank)?;
        Ok(self.bounds[rank + 1])
    }

    pub fn range(&self, rank: Rank) -> Result<Range<VertexId>, DistGraphError> {
        self.check_rank(rank)?;
        Ok(self.bounds[rank]..self.bounds[rank + 1])
    }

    pub fn part_len(&self, rank: Rank) -> Result<u64, DistGraphError> {
        self.range(rank).map(|r| r.end - r.start)
    }

    /// Owning rank of `v`: upper bound over the boundaries, minus one.
    /// O(log P). Empty ranges are skipped because the upper bound lands past
    /// every boundary equal to `v`.
    pub fn owner(&self, v: VertexId) -> Result<Rank, DistGraphError> {
        if self.bounds.len() < 2 {
            return Err(DistGraphError::EmptyPartitionTable);
        }
        let total = self.total_vertices();
        if v >= total {
            return Err(DistGraphError::VertexOutOfRange { vertex: v, total });
        }
        let upper = self.bounds.partition_point(|&b| b <= v);
        if upper == 0 || upper == self.bounds.len() {
            return Err(DistGraphError::PartitionLookupMiss(v));
        }
        Ok(upper - 1)
    }

    /// `(rank, range)` for every rank, empty ranges included.
    pub fn ranges(&self) -> impl Iterator<Item = (Rank, Range<VertexId>)> + '_ {
        self.bounds
            .iter()
            .tuple_windows()
            .enumerate()
            .map(|(rank, (&lo, &hi))| (rank, lo..hi))
    }
}

impl DebugInvariants for PartitionTable {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "PartitionTable invalid");
    }

    fn validate_invariants(&self) -> Result<(), DistGraphError> {
        match self.bounds.first() {
            None => return Err(DistGraphError::EmptyPartitionTable),
            Some(&first) if first != 0 => {
                return Err(DistGraphError::InvalidPartitionTable(format!(
                    "first boundary is {first}, expected 0"
                )));
            }
            Some(_) => {}
        }
        if self.bounds.len() < 2 {
            return Err(DistGraphError::ZeroParts);
        }
        if let Some((i, (lo, hi))) = self
            .bounds
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (lo, hi))| lo > hi)
        {
            return Err(DistGraphError::InvalidPartitionTable(format!(
                "boundary {i} ({lo}) exceeds boundary {} ({hi})",
                i + 1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
