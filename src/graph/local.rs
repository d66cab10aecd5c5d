//! Per-rank adjacency storage.
//!
//! Compressed sparse rows over the vertices one rank owns: `edge_indices` has
//! `num_vertices + 1` local offsets into `edges`. Targets (`tail`) stay global
//! vertex ids so the clustering stage can route them with `owner()`.

use crate::debug_invariants::DebugInvariants;
use crate::graph_error::DistGraphError;
use crate::partitioning::VertexId;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One outgoing edge.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub tail: VertexId,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalGraph {
    edge_indices: Vec<u64>,
    edges: Vec<Edge>,
}

impl LocalGraph {
    /// Zeroed storage for `num_vertices` vertices and `num_edges` edges.
    pub fn new(num_vertices: usize, num_edges: usize) -> Self {
        Self {
            edge_indices: vec![0; num_vertices + 1],
            edges: vec![Edge::default(); num_edges],
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.edge_indices.len() - 1
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_indices(&self) -> &[u64] {
        &self.edge_indices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_range(&self, local: usize) -> Result<Range<usize>, DistGraphError> {
        if local >= self.num_vertices() {
            return Err(DistGraphError::LocalVertexOutOfRange {
                local,
                len: self.num_vertices(),
            });
        }
        Ok(self.edge_indices[local] as usize..self.edge_indices[local + 1] as usize)
    }

    pub fn degree(&self, local: usize) -> Result<usize, DistGraphError> {
        self.edge_range(local).map(|r| r.len())
    }

    pub fn edges_of(&self, local: usize) -> Result<&[Edge], DistGraphError> {
        let range = self.edge_range(local)?;
        Ok(&self.edges[range])
    }

    /// Populate from a slice of the global edge index and the matching edge
    /// records. `global_offsets` must hold `num_vertices + 1` entries; they are
    /// rebased so the first one becomes 0.
    pub fn fill(
        &mut self,
        global_offsets: &[u64],
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<(), DistGraphError> {
        if global_offsets.len() != self.edge_indices.len() {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "expected {} edge offsets, got {}",
                self.edge_indices.len(),
                global_offsets.len()
            )));
        }
        let base = global_offsets[0];
        for (slot, &off) in self.edge_indices.iter_mut().zip(global_offsets) {
            *slot = off.checked_sub(base).ok_or_else(|| {
                DistGraphError::CorruptGraphFile(format!(
                    "edge offset {off} precedes range start {base}"
                ))
            })?;
        }
        let mut filled = 0usize;
        for (slot, edge) in self.edges.iter_mut().zip(edges) {
            *slot = edge;
            filled += 1;
        }
        if filled != self.edges.len() {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "expected {} edges, got {filled}",
                self.edges.len()
            )));
        }
        self.validate_invariants()
    }
}

impl DebugInvariants for LocalGraph {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "LocalGraph invalid");
    }

    fn validate_invariants(&self) -> Result<(), DistGraphError> {
        if self.edge_indices.first() != Some(&0) {
            return Err(DistGraphError::CorruptGraphFile(
                "local edge index must start at 0".into(),
            ));
        }
        if let Some(v) = self.edge_indices.windows(2).position(|w| w[0] > w[1]) {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "local edge index decreases at local vertex {v}"
            )));
        }
        let last = self.edge_indices[self.edge_indices.len() - 1];
        if last != self.edges.len() as u64 {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "local edge index ends at {last} but {} edges are stored",
                self.edges.len()
            )));
        }
        Ok(())
    }
}
