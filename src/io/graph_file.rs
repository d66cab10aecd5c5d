//! Byte-range access to the binary graph format (see [`crate::io::wire`]).
//!
//! Every rank opens its own handle and reads only the slices it needs: the
//! header, the part of the edge index covering its vertex range, and the edge
//! records those offsets point at. Nothing here ever reads the whole file.

use crate::graph::Edge;
use crate::graph_error::DistGraphError;
use crate::io::wire::{
    EDGE_BYTES, HEADER_BYTES, OFFSET_BYTES, WireEdge, WireHeader, WireOffset, cast_slice,
    cast_slice_mut,
};
use crate::partitioning::VertexId;
use bytemuck::Zeroable;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphFileHeader {
    pub num_vertices: u64,
    pub num_edges: u64,
}

impl GraphFileHeader {
    /// Byte offset of edge-index entry `v`.
    pub fn offset_position(&self, v: VertexId) -> u64 {
        HEADER_BYTES + v * OFFSET_BYTES
    }

    /// Byte offset of edge record `e`.
    pub fn edge_position(&self, e: u64) -> u64 {
        self.offset_position(self.num_vertices + 1) + e * EDGE_BYTES
    }

    /// Expected file length, or `None` if the header is too large to be real.
    pub fn file_len(&self) -> Option<u64> {
        let index = self.num_vertices.checked_add(1)?.checked_mul(OFFSET_BYTES)?;
        let edges = self.num_edges.checked_mul(EDGE_BYTES)?;
        HEADER_BYTES.checked_add(index)?.checked_add(edges)
    }
}

#[derive(Debug)]
pub struct GraphFile {
    path: PathBuf,
    file: File,
    header: GraphFileHeader,
}

impl GraphFile {
    /// Open `path` and check its length against the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DistGraphError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| DistGraphError::io(&path, &e))?;
        let actual_len = file
            .metadata()
            .map_err(|e| DistGraphError::io(&path, &e))?
            .len();
        let mut this = Self {
            path,
            file,
            header: GraphFileHeader {
                num_vertices: 0,
                num_edges: 0,
            },
        };

        let mut raw = WireHeader::zeroed();
        this.read_at(0, cast_slice_mut(std::slice::from_mut(&mut raw)))?;
        this.header = GraphFileHeader {
            num_vertices: raw.nv(),
            num_edges: raw.ne(),
        };
        match this.header.file_len() {
            Some(len) if len == actual_len => Ok(this),
            Some(len) => Err(DistGraphError::CorruptGraphFile(format!(
                "header declares {} vertices and {} edges ({len} bytes) but file has {actual_len} bytes",
                this.header.num_vertices, this.header.num_edges
            ))),
            None => Err(DistGraphError::CorruptGraphFile(
                "header sizes overflow".into(),
            )),
        }
    }

    pub fn header(&self) -> GraphFileHeader {
        self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Edge-index entries for `vertices.start ..= vertices.end`, i.e.
    /// `vertices.len() + 1` offsets bracketing the range's edges.
    pub fn read_edge_index(&mut self, vertices: Range<VertexId>) -> Result<Vec<u64>, DistGraphError> {
        let nv = self.header.num_vertices;
        if vertices.start > vertices.end || vertices.end > nv {
            return Err(DistGraphError::VertexOutOfRange {
                vertex: vertices.end.max(vertices.start),
                total: nv,
            });
        }
        let count = (vertices.end - vertices.start + 1) as usize;
        let mut raw = vec![WireOffset::zeroed(); count];
        let at = self.header.offset_position(vertices.start);
        self.read_at(at, cast_slice_mut(&mut raw))?;
        let offsets: Vec<u64> = raw.iter().map(WireOffset::get).collect();

        if let Some(i) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "edge index decreases at vertex {}",
                vertices.start + i as u64
            )));
        }
        let (first, last) = (offsets[0], offsets[count - 1]);
        if last > self.header.num_edges {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "edge offset {last} exceeds edge count {}",
                self.header.num_edges
            )));
        }
        if vertices.start == 0 && first != 0 {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "edge index starts at {first}, expected 0"
            )));
        }
        if vertices.end == nv && last != self.header.num_edges {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "edge index ends at {last}, expected {}",
                self.header.num_edges
            )));
        }
        Ok(offsets)
    }

    /// Edge records `edges.start .. edges.end`.
    pub fn read_edges(&mut self, edges: Range<u64>) -> Result<Vec<Edge>, DistGraphError> {
        if edges.start > edges.end || edges.end > self.header.num_edges {
            return Err(DistGraphError::CorruptGraphFile(format!(
                "edge range {edges:?} outside [0, {})",
                self.header.num_edges
            )));
        }
        let mut raw = vec![WireEdge::zeroed(); (edges.end - edges.start) as usize];
        let at = self.header.edge_position(edges.start);
        self.read_at(at, cast_slice_mut(&mut raw))?;
        Ok(raw.into_iter().map(Edge::from).collect())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DistGraphError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DistGraphError::io(&self.path, &e))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(DistGraphError::ShortRead {
                        offset,
                        expected: buf.len(),
                        actual: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(DistGraphError::io(&self.path, &e)),
            }
        }
        Ok(())
    }
}

/// Write `adjacency` (one edge list per vertex, in vertex order) in the
/// binary graph format.
pub fn write_graph_file(
    path: impl AsRef<Path>,
    adjacency: &[Vec<Edge>],
) -> Result<GraphFileHeader, DistGraphError> {
    let path = path.as_ref();
    let num_edges: u64 = adjacency.iter().map(|a| a.len() as u64).sum();
    let header = GraphFileHeader {
        num_vertices: adjacency.len() as u64,
        num_edges,
    };
    let io_err = |e: std::io::Error| DistGraphError::io(path, &e);

    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    out.write_all(cast_slice(&[WireHeader::new(header.num_vertices, num_edges)]))
        .map_err(io_err)?;

    let mut acc = 0u64;
    let mut offsets = Vec::with_capacity(adjacency.len() + 1);
    offsets.push(WireOffset::of(0));
    for list in adjacency {
        acc += list.len() as u64;
        offsets.push(WireOffset::of(acc));
    }
    out.write_all(cast_slice(&offsets)).map_err(io_err)?;

    for list in adjacency {
        let records: Vec<WireEdge> = list.iter().map(WireEdge::from).collect();
        out.write_all(cast_slice(&records)).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    log::debug!(
        "wrote {} vertices / {} edges to {}",
        header.num_vertices,
        header.num_edges,
        path.display()
    );
    Ok(header)
}
