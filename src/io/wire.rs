//! Fixed, little-endian on-disk records of the binary graph format.
//!
//! ```text
//! WireHeader                      nv, ne
//! WireOffset[nv + 1]              edge index, [0] = 0, [nv] = ne
//! WireEdge[ne]                    (tail, weight)
//! ```
//!
//! All multi-byte integers are stored pre-LE with `.to_le()` and decoded with
//! `.from_le()`; weights travel as the LE bit pattern of an `f64`.

use crate::graph::Edge;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHeader {
    pub nv_le: u64,
    pub ne_le: u64,
}

impl WireHeader {
    pub fn new(nv: u64, ne: u64) -> Self {
        Self {
            nv_le: nv.to_le(),
            ne_le: ne.to_le(),
        }
    }
    pub fn nv(&self) -> u64 {
        u64::from_le(self.nv_le)
    }
    pub fn ne(&self) -> u64 {
        u64::from_le(self.ne_le)
    }
}

/// One entry of the edge index.
#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireOffset(pub u64);

impl WireOffset {
    pub fn of(offset: u64) -> Self {
        Self(offset.to_le())
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.0)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireEdge {
    pub tail_le: u64,
    pub weight_le: u64,
}

impl WireEdge {
    pub fn new(tail: u64, weight: f64) -> Self {
        Self {
            tail_le: tail.to_le(),
            weight_le: weight.to_bits().to_le(),
        }
    }
    pub fn tail(&self) -> u64 {
        u64::from_le(self.tail_le)
    }
    pub fn weight(&self) -> f64 {
        f64::from_bits(u64::from_le(self.weight_le))
    }
}

impl From<WireEdge> for Edge {
    fn from(w: WireEdge) -> Self {
        Edge {
            tail: w.tail(),
            weight: w.weight(),
        }
    }
}

impl From<&Edge> for WireEdge {
    fn from(e: &Edge) -> Self {
        WireEdge::new(e.tail, e.weight)
    }
}

pub const HEADER_BYTES: u64 = size_of::<WireHeader>() as u64;
pub const OFFSET_BYTES: u64 = size_of::<WireOffset>() as u64;
pub const EDGE_BYTES: u64 = size_of::<WireEdge>() as u64;

const_assert_eq!(size_of::<WireHeader>(), 16);
const_assert_eq!(size_of::<WireOffset>(), 8);
const_assert_eq!(size_of::<WireEdge>(), 16);
