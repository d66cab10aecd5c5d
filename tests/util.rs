#![allow(dead_code)]
use distgraph::graph::Edge;
use distgraph::io::write_graph_file;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Graph file in the temp dir, removed on drop.
pub struct TempGraph {
    path: PathBuf,
}

impl TempGraph {
    pub fn write(name: &str, adjacency: &[Vec<Edge>]) -> Self {
        let this = Self::reserve(name);
        write_graph_file(&this.path, adjacency).unwrap();
        this
    }

    /// A unique path with nothing written to it yet.
    pub fn reserve(name: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "distgraph-it-{}-{name}-{n}.bin",
            std::process::id()
        ));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempGraph {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

/// Vertex `v` gets `degrees[v]` edges pointing at `(v + 1 + i) % nv` with
/// weight `v + i / 10`, so every record is distinguishable.
pub fn adjacency_from_degrees(degrees: &[u64]) -> Vec<Vec<Edge>> {
    let nv = degrees.len().max(1) as u64;
    degrees
        .iter()
        .enumerate()
        .map(|(v, &d)| {
            (0..d)
                .map(|i| Edge {
                    tail: (v as u64 + 1 + i) % nv,
                    weight: v as f64 + i as f64 / 10.0,
                })
                .collect()
        })
        .collect()
}

/// Global edge index of `degrees`.
pub fn prefix_of(degrees: &[u64]) -> Vec<u64> {
    let mut prefix = vec![0u64];
    for &d in degrees {
        prefix.push(prefix[prefix.len() - 1] + d);
    }
    prefix
}
