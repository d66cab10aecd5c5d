//! Graph file I/O and the distributed loader.
//!
//! [`graph_file`] does byte-range reads of the binary format defined in
//! [`wire`]; [`loader`] drives those reads collectively so that every rank
//! ends up with exactly its own slice of the graph.

pub mod graph_file;
pub mod loader;
pub mod wire;

pub use graph_file::{GraphFile, GraphFileHeader, write_graph_file};
pub use loader::{LoaderConfig, load_dist_graph, load_dist_graph_balanced, load_dist_graph_naive};
