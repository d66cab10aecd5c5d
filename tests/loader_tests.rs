mod util;

use distgraph::DistGraphError;
use distgraph::algs::communicator::{Communicator, NoComm, run_on_threads};
use distgraph::graph::{DistributedGraph, Edge};
use distgraph::io::{LoaderConfig, load_dist_graph, load_dist_graph_balanced, load_dist_graph_naive};
use distgraph::partitioning::{PartitionStrategy, PartitionTable};
use util::{TempGraph, adjacency_from_degrees};

const HEAVY_TAIL: [u64; 10] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 20];

/// Every rank's local edges, concatenated in rank order, must reproduce the
/// file's edge records.
fn assert_reassembles(graphs: &[DistributedGraph], adjacency: &[Vec<Edge>]) {
    let loaded: Vec<Edge> = graphs
        .iter()
        .flat_map(|dg| dg.local_graph().unwrap().edges().to_vec())
        .collect();
    let expected: Vec<Edge> = adjacency.iter().flatten().copied().collect();
    assert_eq!(loaded, expected);
}

fn local_edge_counts(graphs: &[DistributedGraph]) -> Vec<usize> {
    graphs
        .iter()
        .map(|dg| dg.local_graph().unwrap().num_edges())
        .collect()
}

#[test]
fn naive_load_splits_vertices_evenly() {
    let adjacency = adjacency_from_degrees(&HEAVY_TAIL);
    let file = TempGraph::write("naive", &adjacency);

    let graphs: Vec<_> = run_on_threads(3, |comm| load_dist_graph_naive(&comm, file.path()))
        .into_iter()
        .map(Result::unwrap)
        .collect();

    for (rank, dg) in graphs.iter().enumerate() {
        assert_eq!(dg.total_vertices(), 10);
        assert_eq!(dg.total_edges(), 29);
        assert_eq!(dg.partition_table().unwrap().as_slice(), &[0, 4, 7, 10]);
        let local = dg.local_graph().unwrap();
        assert_eq!(
            local.num_vertices() as u64,
            dg.range_end(rank).unwrap() - dg.range_start(rank).unwrap()
        );
    }
    assert_eq!(local_edge_counts(&graphs), vec![4, 3, 22]);
    assert_reassembles(&graphs, &adjacency);
}

#[test]
fn balanced_load_isolates_heavy_vertex() {
    let adjacency = adjacency_from_degrees(&HEAVY_TAIL);
    let file = TempGraph::write("balanced", &adjacency);

    let graphs: Vec<_> = run_on_threads(3, |comm| load_dist_graph_balanced(&comm, file.path()))
        .into_iter()
        .map(Result::unwrap)
        .collect();

    for dg in &graphs {
        assert_eq!(dg.partition_table().unwrap().as_slice(), &[0, 8, 9, 10]);
    }
    let counts = local_edge_counts(&graphs);
    assert_eq!(counts, vec![8, 1, 20]);
    // ceil(29 / 3) + max degree
    assert!(counts.iter().all(|&c| c <= 10 + 20));
    assert_reassembles(&graphs, &adjacency);
}

#[test]
fn local_edges_keep_global_tails_and_weights() {
    let adjacency = adjacency_from_degrees(&[2, 3, 0, 1, 4, 2]);
    let file = TempGraph::write("tails", &adjacency);

    let graphs: Vec<_> = run_on_threads(2, |comm| load_dist_graph_naive(&comm, file.path()))
        .into_iter()
        .map(Result::unwrap)
        .collect();

    // rank 1 owns vertices 3..6
    let local = graphs[1].local_graph().unwrap();
    assert_eq!(local.edge_indices(), &[0, 1, 5, 7]);
    assert_eq!(local.edges_of(1).unwrap(), adjacency[4].as_slice());
    assert_eq!(local.degree(0).unwrap(), 1);
    assert_eq!(local.edges_of(0).unwrap()[0].tail, 4);
    assert_eq!(graphs[1].owner(local.edges_of(0).unwrap()[0].tail).unwrap(), 1);
    assert_eq!(graphs[1].owner(2).unwrap(), 0);
}

#[test]
fn strategies_agree_on_content() {
    let degrees: Vec<u64> = (0..40).map(|v| if v % 13 == 0 { 30 } else { v % 4 }).collect();
    let adjacency = adjacency_from_degrees(&degrees);
    let file = TempGraph::write("agree", &adjacency);

    for strategy in [PartitionStrategy::Naive, PartitionStrategy::Balanced] {
        let config = LoaderConfig::new(file.path()).with_strategy(strategy);
        let graphs: Vec<_> = run_on_threads(4, |comm| load_dist_graph(&comm, &config))
            .into_iter()
            .map(Result::unwrap)
            .collect();
        let vertices: usize = graphs
            .iter()
            .map(|dg| dg.local_graph().unwrap().num_vertices())
            .sum();
        assert_eq!(vertices, 40);
        assert_reassembles(&graphs, &adjacency);
    }
}

#[test]
fn balanced_beats_naive_on_skewed_graph() {
    let degrees = HEAVY_TAIL;
    let adjacency = adjacency_from_degrees(&degrees);
    let file = TempGraph::write("skew", &adjacency);

    let max_load = |strategy| {
        let config = LoaderConfig::new(file.path()).with_strategy(strategy).with_stats(true);
        run_on_threads(3, |comm| load_dist_graph(&comm, &config).unwrap())
            .iter()
            .map(|dg| dg.local_graph().unwrap().num_edges())
            .max()
            .unwrap()
    };
    assert!(max_load(PartitionStrategy::Balanced) < max_load(PartitionStrategy::Naive));
}

#[test]
fn more_ranks_than_vertices() {
    let adjacency = adjacency_from_degrees(&[3, 1]);
    let file = TempGraph::write("sparse-ranks", &adjacency);

    for strategy in [PartitionStrategy::Naive, PartitionStrategy::Balanced] {
        let config = LoaderConfig::new(file.path()).with_strategy(strategy);
        let graphs: Vec<_> = run_on_threads(4, |comm| load_dist_graph(&comm, &config))
            .into_iter()
            .map(Result::unwrap)
            .collect();
        for dg in &graphs {
            assert_eq!(dg.partition_table().unwrap().as_slice(), &[0, 1, 2, 2, 2]);
        }
        assert_eq!(local_edge_counts(&graphs), vec![3, 1, 0, 0]);
        assert_eq!(graphs[3].local_graph().unwrap().num_vertices(), 0);
    }
}

#[test]
fn empty_graph_loads_everywhere() {
    let file = TempGraph::write("empty", &[]);
    for strategy in [PartitionStrategy::Naive, PartitionStrategy::Balanced] {
        let config = LoaderConfig::new(file.path()).with_strategy(strategy);
        let graphs = run_on_threads(3, |comm| load_dist_graph(&comm, &config).unwrap());
        for dg in &graphs {
            assert_eq!(dg.partition_table().unwrap(), &PartitionTable::naive(0, 3).unwrap());
            assert_eq!(dg.local_graph().unwrap().num_edges(), 0);
        }
    }
}

#[test]
fn single_rank_load_owns_whole_graph() {
    let adjacency = adjacency_from_degrees(&[1, 2, 3]);
    let file = TempGraph::write("single", &adjacency);
    let dg = load_dist_graph_balanced(&NoComm, file.path()).unwrap();
    assert_eq!(dg.partition_table().unwrap().as_slice(), &[0, 3]);
    assert_eq!(dg.local_graph().unwrap().num_edges(), 6);
    assert_reassembles(std::slice::from_ref(&dg), &adjacency);
}

#[test]
fn missing_file_fails_on_every_rank() {
    let file = TempGraph::reserve("missing");
    let results = run_on_threads(3, |comm| load_dist_graph_balanced(&comm, file.path()));
    for r in results {
        assert!(matches!(r, Err(DistGraphError::Io { .. })));
    }
}

#[test]
fn truncated_file_fails_on_every_rank() {
    let file = TempGraph::write("truncated", &adjacency_from_degrees(&[2, 2, 2]));
    let bytes = std::fs::read(file.path()).unwrap();
    std::fs::write(file.path(), &bytes[..bytes.len() - 8]).unwrap();

    let results = run_on_threads(2, |comm| load_dist_graph_naive(&comm, file.path()));
    for r in results {
        assert!(matches!(r, Err(DistGraphError::CorruptGraphFile(_))));
    }
}

/// Overwrite edge-index entry `v` in place.
fn patch_offset(file: &TempGraph, v: usize, value: u64) {
    let mut bytes = std::fs::read(file.path()).unwrap();
    let at = 16 + v * 8;
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
    std::fs::write(file.path(), bytes).unwrap();
}

#[test]
fn corrupt_slice_on_one_rank_fails_the_others() {
    // offsets 0, 2, .., 20; rank 2 of 3 reads entries 7..=10
    let file = TempGraph::write("corrupt-slice", &adjacency_from_degrees(&[2; 10]));
    patch_offset(&file, 8, 19);

    let results = run_on_threads(3, |comm| {
        let rank = comm.rank();
        (rank, load_dist_graph_naive(&comm, file.path()))
    });
    for (rank, r) in results {
        match rank {
            2 => assert!(matches!(r, Err(DistGraphError::CorruptGraphFile(_)))),
            _ => assert_eq!(
                r.unwrap_err(),
                DistGraphError::PeerLoadFailed { failed_ranks: 1 }
            ),
        }
    }
}

#[test]
fn short_final_offset_fails_last_rank() {
    // entry 10 should be 20; only rank 2 of 3 reads it
    let file = TempGraph::write("short-end", &adjacency_from_degrees(&[2; 10]));
    patch_offset(&file, 10, 19);

    let results = run_on_threads(3, |comm| load_dist_graph_naive(&comm, file.path()));
    assert_eq!(
        results[2].as_ref().unwrap_err(),
        &DistGraphError::CorruptGraphFile("edge index ends at 19, expected 20".into())
    );
    for r in &results[..2] {
        assert_eq!(
            r.as_ref().unwrap_err(),
            &DistGraphError::PeerLoadFailed { failed_ranks: 1 }
        );
    }
}

#[test]
fn corrupt_index_fails_balancing_on_root() {
    let file = TempGraph::write("corrupt-root", &adjacency_from_degrees(&[2; 10]));
    patch_offset(&file, 3, 1);

    let results = run_on_threads(3, |comm| load_dist_graph_balanced(&comm, file.path()));
    assert!(matches!(results[0], Err(DistGraphError::CorruptGraphFile(_))));
    for r in &results[1..] {
        assert_eq!(
            r.as_ref().unwrap_err(),
            &DistGraphError::PeerLoadFailed { failed_ranks: 1 }
        );
    }
}

#[test]
fn invalid_config_is_rejected_before_io() {
    let config = LoaderConfig::new("never-read.bin").with_ranks_per_node(0);
    assert!(matches!(
        load_dist_graph(&NoComm, &config),
        Err(DistGraphError::InvalidConfig(_))
    ));
}
