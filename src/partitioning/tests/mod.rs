use super::*;

#[test]
fn naive_spreads_remainder_over_low_ranks() {
    let table = PartitionTable::naive(10, 3).unwrap();
    assert_eq!(table.as_slice(), &[0, 4, 7, 10]);
    assert_eq!(table.num_parts(), 3);
    assert_eq!(table.total_vertices(), 10);
    assert_eq!(table.part_len(0).unwrap(), 4);
    assert_eq!(table.range(2).unwrap(), 7..10);
}

#[test]
fn naive_with_more_ranks_than_vertices() {
    let table = PartitionTable::naive(2, 4).unwrap();
    assert_eq!(table.as_slice(), &[0, 1, 2, 2, 2]);
    assert_eq!(table.owner(1).unwrap(), 1);
}

#[test]
fn naive_rejects_zero_parts() {
    assert_eq!(PartitionTable::naive(10, 0).unwrap_err(), DistGraphError::ZeroParts);
}

#[test]
fn owner_uses_half_open_ranges() {
    let table = PartitionTable::from_bounds(vec![0, 4, 7, 10]).unwrap();
    let owners: Vec<_> = (0..10).map(|v| table.owner(v).unwrap()).collect();
    assert_eq!(owners, vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2]);
}

#[test]
fn owner_skips_empty_ranges() {
    let table = PartitionTable::from_bounds(vec![0, 3, 3, 3, 5]).unwrap();
    assert_eq!(table.owner(2).unwrap(), 0);
    assert_eq!(table.owner(3).unwrap(), 3);
    assert_eq!(table.owner(4).unwrap(), 3);
}

#[test]
fn owner_rejects_vertex_past_the_end() {
    let table = PartitionTable::naive(10, 3).unwrap();
    assert_eq!(
        table.owner(10).unwrap_err(),
        DistGraphError::VertexOutOfRange { vertex: 10, total: 10 }
    );
    assert!(table.owner(u64::MAX).is_err());
}

#[test]
fn range_accessors_reject_bad_rank() {
    let table = PartitionTable::naive(10, 3).unwrap();
    assert_eq!(table.start(2).unwrap(), 7);
    assert_eq!(table.end(2).unwrap(), 10);
    assert_eq!(
        table.start(3).unwrap_err(),
        DistGraphError::RankOutOfRange { rank: 3, parts: 3 }
    );
}

#[test]
fn from_bounds_validates() {
    assert_eq!(
        PartitionTable::from_bounds(vec![]).unwrap_err(),
        DistGraphError::EmptyPartitionTable
    );
    assert_eq!(
        PartitionTable::from_bounds(vec![0]).unwrap_err(),
        DistGraphError::ZeroParts
    );
    assert!(matches!(
        PartitionTable::from_bounds(vec![1, 4]),
        Err(DistGraphError::InvalidPartitionTable(_))
    ));
    assert!(matches!(
        PartitionTable::from_bounds(vec![0, 5, 3]),
        Err(DistGraphError::InvalidPartitionTable(_))
    ));
}

#[test]
fn ranges_iterates_every_rank() {
    let table = PartitionTable::from_bounds(vec![0, 2, 2, 6]).unwrap();
    let got: Vec<_> = table.ranges().collect();
    assert_eq!(got, vec![(0, 0..2), (1, 2..2), (2, 2..6)]);
}

#[test]
fn strategy_round_trips_through_serde() {
    let json = serde_json::to_string(&PartitionStrategy::Balanced).unwrap();
    assert_eq!(json, "\"balanced\"");
    let back: PartitionStrategy = serde_json::from_str("\"naive\"").unwrap();
    assert_eq!(back, PartitionStrategy::Naive);
}

#[test]
fn deserialized_tables_are_validated() {
    let table: PartitionTable = serde_json::from_str(r#"{"bounds":[0,4,7,10]}"#).unwrap();
    assert_eq!(table, PartitionTable::naive(10, 3).unwrap());
    assert_eq!(serde_json::to_string(&table).unwrap(), r#"{"bounds":[0,4,7,10]}"#);

    for bad in [
        r#"{"bounds":[0,7,3,10]}"#,
        r#"{"bounds":[2,4,10]}"#,
        r#"{"bounds":[0]}"#,
        r#"{"bounds":[]}"#,
    ] {
        assert!(
            serde_json::from_str::<PartitionTable>(bad).is_err(),
            "accepted {bad}"
        );
    }
}
