//! Epoch log behaviour against a real directory

use std::fs;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use herdstore::epoch::{EpochLog, NodeDescriptor, NODE_RECORD_SIZE};
use herdstore::store::StorePaths;
use herdstore::Error;

fn members(n: u8) -> Vec<NodeDescriptor> {
    (1..=n)
        .map(|i| {
            NodeDescriptor::new(format!("192.168.0.{}:7000", i).parse().unwrap())
                .with_vnodes(128)
                .with_zone(u32::from(i % 3))
                .with_space(u64::from(i) << 30)
        })
        .collect()
}

#[test]
fn test_latest_epoch_ignores_foreign_files() {
    let dir = TempDir::new().unwrap();
    let log = EpochLog::new(dir.path());

    for epoch in [1, 3, 7] {
        log.record_epoch(epoch, &members(2)).unwrap();
    }
    fs::write(dir.path().join("README"), b"not an epoch").unwrap();
    assert_eq!(log.latest_epoch().unwrap(), 7);

    fs::write(dir.path().join("abc"), b"").unwrap();
    fs::write(dir.path().join("0000000x"), b"").unwrap();
    fs::write(dir.path().join("000000099"), b"").unwrap();
    assert_eq!(log.latest_epoch().unwrap(), 7);
    assert_eq!(log.epochs().unwrap(), vec![1, 3, 7]);
}

#[test]
fn test_round_trip_with_timestamp() {
    let dir = TempDir::new().unwrap();
    let log = EpochLog::new(dir.path());
    let nodes = members(6);
    let at = Utc.with_ymd_and_hms(2023, 11, 2, 8, 15, 42).unwrap();

    log.record_epoch_at(12, &nodes, at).unwrap();

    let mut out = vec![NodeDescriptor::default(); 16];
    let (count, created_at) = log.read_epoch_with_timestamp(12, &mut out).unwrap();
    assert_eq!(count, 6);
    assert_eq!(&out[..count], &nodes[..]);
    assert_eq!(created_at, at);

    // reserved slot is always persisted as zeros
    let raw = fs::read(log.path_for(12)).unwrap();
    for record in raw[..count * NODE_RECORD_SIZE].chunks(NODE_RECORD_SIZE) {
        assert!(record[..24].iter().all(|&b| b == 0));
    }
}

#[test]
fn test_current_time_persisted_to_the_second() {
    let dir = TempDir::new().unwrap();
    let log = EpochLog::new(dir.path());

    let before = Utc::now().timestamp();
    log.record_epoch(1, &members(1)).unwrap();
    let after = Utc::now().timestamp();

    let record = log.read(1).unwrap();
    let ts = record.created_at.timestamp();
    assert!(before <= ts && ts <= after);
}

#[test]
fn test_buffer_too_small() {
    let dir = TempDir::new().unwrap();
    let log = EpochLog::new(dir.path());
    log.record_epoch(2, &members(5)).unwrap();

    let mut out = vec![NodeDescriptor::default(); 4];
    let err = log.read_epoch(2, &mut out).unwrap_err();
    assert_matches!(err, Error::BufferTooSmall { needed: 5, capacity: 4 });
    assert!(out.iter().all(|n| *n == NodeDescriptor::default()));

    let mut exact = vec![NodeDescriptor::default(); 5];
    assert_eq!(log.read_epoch(2, &mut exact).unwrap(), 5);
}

#[test]
fn test_store_layout_hosts_epoch_log() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("node");
    let paths = StorePaths::init(&base, &base.to_string_lossy()).unwrap();

    let log = EpochLog::new(paths.epoch_dir());
    assert_eq!(log.latest_epoch().unwrap(), 0);
    log.record_epoch(1, &members(3)).unwrap();
    assert_eq!(log.latest_epoch().unwrap(), 1);
    assert!(base.join("epoch").join("00000001").is_file());
}

#[test]
fn test_json_rendering() {
    let dir = TempDir::new().unwrap();
    let log = EpochLog::new(dir.path());
    log.record_epoch(4, &members(2)).unwrap();

    let record = log.read(4).unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["epoch"], 4);
    assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(json["nodes"][0]["addr"], "192.168.0.1");
}
