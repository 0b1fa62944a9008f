//! Snapshot store behaviour through the public `SnapshotStore` API.

use augur_core::traits::SnapshotStore;
use augur_core::types::{MempoolSnapshot, MempoolTransaction};
use augur_node::storage::{local_time, FileSnapshotStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn snapshot(height: u64, timestamp: DateTime<Utc>) -> MempoolSnapshot {
    MempoolSnapshot::new(
        height,
        timestamp,
        vec![
            MempoolTransaction::new(561, 1_410),
            MempoolTransaction::new(1_000, 12_000),
        ],
    )
}

fn store() -> (FileSnapshotStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::open(dir.path()).unwrap();
    (store, dir)
}

#[test]
fn three_snapshots_ten_seconds_apart() {
    let (store, _dir) = store();
    let t = base_time();
    let appended: Vec<MempoolSnapshot> = (0..3)
        .map(|i| snapshot(850_000 + i, t + Duration::seconds(10 * i as i64)))
        .collect();
    for s in &appended {
        store.append(s).unwrap();
    }

    let all = store
        .range(
            local_time(&(t - Duration::hours(1))),
            local_time(&(t + Duration::hours(1))),
        )
        .unwrap();
    assert_eq!(all, appended);

    let later = store
        .range(
            local_time(&(t + Duration::seconds(30))),
            local_time(&(t + Duration::hours(1))),
        )
        .unwrap();
    assert!(later.is_empty());
}

#[test]
fn range_is_idempotent() {
    let (store, _dir) = store();
    let t = base_time();
    for i in 0..5 {
        store.append(&snapshot(i, t + Duration::minutes(i as i64))).unwrap();
    }
    let (start, end) = (
        local_time(&(t - Duration::minutes(1))),
        local_time(&(t + Duration::minutes(3))),
    );

    let first = store.range(start, end).unwrap();
    let second = store.range(start, end).unwrap();
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

#[test]
fn persisted_document_layout() {
    let (store, _dir) = store();
    let ts = Utc.timestamp_millis_opt(1_718_452_800_123).unwrap();
    let s = MempoolSnapshot::new(850_001, ts, vec![MempoolTransaction::new(400, 1_000)]);
    store.append(&s).unwrap();

    let body = std::fs::read_to_string(store.snapshot_path(&s)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["blockHeight"], 850_001);
    assert_eq!(json["timestamp"], "2024-06-15T12:00:00.123Z");
    assert_eq!(json["transactions"][0]["weight"], 400);
    assert_eq!(json["transactions"][0]["fee"], 1_000);
}

#[test]
fn same_second_ties_break_by_height() {
    let (store, _dir) = store();
    let t = base_time();
    store.append(&snapshot(11, t)).unwrap();
    store.append(&snapshot(10, t)).unwrap();

    let found = store.range(local_time(&t), local_time(&t)).unwrap();
    let heights: Vec<u64> = found.iter().map(|s| s.block_height).collect();
    assert_eq!(heights, vec![10, 11]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn range_returns_exactly_the_covered_snapshots(
        offsets in prop::collection::vec(0i64..172_800_000, 1..12),
        lo in 0i64..172_800_000,
        span in 0i64..172_800_000,
    ) {
        let (store, _dir) = store();
        let t = base_time();
        let appended: Vec<MempoolSnapshot> = offsets
            .iter()
            .enumerate()
            .map(|(i, ms)| snapshot(i as u64, t + Duration::milliseconds(*ms)))
            .collect();
        for s in &appended {
            store.append(s).unwrap();
        }

        let start = local_time(&(t + Duration::milliseconds(lo)));
        let end = local_time(&(t + Duration::milliseconds(lo + span)));
        let found = store.range(start, end).unwrap();

        let mut expected: Vec<MempoolSnapshot> = appended
            .into_iter()
            .filter(|s| {
                let local = local_time(&s.timestamp);
                local >= start && local <= end
            })
            .collect();
        expected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.block_height.cmp(&b.block_height)));

        prop_assert_eq!(found, expected);
    }
}
