//! End-to-end tests for the Augur pipeline.
//!
//! Each test wires a service over a scratch data directory and a scripted
//! mempool source, then drives collection ticks and queries directly.

use std::sync::Arc;

use augur_core::error::RpcError;
use augur_core::traits::SnapshotStore;
use augur_node::config::RetentionMode;
use augur_node::retention::RetentionManager;
use augur_node::AugurService;
use augur_tests::helpers::*;
use chrono::{Duration, Local, SubsecRound, Utc};

fn service(source: ScriptedSource) -> (AugurService, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let service = AugurService::with_source(
        config(dir.path(), RetentionMode::Scheduled, 30),
        Arc::new(source),
    )
    .unwrap();
    (service, dir)
}

#[tokio::test]
async fn first_tick_populates_latest_estimate() {
    let (service, _dir) = service(ScriptedSource::constant(
        850_000,
        mempool(&[1, 2, 5, 10, 20, 50], 2_000),
    ));
    let queries = service.queries();
    assert!(queries.latest_estimate().is_none());

    service.collector().tick().await.unwrap();

    let latest = queries.latest_estimate().expect("estimate after first tick");
    assert!(!latest.is_empty());
    assert_eq!(latest.targets().count(), 11);

    let partition = service
        .store()
        .partition_dir(Local::now().date_naive());
    let files = std::fs::read_dir(partition).unwrap().count();
    assert_eq!(files, 1);
}

#[tokio::test]
async fn estimates_are_monotone() {
    let (service, _dir) = service(ScriptedSource::constant(
        850_000,
        mempool(&[1, 2, 5, 10, 20, 50, 100], 2_000),
    ));
    service.collector().tick().await.unwrap();
    let latest = service.queries().latest_estimate().unwrap();

    for block_target in latest.estimates.values() {
        let rates: Vec<f64> = block_target.probabilities.values().copied().collect();
        assert!(rates.windows(2).all(|w| w[0] <= w[1]), "{rates:?}");
        assert!(rates.iter().all(|r| *r >= 1.0));
    }

    // Without inflow, a longer horizon never needs a higher fee.
    let targets: Vec<f64> = latest.targets().collect();
    for pair in targets.windows(2) {
        let near = latest.fee_rate(pair[0], 0.5).unwrap();
        let far = latest.fee_rate(pair[1], 0.5).unwrap();
        assert!(far <= near, "target {} = {near}, target {} = {far}", pair[0], pair[1]);
    }
}

#[tokio::test]
async fn failing_source_keeps_last_estimate() {
    let source = ScriptedSource::new(vec![
        Ok((850_000, mempool(&[3, 30], 100))),
        Err(RpcError::MempoolNotLoaded),
        Err(RpcError::Transport("connection refused".into())),
    ]);
    let (service, _dir) = service(source);
    let queries = service.queries();

    service.collector().tick().await.unwrap();
    let first = queries.latest_estimate().unwrap();

    assert!(service.collector().tick().await.is_err());
    assert!(service.collector().tick().await.is_err());
    assert_eq!(*queries.latest_estimate().unwrap(), *first);
}

#[tokio::test]
async fn target_query_reflects_stored_snapshots() {
    let (service, _dir) = service(ScriptedSource::constant(1, mempool(&[8], 10)));
    let queries = service.queries();

    assert!(queries.latest_estimate_for_target(6.0).await.unwrap().is_empty());

    service.collector().tick().await.unwrap();
    let estimate = queries.latest_estimate_for_target(6.0).await.unwrap();
    assert_eq!(estimate.targets().collect::<Vec<_>>(), vec![6.0]);
    assert!(queries.latest_estimate_for_target(2.5).await.unwrap().fee_rate(2.5, 0.5).is_some());
}

#[tokio::test]
async fn historical_queries_see_only_past_snapshots() {
    let (service, _dir) = service(ScriptedSource::constant(1, Vec::new()));
    let queries = service.queries();
    let now = Utc::now();
    let store = service.store();
    for (i, minutes_ago) in [180, 120, 60].into_iter().enumerate() {
        store
            .append(&snapshot(
                850_000 + i as u64,
                now - Duration::minutes(minutes_ago),
                mempool(&[2, 4, 8], 50),
            ))
            .unwrap();
    }

    let before = queries
        .estimate_at_timestamp((now - Duration::minutes(200)).timestamp())
        .await
        .unwrap();
    assert!(before.is_empty());

    let at = now - Duration::minutes(90);
    let mid = queries.estimate_at_timestamp(at.timestamp()).await.unwrap();
    assert!(!mid.is_empty());
    assert_eq!(mid.timestamp, (now - Duration::minutes(120)).trunc_subsecs(3));
}

#[tokio::test]
async fn range_query_skips_empty_steps() {
    let (service, _dir) = service(ScriptedSource::constant(1, Vec::new()));
    let queries = service.queries();
    let now = Utc::now().timestamp();
    service
        .store()
        .append(&snapshot(
            850_000,
            Utc::now() - Duration::minutes(125),
            mempool(&[5], 20),
        ))
        .unwrap();

    let start = now - 4 * 3_600;
    let results = queries
        .estimates_over_range(start, now, 3_600)
        .await
        .unwrap()
        .expect("later steps see the snapshot");
    // Steps at -4h and -3h precede the snapshot; -2h and -1h include it.
    assert_eq!(results.len(), 2);
    assert!(results.len() as i64 <= (now - start + 3_599) / 3_600);
    assert!(results.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    assert!(queries.estimates_over_range(start, start - 1, 60).await.unwrap().is_none());
    assert!(queries.estimates_over_range(start, now, 0).await.unwrap().is_none());
    assert!(queries
        .estimates_over_range(1_600_000_000, 1_600_010_000, 3_600)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn inline_retention_prunes_during_collection() {
    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();
    let dated = |days: i64| {
        let path = dir
            .path()
            .join((today - Duration::days(days)).format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("1_1.json"), b"{}").unwrap();
        path
    };
    let kept = [dated(1), dated(2)];
    let expired = dated(3);

    let service = AugurService::with_source(
        config(dir.path(), RetentionMode::Inline, 2),
        Arc::new(ScriptedSource::constant(7, mempool(&[1], 1))),
    )
    .unwrap();
    service.collector().tick().await.unwrap();

    assert!(!expired.exists());
    assert!(kept.iter().all(|p| p.exists()));
    assert!(service.store().partition_dir(today).is_dir());
}

#[test]
fn retention_scenario_with_two_day_horizon() {
    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();
    let dirs: Vec<_> = (0..=3)
        .map(|d| {
            let p = dir
                .path()
                .join((today - Duration::days(d)).format("%Y-%m-%d").to_string());
            std::fs::create_dir_all(&p).unwrap();
            p
        })
        .collect();
    std::fs::write(dir.path().join("stray.json"), b"{}").unwrap();
    std::fs::create_dir_all(dir.path().join("backups")).unwrap();

    let report = RetentionManager::new(dir.path(), 2).sweep();

    assert_eq!(report.partitions_removed, 1);
    assert!(dirs[..3].iter().all(|p| p.exists()));
    assert!(!dirs[3].exists());
    assert!(dir.path().join("stray.json").exists());
    assert!(dir.path().join("backups").exists());
}

#[tokio::test]
async fn scripted_source_repeats_last_state() {
    let source = ScriptedSource::new(vec![Ok((1, Vec::new())), Ok((2, Vec::new()))]);
    let (service, _dir) = service(source);
    for _ in 0..3 {
        service.collector().tick().await.unwrap();
    }
    let now = Utc::now();
    let stored = service
        .store()
        .range(
            augur_node::storage::local_time(&(now - Duration::minutes(5))),
            augur_node::storage::local_time(&now),
        )
        .unwrap();
    let heights: Vec<u64> = stored.iter().map(|s| s.block_height).collect();
    assert_eq!(heights.first(), Some(&1));
    assert_eq!(heights.last(), Some(&2));
}
