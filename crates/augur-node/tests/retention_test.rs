//! Retention sweeps over a real directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use augur_node::retention::{RetentionManager, SweepReport};
use chrono::{Duration, NaiveDate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn partition(root: &Path, days_ago: i64, files: usize) -> PathBuf {
    let date = today() - Duration::days(days_ago);
    let dir = root.join(date.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir).unwrap();
    for i in 0..files {
        fs::write(dir.join(format!("{}_{}.json", 800_000 + i, i)), b"{}").unwrap();
    }
    dir
}

#[test]
fn keeps_horizon_and_deletes_older() {
    let dir = tempfile::tempdir().unwrap();
    let kept: Vec<PathBuf> = (0..=2).map(|d| partition(dir.path(), d, 1)).collect();
    let expired = partition(dir.path(), 3, 2);

    let report = RetentionManager::new(dir.path(), 2).sweep_at(today());

    assert_eq!(
        report,
        SweepReport { partitions_removed: 1, files_removed: 2, failures: 0 }
    );
    assert!(!expired.exists());
    for dir in kept {
        assert!(dir.exists(), "{} should survive", dir.display());
    }
}

#[test]
fn foreign_entries_are_never_touched() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes");
    fs::create_dir_all(&notes).unwrap();
    let loose = dir.path().join("2000-01-01");
    fs::write(&loose, b"a file named like a partition").unwrap();
    let readme = dir.path().join("README.txt");
    fs::write(&readme, b"hi").unwrap();
    let bogus_date = dir.path().join("2024-13-45");
    fs::create_dir_all(&bogus_date).unwrap();

    let report = RetentionManager::new(dir.path(), 1).sweep_at(today());

    assert_eq!(report, SweepReport::default());
    assert!(notes.is_dir());
    assert!(loose.is_file());
    assert!(readme.is_file());
    assert!(bogus_date.is_dir());
}

#[test]
fn non_positive_retention_deletes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ancient = partition(dir.path(), 3_650, 3);

    for days in [0, -1, -30] {
        let report = RetentionManager::new(dir.path(), days).sweep_at(today());
        assert_eq!(report, SweepReport::default());
    }
    assert!(ancient.exists());
}

#[test]
fn sweep_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    for d in 0..10 {
        partition(dir.path(), d, 1);
    }
    let manager = RetentionManager::new(dir.path(), 5);

    let first = manager.sweep_at(today());
    let second = manager.sweep_at(today());
    assert_eq!(first.partitions_removed, 4);
    assert_eq!(second, SweepReport::default());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 6);
}
