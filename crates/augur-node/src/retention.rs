//! Age-based pruning of snapshot partitions.
//!
//! A partition is a direct child directory of the data directory whose name
//! parses as a `YYYY-MM-DD` local calendar date. A sweep removes every
//! partition dated strictly before `today - retention_days`; anything it
//! cannot date (other directories, plain files) is left alone.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};
use tracing::{debug, info, warn};

use augur_core::constants::PARTITION_DATE_FORMAT;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub partitions_removed: usize,
    pub files_removed: usize,
    /// Entries that could not be inspected or deleted.
    pub failures: usize,
}

/// Deletes expired snapshot partitions.
#[derive(Debug, Clone)]
pub struct RetentionManager {
    data_dir: PathBuf,
    retention_days: i64,
}

impl RetentionManager {
    /// `retention_days <= 0` disables pruning.
    pub fn new(data_dir: impl AsRef<Path>, retention_days: i64) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            retention_days,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.retention_days > 0
    }

    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// Oldest partition date that survives a sweep run on `today`.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        if !self.is_enabled() {
            return None;
        }
        today.checked_sub_signed(Duration::days(self.retention_days))
    }

    /// Sweep relative to the current local date.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Local::now().date_naive())
    }

    /// Sweep relative to an explicit local date.
    pub fn sweep_at(&self, today: NaiveDate) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = self.cutoff(today) else {
            return report;
        };

        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(data_dir = %self.data_dir.display(), "retention sweep cannot list data dir: {e}");
                report.failures += 1;
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("retention sweep skipped an entry: {e}");
                    report.failures += 1;
                    continue;
                }
            };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|n| NaiveDate::parse_from_str(n, PARTITION_DATE_FORMAT).ok())
            else {
                debug!(dir = ?name, "ignoring non-partition directory");
                continue;
            };
            if date >= cutoff {
                continue;
            }

            let path = entry.path();
            let files = count_files(&path);
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    report.partitions_removed += 1;
                    report.files_removed += files;
                    debug!(partition = %path.display(), files, "partition removed");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(partition = %path.display(), "failed to remove partition: {e}");
                    report.failures += 1;
                }
            }
        }

        if report.partitions_removed > 0 || report.failures > 0 {
            info!(
                %cutoff,
                partitions = report.partitions_removed,
                files = report.files_removed,
                failures = report.failures,
                "retention sweep finished"
            );
        }
        report
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| match entry.file_type() {
            Ok(t) if t.is_dir() => count_files(&entry.path()),
            Ok(_) => 1,
            Err(_) => 0,
        })
        .sum()
}
