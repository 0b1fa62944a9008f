//! File-backed snapshot storage.
//!
//! Implements [`SnapshotStore`] as one directory per local calendar date
//! (`YYYY-MM-DD`) under the data directory, with one JSON document per
//! snapshot named `{blockHeight}_{epochSeconds}.json`. Files are written to a
//! temporary sibling and renamed into place, so readers never see a partial
//! document. Nothing is modified after it is written; the only deletion is a
//! whole partition removed by the [`RetentionManager`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};

use augur_core::constants::{ESTIMATION_WINDOW_SECS, PARTITION_DATE_FORMAT, SNAPSHOT_EXTENSION};
use augur_core::error::StoreError;
use augur_core::traits::SnapshotStore;
use augur_core::types::MempoolSnapshot;

use crate::retention::RetentionManager;

/// Date-partitioned JSON snapshot store.
///
/// When built with [`with_inline_retention`](Self::with_inline_retention),
/// every append ends with a retention sweep.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    data_dir: PathBuf,
    inline_retention: Option<RetentionManager>,
}

impl FileSnapshotStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|e| StoreError::io(&data_dir, e))?;
        Ok(Self {
            data_dir,
            inline_retention: None,
        })
    }

    /// Run `retention` at the end of every append.
    pub fn with_inline_retention(mut self, retention: RetentionManager) -> Self {
        self.inline_retention = Some(retention);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the snapshots captured on a local calendar date.
    pub fn partition_dir(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(date.format(PARTITION_DATE_FORMAT).to_string())
    }

    /// Final on-disk location of a snapshot.
    pub fn snapshot_path(&self, snapshot: &MempoolSnapshot) -> PathBuf {
        self.partition_dir(local_date(&snapshot.timestamp)).join(format!(
            "{}_{}.{}",
            snapshot.block_height,
            snapshot.timestamp.timestamp(),
            SNAPSHOT_EXTENSION
        ))
    }

    fn write_snapshot(&self, snapshot: &MempoolSnapshot) -> Result<PathBuf, StoreError> {
        let path = self.snapshot_path(snapshot);
        if let Some(partition) = path.parent() {
            fs::create_dir_all(partition).map_err(|e| StoreError::io(partition, e))?;
        }

        let body = serde_json::to_vec(snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"));
        fs::write(&tmp, &body).map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&path, e));
        }
        Ok(path)
    }

    /// Snapshots of one partition that fall inside `[start, end]`.
    fn read_partition(
        &self,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
        out: &mut Vec<MempoolSnapshot>,
    ) {
        let dir = self.partition_dir(date);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!(partition = %dir.display(), "failed to list partition: {e}");
                return;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(partition = %dir.display(), "failed to read directory entry: {e}");
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            match read_snapshot(&path) {
                Ok(Some(snapshot)) => {
                    let local = local_time(&snapshot.timestamp);
                    if local >= start && local <= end {
                        out.push(snapshot);
                    }
                }
                Ok(None) => debug!(file = %path.display(), "snapshot vanished before it was read"),
                Err(e) => warn!(file = %path.display(), "skipping unreadable snapshot: {e}"),
            }
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn append(&self, snapshot: &MempoolSnapshot) -> Result<(), StoreError> {
        let written = self.write_snapshot(snapshot);
        if let Ok(path) = &written {
            debug!(
                file = %path.display(),
                transactions = snapshot.transaction_count(),
                "snapshot written"
            );
        }

        if let Some(retention) = &self.inline_retention {
            retention.sweep();
        }

        written.map(|_| ())
    }

    fn range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<MempoolSnapshot>, StoreError> {
        let mut snapshots = Vec::new();
        if start > end {
            return Ok(snapshots);
        }

        let mut date = start.date();
        while date <= end.date() {
            self.read_partition(date, start, end, &mut snapshots);
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        snapshots.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.block_height.cmp(&b.block_height))
        });
        Ok(snapshots)
    }
}

/// Read and parse one snapshot file. `Ok(None)` means the file is gone.
fn read_snapshot(path: &Path) -> Result<Option<MempoolSnapshot>, StoreError> {
    let body = match fs::read(path) {
        Ok(body) => body,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Local calendar date of an instant.
pub fn local_date(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

/// Local wall-clock time of an instant.
pub fn local_time(timestamp: &DateTime<Utc>) -> NaiveDateTime {
    timestamp.with_timezone(&Local).naive_local()
}

/// Local `[end - ESTIMATION_WINDOW_SECS, end]` bounds for a range query.
///
/// `None` when the window start falls before the earliest representable instant.
pub fn trailing_window(end: &DateTime<Utc>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = end.checked_sub_signed(chrono::Duration::seconds(ESTIMATION_WINDOW_SECS))?;
    Some((local_time(&start), local_time(end)))
}
