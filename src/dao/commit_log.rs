//! Append-only commit log with per-version snapshots.
//!
//! The log is a JSON-lines file holding one [`CommitRecord`] per durable
//! mutation, next to a `snapshots/<version>/` directory capturing the exact
//! bytes of both store files after that mutation. Records are only appended;
//! rollback and sync replay snapshots forward instead of editing history.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::dao::{
    models::CommitRecord,
    storage::{StorageError, StorageResult},
};

const LOG_FILE: &str = "log.jsonl";
const SNAPSHOT_DIR: &str = "snapshots";
const SCHEDULE_FILE: &str = "schedule.json";
const OVERLAY_FILE: &str = "overlay.json";

/// Exact bytes of both store files as captured at one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPayload {
    /// Schedule file bytes; absent while no schedule has been ingested.
    pub schedule: Option<Vec<u8>>,
    /// Overlay file bytes.
    pub overlay: Vec<u8>,
}

impl SnapshotPayload {
    /// Hash of the schedule bytes, if present.
    pub fn schedule_sha256(&self) -> Option<String> {
        self.schedule.as_deref().map(sha256_hex)
    }

    /// Hash of the overlay bytes.
    pub fn overlay_sha256(&self) -> String {
        sha256_hex(&self.overlay)
    }
}

/// Durable, append-only sequence of [`CommitRecord`]s plus their snapshots.
#[derive(Debug, Clone)]
pub struct CommitLog {
    dir: PathBuf,
}

impl CommitLog {
    /// Open (creating if needed) the log rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(SNAPSHOT_DIR))
            .map_err(|source| StorageError::unavailable("creating commit log directory", source))?;
        Ok(Self { dir })
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn snapshot_dir(&self, version: u64) -> PathBuf {
        self.dir.join(SNAPSHOT_DIR).join(version.to_string())
    }

    /// All records in commit order, oldest first.
    pub fn records(&self) -> StorageResult<Vec<CommitRecord>> {
        let path = self.log_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::unavailable("reading commit log", err)),
        };

        let mut records = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            let record: CommitRecord = serde_json::from_str(line)
                .map_err(|err| StorageError::corrupt(&path, err))?;
            records.push(record);
        }
        Ok(records)
    }

    /// The most recent record, if any commit has ever been made.
    pub fn latest(&self) -> StorageResult<Option<CommitRecord>> {
        Ok(self.records()?.into_iter().next_back())
    }

    /// The record at `version`, if present.
    pub fn find(&self, version: u64) -> StorageResult<Option<CommitRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .find(|record| record.version == version))
    }

    /// The version the next commit will receive.
    pub fn next_version(&self) -> StorageResult<u64> {
        Ok(self.latest()?.map_or(1, |record| record.version + 1))
    }

    /// Append one record and flush it to disk before returning.
    pub fn append(&self, record: &CommitRecord) -> StorageResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|err| StorageError::corrupt(&self.log_path(), err))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .map_err(|source| StorageError::unavailable("opening commit log", source))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all())
            .map_err(|source| StorageError::unavailable("appending commit record", source))?;
        Ok(())
    }

    /// Persist the snapshot for `version`.
    pub fn write_snapshot(&self, version: u64, payload: &SnapshotPayload) -> StorageResult<()> {
        let dir = self.snapshot_dir(version);
        fs::create_dir_all(&dir)
            .map_err(|source| StorageError::unavailable("creating snapshot directory", source))?;

        if let Some(schedule) = &payload.schedule {
            write_atomic(&dir.join(SCHEDULE_FILE), schedule)?;
        }
        write_atomic(&dir.join(OVERLAY_FILE), &payload.overlay)?;
        Ok(())
    }

    /// Read back the snapshot captured at `version`.
    pub fn read_snapshot(&self, version: u64) -> StorageResult<SnapshotPayload> {
        let dir = self.snapshot_dir(version);

        let schedule = match fs::read(dir.join(SCHEDULE_FILE)) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(StorageError::unavailable("reading schedule snapshot", err)),
        };
        let overlay = fs::read(dir.join(OVERLAY_FILE))
            .map_err(|source| StorageError::unavailable("reading overlay snapshot", source))?;

        Ok(SnapshotPayload { schedule, overlay })
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write `bytes` to `path` through a temporary sibling and a rename, syncing
/// before the swap so a crash never leaves a half-written store file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("tmp");

    let mut file = fs::File::create(&tmp)
        .map_err(|source| StorageError::unavailable("creating temporary store file", source))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|source| StorageError::unavailable("writing store file", source))?;
    drop(file);

    fs::rename(&tmp, path)
        .map_err(|source| StorageError::unavailable("installing store file", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(version: u64) -> CommitRecord {
        CommitRecord {
            version,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            author: "race-ops".into(),
            message: format!("change {version}"),
            schedule_sha256: None,
            overlay_sha256: sha256_hex(b"{}"),
        }
    }

    #[test]
    fn empty_log_yields_no_records_and_version_one() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path()).unwrap();

        assert!(log.records().unwrap().is_empty());
        assert_eq!(log.latest().unwrap(), None);
        assert_eq!(log.next_version().unwrap(), 1);
    }

    #[test]
    fn appended_records_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path()).unwrap();

        log.append(&record(1)).unwrap();
        log.append(&record(2)).unwrap();

        let records = log.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record(1));
        assert_eq!(records[1], record(2));
        assert_eq!(log.latest().unwrap(), Some(record(2)));
        assert_eq!(log.next_version().unwrap(), 3);
        assert_eq!(log.find(1).unwrap(), Some(record(1)));
        assert_eq!(log.find(9).unwrap(), None);
    }

    #[test]
    fn snapshots_round_trip_with_and_without_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path()).unwrap();

        let bare = SnapshotPayload {
            schedule: None,
            overlay: br#"{"days":{}}"#.to_vec(),
        };
        log.write_snapshot(1, &bare).unwrap();
        assert_eq!(log.read_snapshot(1).unwrap(), bare);

        let full = SnapshotPayload {
            schedule: Some(br#"{"sessions":[]}"#.to_vec()),
            overlay: br#"{"days":{}}"#.to_vec(),
        };
        log.write_snapshot(2, &full).unwrap();
        assert_eq!(log.read_snapshot(2).unwrap(), full);
    }
}
