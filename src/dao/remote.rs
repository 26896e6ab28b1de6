//! Remote counterpart of the commit log, consumed by `sync`.
//!
//! The remote is treated as an opaque, fast-forward-capable mirror: the
//! gateway only ever reads its full history, fetches snapshots by version,
//! and appends records the remote does not have yet. Divergence handling
//! lives in the gateway, not here.

use futures::future::BoxFuture;

use crate::dao::{
    commit_log::{CommitLog, SnapshotPayload},
    models::CommitRecord,
    storage::StorageResult,
};

/// Abstraction over the remote commit-log mirror.
pub trait RemoteLog: Send + Sync {
    /// Full remote history, oldest first.
    fn fetch_records(&self) -> BoxFuture<'_, StorageResult<Vec<CommitRecord>>>;
    /// Snapshot bytes captured at `version` on the remote.
    fn fetch_snapshot(&self, version: u64) -> BoxFuture<'_, StorageResult<SnapshotPayload>>;
    /// Append `records` (with their snapshots) to the remote history.
    fn push(
        &self,
        records: Vec<(CommitRecord, SnapshotPayload)>,
    ) -> BoxFuture<'_, StorageResult<()>>;
}

/// Remote mirror backed by a directory sharing the commit-log layout, e.g. a
/// mounted checkout of the data repository.
#[derive(Debug, Clone)]
pub struct DirectoryRemote {
    log: CommitLog,
}

impl DirectoryRemote {
    /// Open (creating if needed) the mirror rooted at `dir`.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> StorageResult<Self> {
        Ok(Self {
            log: CommitLog::open(dir)?,
        })
    }
}

impl RemoteLog for DirectoryRemote {
    fn fetch_records(&self) -> BoxFuture<'_, StorageResult<Vec<CommitRecord>>> {
        Box::pin(async move { self.log.records() })
    }

    fn fetch_snapshot(&self, version: u64) -> BoxFuture<'_, StorageResult<SnapshotPayload>> {
        Box::pin(async move { self.log.read_snapshot(version) })
    }

    fn push(
        &self,
        records: Vec<(CommitRecord, SnapshotPayload)>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            // Snapshots land before their records so the remote never lists a
            // commit whose payload is missing.
            for (record, snapshot) in &records {
                self.log.write_snapshot(record.version, snapshot)?;
            }
            for (record, _) in &records {
                self.log.append(record)?;
            }
            Ok(())
        })
    }
}
