//! Versioned persistence gateway.
//!
//! Every mutation of the schedule or overlay store funnels through here: the
//! change is applied to an in-memory copy, both store files plus a per-version
//! snapshot are written durably, and only then is the commit record appended.
//! A crash between the file writes and the append leaves files that no record
//! accounts for; [`PersistenceGateway::open`] detects that by comparing file
//! hashes against the last record and restores the last committed snapshot,
//! so a commit is never half-visible.
//!
//! One async mutex serializes mutations end to end (in-memory update plus
//! durable write), which keeps store versions and the log in lockstep under
//! concurrent callers. Readers only ever take snapshot clones.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::dao::{
    commit_log::{CommitLog, SnapshotPayload, sha256_hex, write_atomic},
    models::{CommitRecord, ConfigurationOverlay, OverlayPatch, ScheduleDocument},
    overlay_store::ConfigurationOverlayStore,
    remote::RemoteLog,
    schedule_store::{ReplaceError, ScheduleDocumentStore},
    storage::{StorageError, StorageResult},
};

const SCHEDULE_FILE: &str = "schedule.json";
const OVERLAY_FILE: &str = "overlay.json";
const COMMITS_DIR: &str = "commits";

/// Error raised by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Schedule replacement refused (invalid document or stale version).
    #[error(transparent)]
    Replace(#[from] ReplaceError),
    /// Rollback target does not exist in the log.
    #[error("unknown commit version {requested} (latest is {latest})")]
    UnknownVersion {
        /// Version the caller asked for.
        requested: u64,
        /// Most recent version the log holds.
        latest: u64,
    },
    /// Local and remote histories disagree about an already-committed version.
    #[error("local and remote histories diverge at version {version}")]
    DivergedHistory {
        /// First version at which the histories disagree.
        version: u64,
    },
    /// The durable layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a fast-forward sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Commits copied from the remote into the local log.
    pub pulled: usize,
    /// Commits copied from the local log to the remote.
    pub pushed: usize,
}

/// Owns both stores, their files, and the commit log.
#[derive(Debug)]
pub struct PersistenceGateway {
    schedule_path: PathBuf,
    overlay_path: PathBuf,
    schedule: ScheduleDocumentStore,
    overlay: ConfigurationOverlayStore,
    log: CommitLog,
    write_gate: Mutex<()>,
}

impl PersistenceGateway {
    /// Open the gateway rooted at `data_dir`, recovering from any interrupted
    /// commit before the stores become visible.
    pub fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .map_err(|source| StorageError::unavailable("creating data directory", source))?;

        let schedule_path = data_dir.join(SCHEDULE_FILE);
        let overlay_path = data_dir.join(OVERLAY_FILE);
        let log = CommitLog::open(data_dir.join(COMMITS_DIR))?;

        recover(&log, &schedule_path, &overlay_path)?;

        let schedule = match read_optional(&schedule_path)? {
            Some(bytes) => Some(
                serde_json::from_slice::<ScheduleDocument>(&bytes)
                    .map_err(|err| StorageError::corrupt(&schedule_path, err))?,
            ),
            None => None,
        };
        let overlay = match read_optional(&overlay_path)? {
            Some(bytes) => serde_json::from_slice::<ConfigurationOverlay>(&bytes)
                .map_err(|err| StorageError::corrupt(&overlay_path, err))?,
            None => ConfigurationOverlay::default(),
        };

        Ok(Self {
            schedule_path,
            overlay_path,
            schedule: ScheduleDocumentStore::new(schedule),
            overlay: ConfigurationOverlayStore::new(overlay),
            log,
            write_gate: Mutex::new(()),
        })
    }

    /// The schedule document store.
    pub fn schedule(&self) -> &ScheduleDocumentStore {
        &self.schedule
    }

    /// The configuration overlay store.
    pub fn overlay(&self) -> &ConfigurationOverlayStore {
        &self.overlay
    }

    /// Most recent commit version; 0 while the log is empty.
    pub async fn last_version(&self) -> StorageResult<u64> {
        Ok(self.log.latest()?.map_or(0, |record| record.version))
    }

    /// Apply an overlay patch and commit the result.
    pub async fn apply_overlay_patch(
        &self,
        patch: &OverlayPatch,
        author: &str,
        message: &str,
    ) -> Result<(CommitRecord, ConfigurationOverlay), GatewayError> {
        let _gate = self.write_gate.lock().await;

        let version = self.log.next_version()?;
        let now = Utc::now();
        let mut overlay = self.overlay.load().await;
        overlay.apply(patch, author, version, now);

        let schedule = self.schedule.load().await;
        let record =
            self.commit_models(schedule.as_deref(), &overlay, version, author, message, now)?;
        self.overlay.install(overlay.clone()).await;

        info!(version, author, "committed overlay patch");
        Ok((record, overlay))
    }

    /// Reset the overlay to its documented default (no configured days).
    pub async fn reset_overlay(&self, author: &str) -> Result<CommitRecord, GatewayError> {
        let _gate = self.write_gate.lock().await;

        let version = self.log.next_version()?;
        let now = Utc::now();
        let mut overlay = self.overlay.load().await;
        overlay.reset(author, version, now);

        let schedule = self.schedule.load().await;
        let record = self.commit_models(
            schedule.as_deref(),
            &overlay,
            version,
            author,
            "reset overlay to defaults",
            now,
        )?;
        self.overlay.install(overlay).await;

        info!(version, author, "committed overlay reset");
        Ok(record)
    }

    /// Replace the schedule document wholesale and commit the result.
    ///
    /// `expected_version` must match the version of the document currently
    /// held; the incoming document is stamped with the new commit version.
    pub async fn replace_schedule(
        &self,
        mut doc: ScheduleDocument,
        expected_version: u64,
        author: &str,
        message: &str,
    ) -> Result<CommitRecord, GatewayError> {
        let _gate = self.write_gate.lock().await;

        self.schedule.check_replace(&doc, expected_version).await?;

        let version = self.log.next_version()?;
        let now = Utc::now();
        doc.version = version;

        let overlay = self.overlay.load().await;
        let record = self.commit_models(Some(&doc), &overlay, version, author, message, now)?;
        self.schedule.install(Some(doc)).await;

        info!(version, author, "committed schedule replacement");
        Ok(record)
    }

    /// Commit history, most recent first, bounded by `limit`.
    pub async fn history(&self, limit: usize) -> Result<Vec<CommitRecord>, GatewayError> {
        let mut records = self.log.records()?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    /// Restore both stores to the state captured at `target_version`.
    ///
    /// Rollback is a new forward commit pointing at old content; history only
    /// ever grows.
    pub async fn rollback(
        &self,
        target_version: u64,
        author: &str,
    ) -> Result<CommitRecord, GatewayError> {
        let _gate = self.write_gate.lock().await;

        let latest = self.log.latest()?.map_or(0, |record| record.version);
        if self.log.find(target_version)?.is_none() {
            return Err(GatewayError::UnknownVersion {
                requested: target_version,
                latest,
            });
        }

        let snapshot = self.log.read_snapshot(target_version)?;
        let (schedule, overlay) = parse_snapshot(&snapshot)?;

        let version = latest + 1;
        let message = format!("rollback to version {target_version}");
        let record =
            self.commit_snapshot(snapshot, version, author, &message, Utc::now())?;

        self.schedule.install(schedule).await;
        self.overlay.install(overlay).await;

        info!(version, target_version, author, "committed rollback");
        Ok(record)
    }

    /// Fast-forward sync against `remote`.
    ///
    /// Whichever side is strictly behind receives the other's missing commits;
    /// histories that disagree about an already-committed version fail with
    /// [`GatewayError::DivergedHistory`] and leave both sides untouched.
    pub async fn sync(&self, remote: &dyn RemoteLog) -> Result<SyncOutcome, GatewayError> {
        let _gate = self.write_gate.lock().await;

        let local = self.log.records()?;
        let remote_records = remote.fetch_records().await?;

        for (ours, theirs) in local.iter().zip(remote_records.iter()) {
            if ours != theirs {
                return Err(GatewayError::DivergedHistory {
                    version: ours.version,
                });
            }
        }

        if remote_records.len() > local.len() {
            let missing = &remote_records[local.len()..];
            let mut last_snapshot = None;
            for record in missing {
                let snapshot = remote.fetch_snapshot(record.version).await?;
                self.log.write_snapshot(record.version, &snapshot)?;
                self.log.append(record)?;
                last_snapshot = Some(snapshot);
            }

            if let Some(snapshot) = last_snapshot {
                let (schedule, overlay) = parse_snapshot(&snapshot)?;
                self.write_current(&snapshot)?;
                self.schedule.install(schedule).await;
                self.overlay.install(overlay).await;
            }

            info!(pulled = missing.len(), "pulled commits from remote");
            return Ok(SyncOutcome {
                pulled: missing.len(),
                pushed: 0,
            });
        }

        if local.len() > remote_records.len() {
            let missing = &local[remote_records.len()..];
            let mut batch = Vec::with_capacity(missing.len());
            for record in missing {
                batch.push((record.clone(), self.log.read_snapshot(record.version)?));
            }
            remote.push(batch).await?;

            info!(pushed = missing.len(), "pushed commits to remote");
            return Ok(SyncOutcome {
                pulled: 0,
                pushed: missing.len(),
            });
        }

        Ok(SyncOutcome {
            pulled: 0,
            pushed: 0,
        })
    }

    /// Serialize the models and run the durable commit sequence.
    fn commit_models(
        &self,
        schedule: Option<&ScheduleDocument>,
        overlay: &ConfigurationOverlay,
        version: u64,
        author: &str,
        message: &str,
        timestamp: chrono::DateTime<Utc>,
    ) -> StorageResult<CommitRecord> {
        let schedule_bytes = match schedule {
            Some(doc) => Some(
                serde_json::to_vec_pretty(doc)
                    .map_err(|err| StorageError::corrupt(&self.schedule_path, err))?,
            ),
            None => None,
        };
        let overlay_bytes = serde_json::to_vec_pretty(overlay)
            .map_err(|err| StorageError::corrupt(&self.overlay_path, err))?;

        self.commit_snapshot(
            SnapshotPayload {
                schedule: schedule_bytes,
                overlay: overlay_bytes,
            },
            version,
            author,
            message,
            timestamp,
        )
    }

    /// Durable commit sequence: snapshot, then current files, then the record.
    /// The record goes last so a crash at any earlier point is recovered as
    /// "commit not yet visible".
    fn commit_snapshot(
        &self,
        payload: SnapshotPayload,
        version: u64,
        author: &str,
        message: &str,
        timestamp: chrono::DateTime<Utc>,
    ) -> StorageResult<CommitRecord> {
        let record = CommitRecord {
            version,
            timestamp,
            author: author.to_owned(),
            message: message.to_owned(),
            schedule_sha256: payload.schedule_sha256(),
            overlay_sha256: payload.overlay_sha256(),
        };

        self.log.write_snapshot(version, &payload)?;
        self.write_current(&payload)?;
        self.log.append(&record)?;
        Ok(record)
    }

    /// Install snapshot bytes as the current store files.
    fn write_current(&self, payload: &SnapshotPayload) -> StorageResult<()> {
        match &payload.schedule {
            Some(bytes) => write_atomic(&self.schedule_path, bytes)?,
            None => remove_if_exists(&self.schedule_path)?,
        }
        write_atomic(&self.overlay_path, &payload.overlay)
    }
}

/// Compare the store files against the last commit and restore the committed
/// snapshot when they disagree (interrupted commit, or files edited outside
/// the gateway).
fn recover(log: &CommitLog, schedule_path: &Path, overlay_path: &Path) -> StorageResult<()> {
    let schedule_bytes = read_optional(schedule_path)?;
    let overlay_bytes = read_optional(overlay_path)?;

    match log.latest()? {
        Some(record) => {
            let schedule_hash = schedule_bytes.as_deref().map(sha256_hex);
            let overlay_hash = overlay_bytes.as_deref().map(sha256_hex);
            if schedule_hash == record.schedule_sha256
                && overlay_hash.as_deref() == Some(record.overlay_sha256.as_str())
            {
                return Ok(());
            }

            warn!(
                version = record.version,
                "store files do not match the last commit; restoring its snapshot"
            );
            let snapshot = log.read_snapshot(record.version)?;
            match &snapshot.schedule {
                Some(bytes) => write_atomic(schedule_path, bytes)?,
                None => remove_if_exists(schedule_path)?,
            }
            write_atomic(overlay_path, &snapshot.overlay)
        }
        None => {
            if schedule_bytes.is_some() || overlay_bytes.is_some() {
                warn!("store files exist without commit history; discarding uncommitted state");
                remove_if_exists(schedule_path)?;
                remove_if_exists(overlay_path)?;
            }
            Ok(())
        }
    }
}

fn parse_snapshot(
    snapshot: &SnapshotPayload,
) -> StorageResult<(Option<ScheduleDocument>, ConfigurationOverlay)> {
    let schedule = match &snapshot.schedule {
        Some(bytes) => Some(serde_json::from_slice::<ScheduleDocument>(bytes).map_err(|err| {
            StorageError::corrupt(Path::new("snapshot/schedule.json"), err)
        })?),
        None => None,
    };
    let overlay = serde_json::from_slice::<ConfigurationOverlay>(&snapshot.overlay)
        .map_err(|err| StorageError::corrupt(Path::new("snapshot/overlay.json"), err))?;
    Ok((schedule, overlay))
}

fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::unavailable("reading store file", err)),
    }
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::unavailable("removing store file", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::dao::{
        models::{DayPatch, FieldEdit, Session},
        remote::DirectoryRemote,
    };

    fn document() -> ScheduleDocument {
        ScheduleDocument {
            event_name: "TEST GRAND PRIX".into(),
            venue_timezone: chrono_tz::Asia::Singapore,
            sessions: vec![
                Session {
                    id: "fp1".into(),
                    label: "PRACTICE 1".into(),
                    start: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                    end: Some(Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap()),
                },
                Session {
                    id: "race".into(),
                    label: "RACE".into(),
                    start: Utc.with_ymd_and_hms(2024, 3, 3, 15, 0, 0).unwrap(),
                    end: Some(Utc.with_ymd_and_hms(2024, 3, 3, 17, 0, 0).unwrap()),
                },
            ],
            version: 0,
        }
    }

    fn lunch_patch(day: u32) -> OverlayPatch {
        let mut patch = OverlayPatch::default();
        patch.days.insert(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            DayPatch {
                lunch: FieldEdit::Set(Utc.with_ymd_and_hms(2024, 3, day, 13, 0, 0).unwrap()),
                ..DayPatch::default()
            },
        );
        patch
    }

    #[tokio::test]
    async fn first_patch_bumps_version_from_zero_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::open(dir.path()).unwrap();

        assert_eq!(gateway.overlay().load().await.version, 0);

        let (record, overlay) = gateway
            .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
            .await
            .unwrap();

        assert_eq!(record.version, 1);
        assert_eq!(overlay.version, 1);
        assert_eq!(gateway.overlay().load().await, overlay);

        let day = overlay
            .days
            .get(&NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert!(day.lunch.is_some());
        assert!(day.breakfast.is_none());
        assert!(day.dinner.is_none());
    }

    #[tokio::test]
    async fn state_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let gateway = PersistenceGateway::open(dir.path()).unwrap();
            gateway
                .replace_schedule(document(), 0, "ingestion", "ingest schedule")
                .await
                .unwrap();
            gateway
                .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
                .await
                .unwrap();
        }

        let gateway = PersistenceGateway::open(dir.path()).unwrap();
        let doc = gateway.schedule().load().await.unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.sessions.len(), 2);
        assert_eq!(gateway.overlay().load().await.version, 2);
        assert_eq!(gateway.last_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stale_schedule_replacement_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::open(dir.path()).unwrap();

        gateway
            .replace_schedule(document(), 0, "ingestion", "ingest schedule")
            .await
            .unwrap();

        let err = gateway
            .replace_schedule(document(), 0, "ingestion", "ingest schedule again")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Replace(ReplaceError::Stale {
                current: 1,
                attempted: 0,
            })
        ));
        // The stored document is untouched.
        assert_eq!(gateway.schedule().current_version().await, 1);
    }

    #[tokio::test]
    async fn uncommitted_file_changes_are_rolled_back_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let committed;
        {
            let gateway = PersistenceGateway::open(dir.path()).unwrap();
            gateway
                .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
                .await
                .unwrap();
            committed = fs::read(dir.path().join(OVERLAY_FILE)).unwrap();
        }

        // Simulate a crash between the store-file write and the log append:
        // the overlay file advances with no record accounting for it.
        fs::write(
            dir.path().join(OVERLAY_FILE),
            br#"{"days":{},"version":99}"#,
        )
        .unwrap();

        let gateway = PersistenceGateway::open(dir.path()).unwrap();
        assert_eq!(gateway.overlay().load().await.version, 1);
        assert_eq!(fs::read(dir.path().join(OVERLAY_FILE)).unwrap(), committed);
    }

    #[tokio::test]
    async fn store_files_without_history_are_discarded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(
            dir.path().join(OVERLAY_FILE),
            br#"{"days":{},"version":7}"#,
        )
        .unwrap();

        let gateway = PersistenceGateway::open(dir.path()).unwrap();
        assert_eq!(gateway.overlay().load().await.version, 0);
        assert!(!dir.path().join(OVERLAY_FILE).exists());
    }

    #[tokio::test]
    async fn rollback_restores_bytes_and_appends_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::open(dir.path()).unwrap();

        gateway
            .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
            .await
            .unwrap();
        let bytes_at_v1 = fs::read(dir.path().join(OVERLAY_FILE)).unwrap();

        gateway
            .apply_overlay_patch(&lunch_patch(2), "race-ops", "set saturday lunch")
            .await
            .unwrap();
        assert_ne!(fs::read(dir.path().join(OVERLAY_FILE)).unwrap(), bytes_at_v1);

        let record = gateway.rollback(1, "race-ops").await.unwrap();
        assert_eq!(record.version, 3);
        assert_eq!(fs::read(dir.path().join(OVERLAY_FILE)).unwrap(), bytes_at_v1);
        assert_eq!(gateway.overlay().load().await.version, 1);

        let history = gateway.history(10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].version, 3);
        assert_eq!(history[0].message, "rollback to version 1");
        // The rollback commit records the restored content hashes.
        assert_eq!(history[0].overlay_sha256, history[2].overlay_sha256);
    }

    #[tokio::test]
    async fn rollback_to_an_unknown_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::open(dir.path()).unwrap();
        gateway
            .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
            .await
            .unwrap();

        let err = gateway.rollback(5, "race-ops").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnknownVersion {
                requested: 5,
                latest: 1,
            }
        ));
        assert_eq!(gateway.history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sync_pushes_then_a_fresh_gateway_pulls() {
        let local_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let remote = DirectoryRemote::open(remote_dir.path()).unwrap();

        let gateway = PersistenceGateway::open(local_dir.path()).unwrap();
        gateway
            .replace_schedule(document(), 0, "ingestion", "ingest schedule")
            .await
            .unwrap();
        gateway
            .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
            .await
            .unwrap();

        let outcome = gateway.sync(&remote).await.unwrap();
        assert_eq!(outcome, SyncOutcome { pulled: 0, pushed: 2 });

        // A second sync has nothing to move.
        let outcome = gateway.sync(&remote).await.unwrap();
        assert_eq!(outcome, SyncOutcome { pulled: 0, pushed: 0 });

        let other_dir = tempfile::tempdir().unwrap();
        let other = PersistenceGateway::open(other_dir.path()).unwrap();
        let outcome = other.sync(&remote).await.unwrap();
        assert_eq!(outcome, SyncOutcome { pulled: 2, pushed: 0 });

        let doc = other.schedule().load().await.unwrap();
        assert_eq!(doc.event_name, "TEST GRAND PRIX");
        assert_eq!(other.overlay().load().await.version, 2);
        assert_eq!(other.last_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn diverged_histories_fail_and_leave_local_state_alone() {
        let local_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let remote = DirectoryRemote::open(remote_dir.path()).unwrap();

        // Seed the remote from one writer...
        let seeder_dir = tempfile::tempdir().unwrap();
        let seeder = PersistenceGateway::open(seeder_dir.path()).unwrap();
        seeder
            .apply_overlay_patch(&lunch_patch(2), "other-ops", "set saturday lunch")
            .await
            .unwrap();
        seeder.sync(&remote).await.unwrap();

        // ...while the local log commits something different at version 1.
        let gateway = PersistenceGateway::open(local_dir.path()).unwrap();
        gateway
            .apply_overlay_patch(&lunch_patch(1), "race-ops", "set friday lunch")
            .await
            .unwrap();

        let err = gateway.sync(&remote).await.unwrap_err();
        assert!(matches!(err, GatewayError::DivergedHistory { version: 1 }));
        assert_eq!(gateway.history(10).await.unwrap().len(), 1);
        assert_eq!(gateway.overlay().load().await.version, 1);
    }
}
