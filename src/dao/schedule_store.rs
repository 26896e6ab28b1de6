//! In-memory holder for the current schedule document.
//!
//! The store hands out cheap [`Arc`] snapshots so the reconciliation read path
//! never observes a torn document while a replacement is underway. Durability
//! is the persistence gateway's job; this type only owns the contract checks
//! for wholesale replacement.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::dao::models::{ScheduleDocument, ScheduleViolation};

/// Why a wholesale schedule replacement was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplaceError {
    /// The incoming document violates the ordering/overlap invariant.
    #[error(transparent)]
    Invalid(#[from] ScheduleViolation),
    /// The caller computed its replacement against an outdated version.
    #[error("stale schedule version: current {current}, attempted {attempted}")]
    Stale {
        /// Version currently held by the store.
        current: u64,
        /// Version the caller believed to be current.
        attempted: u64,
    },
}

/// Holds the immutable race schedule, replaced wholesale and never patched.
#[derive(Debug)]
pub struct ScheduleDocumentStore {
    current: RwLock<Option<Arc<ScheduleDocument>>>,
}

impl ScheduleDocumentStore {
    /// Create the store, seeded from whatever the gateway recovered from disk.
    pub fn new(initial: Option<ScheduleDocument>) -> Self {
        Self {
            current: RwLock::new(initial.map(Arc::new)),
        }
    }

    /// Snapshot of the current document, if one has been ingested.
    pub async fn load(&self) -> Option<Arc<ScheduleDocument>> {
        self.current.read().await.clone()
    }

    /// Version of the current document; 0 while none has been ingested.
    pub async fn current_version(&self) -> u64 {
        self.current
            .read()
            .await
            .as_ref()
            .map_or(0, |doc| doc.version)
    }

    /// Validate `doc` against the store invariant and the caller's expected
    /// version, without touching the stored document.
    pub async fn check_replace(
        &self,
        doc: &ScheduleDocument,
        expected_version: u64,
    ) -> Result<(), ReplaceError> {
        doc.validate()?;

        let current = self.current_version().await;
        if current != expected_version {
            return Err(ReplaceError::Stale {
                current,
                attempted: expected_version,
            });
        }
        Ok(())
    }

    /// Swap in a new document. Called by the gateway after the durable write.
    pub(crate) async fn install(&self, doc: Option<ScheduleDocument>) {
        let mut guard = self.current.write().await;
        *guard = doc.map(Arc::new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::dao::models::Session;

    fn document(version: u64) -> ScheduleDocument {
        ScheduleDocument {
            event_name: "TEST GRAND PRIX".into(),
            venue_timezone: chrono_tz::UTC,
            sessions: vec![Session {
                id: "race".into(),
                label: "RACE".into(),
                start: Utc.with_ymd_and_hms(2024, 3, 3, 15, 0, 0).unwrap(),
                end: Some(Utc.with_ymd_and_hms(2024, 3, 3, 17, 0, 0).unwrap()),
            }],
            version,
        }
    }

    #[tokio::test]
    async fn empty_store_accepts_replacement_against_version_zero() {
        let store = ScheduleDocumentStore::new(None);
        assert!(store.load().await.is_none());
        assert_eq!(store.current_version().await, 0);
        assert_eq!(store.check_replace(&document(0), 0).await, Ok(()));
    }

    #[tokio::test]
    async fn stale_replacement_reports_both_versions() {
        let store = ScheduleDocumentStore::new(Some(document(3)));
        assert_eq!(
            store.check_replace(&document(0), 2).await,
            Err(ReplaceError::Stale {
                current: 3,
                attempted: 2,
            })
        );
    }

    #[tokio::test]
    async fn invalid_document_is_rejected_before_the_version_check() {
        let store = ScheduleDocumentStore::new(None);
        let mut doc = document(0);
        doc.sessions.push(doc.sessions[0].clone());
        assert!(matches!(
            store.check_replace(&doc, 7).await,
            Err(ReplaceError::Invalid(_))
        ));
    }
}
