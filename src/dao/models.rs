//! Persisted model definitions shared by the stores, the commit log, and the
//! reconciliation core.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One scheduled race-weekend event (practice, qualifying, race, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Stable identifier, unique within one schedule document.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Start instant, UTC-anchored.
    pub start: DateTime<Utc>,
    /// End instant; absent for point events such as a departure or a ceremony.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl Session {
    /// End of the window this session occupies for overlap checks.
    ///
    /// Point events occupy a zero-width window so they never collide with a
    /// session starting at the same instant they "end".
    pub fn window_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start)
    }
}

/// The immutable race schedule as produced by ingestion.
///
/// Replaced wholesale by a new ingestion, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleDocument {
    /// Human readable event name (e.g. "FORMULA 1 SINGAPORE GRAND PRIX").
    pub event_name: String,
    /// IANA timezone the schedule was authored in, needed to redisplay
    /// venue-local times and to group sessions by venue-local date.
    pub venue_timezone: Tz,
    /// Sessions ordered by start instant.
    pub sessions: Vec<Session>,
    /// Commit version at which this document was ingested.
    #[serde(default)]
    pub version: u64,
}

/// First violation of the sorted/non-overlapping schedule invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleViolation {
    /// A session ends before it starts.
    #[error("session `{session}` ends before it starts")]
    InvertedWindow {
        /// Offending session id.
        session: String,
    },
    /// Two sessions share an id.
    #[error("duplicate session id `{id}`")]
    DuplicateId {
        /// The id that appears more than once.
        id: String,
    },
    /// Sessions are not sorted by start instant.
    #[error("sessions `{first}` and `{second}` are out of order")]
    OutOfOrder {
        /// Session appearing first in the document.
        first: String,
        /// Session appearing second in the document.
        second: String,
    },
    /// Two sessions occupy overlapping windows.
    #[error("sessions `{first}` and `{second}` overlap")]
    Overlapping {
        /// Earlier session of the offending pair.
        first: String,
        /// Later session of the offending pair.
        second: String,
    },
}

impl ScheduleDocument {
    /// Check the document invariant: sessions sorted by `start`, pairwise
    /// non-overlapping, ids unique, windows not inverted.
    ///
    /// Returns the first offending pair so the caller can report it.
    pub fn validate(&self) -> Result<(), ScheduleViolation> {
        let mut seen = std::collections::HashSet::new();
        for session in &self.sessions {
            if let Some(end) = session.end {
                if end < session.start {
                    return Err(ScheduleViolation::InvertedWindow {
                        session: session.id.clone(),
                    });
                }
            }
            if !seen.insert(session.id.as_str()) {
                return Err(ScheduleViolation::DuplicateId {
                    id: session.id.clone(),
                });
            }
        }

        for pair in self.sessions.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.start > b.start {
                return Err(ScheduleViolation::OutOfOrder {
                    first: a.id.clone(),
                    second: b.id.clone(),
                });
            }
            // Windows are half-open, so a session may start exactly when the
            // previous one ends.
            if a.window_end() > b.start {
                return Err(ScheduleViolation::Overlapping {
                    first: a.id.clone(),
                    second: b.id.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Operator-editable times attached to one venue-local calendar day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayOverlay {
    /// Breakfast time, absolute instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<DateTime<Utc>>,
    /// Lunch time, absolute instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch: Option<DateTime<Utc>>,
    /// Dinner time, absolute instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dinner: Option<DateTime<Utc>>,
    /// Hotel departure time, absolute instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_departure: Option<DateTime<Utc>>,
}

impl DayOverlay {
    /// Whether every field is unset.
    pub fn is_unset(&self) -> bool {
        self.breakfast.is_none()
            && self.lunch.is_none()
            && self.dinner.is_none()
            && self.hotel_departure.is_none()
    }
}

/// The mutable, operator-edited configuration layered over the schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigurationOverlay {
    /// Per-date overlays keyed by venue-local calendar date.
    pub days: BTreeMap<NaiveDate, DayOverlay>,
    /// Commit version of the most recent overlay mutation; 0 when untouched.
    pub version: u64,
    /// Identity that performed the most recent mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    /// Instant of the most recent mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Tri-state edit for a single overlay field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldEdit {
    /// Leave the field as it is.
    #[default]
    Keep,
    /// Explicitly unset the field.
    Clear,
    /// Set the field to a new instant.
    Set(DateTime<Utc>),
}

impl FieldEdit {
    fn apply(self, slot: &mut Option<DateTime<Utc>>) {
        match self {
            FieldEdit::Keep => {}
            FieldEdit::Clear => *slot = None,
            FieldEdit::Set(at) => *slot = Some(at),
        }
    }
}

/// Field edits targeting one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayPatch {
    /// Edit for the breakfast time.
    pub breakfast: FieldEdit,
    /// Edit for the lunch time.
    pub lunch: FieldEdit,
    /// Edit for the dinner time.
    pub dinner: FieldEdit,
    /// Edit for the hotel departure time.
    pub hotel_departure: FieldEdit,
}

/// A set of per-day edits applied as one overlay mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayPatch {
    /// Edits keyed by venue-local calendar date.
    pub days: BTreeMap<NaiveDate, DayPatch>,
}

impl OverlayPatch {
    /// Whether the patch carries no edits at all.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl ConfigurationOverlay {
    /// Apply `patch` field by field and stamp the audit metadata.
    ///
    /// Omitted fields are untouched, cleared fields are unset, and a day whose
    /// overlay ends up all-unset is dropped from the map so the stored file
    /// stays minimal. `version` is the commit version assigned by the log.
    pub fn apply(&mut self, patch: &OverlayPatch, author: &str, version: u64, at: DateTime<Utc>) {
        for (date, day_patch) in &patch.days {
            let entry = self.days.entry(*date).or_default();
            day_patch.breakfast.apply(&mut entry.breakfast);
            day_patch.lunch.apply(&mut entry.lunch);
            day_patch.dinner.apply(&mut entry.dinner);
            day_patch.hotel_departure.apply(&mut entry.hotel_departure);
            if entry.is_unset() {
                self.days.remove(date);
            }
        }

        self.version = version;
        self.last_modified_by = Some(author.to_owned());
        self.last_modified_at = Some(at);
    }

    /// Restore the documented default: no configured days. The version
    /// counter is carried forward by the caller, not reset.
    pub fn reset(&mut self, author: &str, version: u64, at: DateTime<Utc>) {
        self.days.clear();
        self.version = version;
        self.last_modified_by = Some(author.to_owned());
        self.last_modified_at = Some(at);
    }
}

/// One immutable entry of the durable change log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    /// Strictly increasing, gap-free commit version.
    pub version: u64,
    /// Instant the commit became durable.
    pub timestamp: DateTime<Utc>,
    /// Identity that authored the change.
    pub author: String,
    /// Free-form change description.
    pub message: String,
    /// SHA-256 of the schedule file after this commit; absent while no
    /// schedule has been ingested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_sha256: Option<String>,
    /// SHA-256 of the overlay file after this commit.
    pub overlay_sha256: String,
}
