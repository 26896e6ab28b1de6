//! DTO definitions used by the operator REST API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{CommitRecord, ConfigurationOverlay},
    dto::{
        format_utc,
        validation::{validate_date_key, validate_overlay_time, validate_timezone_name},
    },
};

/// One session as supplied by ingestion.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SessionInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub label: String,
    /// Start instant, RFC 3339.
    pub start: DateTime<Utc>,
    /// End instant, RFC 3339; omit for point events.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// Wholesale schedule replacement payload (the output of ingestion).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceScheduleRequest {
    pub event_name: String,
    /// IANA timezone the schedule was authored in.
    pub venue_timezone: String,
    pub sessions: Vec<SessionInput>,
    /// Version of the document the caller based this replacement on; 0 when
    /// no schedule has been ingested yet.
    pub expected_version: u64,
    /// Commit message; a default is used when omitted.
    #[serde(default)]
    pub message: Option<String>,
}

impl Validate for ReplaceScheduleRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.event_name.trim().is_empty() {
            let mut err = validator::ValidationError::new("length");
            err.message = Some("event name must not be empty".into());
            errors.add("event_name", err);
        }
        if let Err(err) = validate_timezone_name(&self.venue_timezone) {
            errors.add("venue_timezone", err);
        }
        for session in &self.sessions {
            if let Err(nested) = session.validate() {
                errors.merge_self("sessions", Err(nested));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Per-day field edits.
///
/// Each field is tri-state: omitted leaves the time unchanged, `null` clears
/// it, and a value sets it. Values are either `HH:MM` (interpreted in the
/// venue timezone on that date) or a full RFC 3339 instant.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DayPatchInput {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub breakfast: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub lunch: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub dinner: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub hotel_departure: Option<Option<String>>,
}

impl DayPatchInput {
    fn time_values(&self) -> impl Iterator<Item = &String> {
        [
            &self.breakfast,
            &self.lunch,
            &self.dinner,
            &self.hotel_departure,
        ]
        .into_iter()
        .filter_map(|field| field.as_ref())
        .filter_map(|field| field.as_ref())
    }
}

/// Overlay patch payload: edits per `YYYY-MM-DD` date.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OverlayPatchRequest {
    pub days: BTreeMap<String, DayPatchInput>,
    /// Commit message; a default is used when omitted.
    #[serde(default)]
    pub message: Option<String>,
}

impl Validate for OverlayPatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (date, day) in &self.days {
            if let Err(err) = validate_date_key(date) {
                errors.add("days", err);
            }
            for value in day.time_values() {
                if let Err(err) = validate_overlay_time(value) {
                    errors.add("days", err);
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Rollback payload naming the commit version to restore.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RollbackRequest {
    pub target_version: u64,
}

/// Query bounding how much history is returned.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of commits, most recent first.
    pub limit: Option<usize>,
}

/// One commit as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommitView {
    pub version: u64,
    pub timestamp: String,
    pub author: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_sha256: Option<String>,
    pub overlay_sha256: String,
}

impl From<CommitRecord> for CommitView {
    fn from(record: CommitRecord) -> Self {
        Self {
            version: record.version,
            timestamp: format_utc(record.timestamp),
            author: record.author,
            message: record.message,
            schedule_sha256: record.schedule_sha256,
            overlay_sha256: record.overlay_sha256,
        }
    }
}

/// Raw overlay as stored, with UTC instants.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverlayView {
    /// Per-date times keyed by `YYYY-MM-DD`.
    pub days: BTreeMap<String, OverlayDayView>,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
}

/// One stored day of the overlay, with UTC instants.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverlayDayView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dinner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_departure: Option<String>,
}

impl From<ConfigurationOverlay> for OverlayView {
    fn from(overlay: ConfigurationOverlay) -> Self {
        Self {
            days: overlay
                .days
                .into_iter()
                .map(|(date, day)| {
                    (
                        date.to_string(),
                        OverlayDayView {
                            breakfast: day.breakfast.map(format_utc),
                            lunch: day.lunch.map(format_utc),
                            dinner: day.dinner.map(format_utc),
                            hotel_departure: day.hotel_departure.map(format_utc),
                        },
                    )
                })
                .collect(),
            version: overlay.version,
            last_modified_by: overlay.last_modified_by,
            last_modified_at: overlay.last_modified_at.map(format_utc),
        }
    }
}

/// Outcome of a sync against the remote mirror.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub pulled: usize,
    pub pushed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_fields_distinguish_omitted_null_and_value() {
        let raw = r#"{"days":{"2024-03-01":{"lunch":"13:00","dinner":null}}}"#;
        let request: OverlayPatchRequest = serde_json::from_str(raw).unwrap();
        let day = &request.days["2024-03-01"];

        assert_eq!(day.lunch, Some(Some("13:00".into())));
        assert_eq!(day.dinner, Some(None));
        assert_eq!(day.breakfast, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn patch_rejects_bad_dates_and_times() {
        let bad_date: OverlayPatchRequest =
            serde_json::from_str(r#"{"days":{"Friday":{"lunch":"13:00"}}}"#).unwrap();
        assert!(bad_date.validate().is_err());

        let bad_time: OverlayPatchRequest =
            serde_json::from_str(r#"{"days":{"2024-03-01":{"lunch":"1pm"}}}"#).unwrap();
        assert!(bad_time.validate().is_err());
    }

    #[test]
    fn replace_request_rejects_unknown_timezone_and_blank_ids() {
        let raw = r#"{
            "event_name": "TEST GRAND PRIX",
            "venue_timezone": "Mars/Olympus",
            "sessions": [{"id": "", "label": "RACE", "start": "2024-03-03T15:00:00Z"}],
            "expected_version": 0
        }"#;
        let request: ReplaceScheduleRequest = serde_json::from_str(raw).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.to_string().contains("venue_timezone"));
    }
}
