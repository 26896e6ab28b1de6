//! Business logic powering the operator REST routes. These helpers consult
//! the access gate before touching any store and funnel every mutation
//! through the persistence gateway so the commit log stays authoritative.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::time::timeout;
use tracing::warn;

use crate::{
    dao::models::{
        DayPatch, FieldEdit, OverlayPatch, ScheduleDocument, Session,
    },
    dto::operator::{
        CommitView, OverlayPatchRequest, OverlayView, ReplaceScheduleRequest, RollbackRequest,
        SyncResponse,
    },
    error::ServiceError,
    state::SharedState,
};

/// History page size when the caller does not pick one.
const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Upper bound on one history page.
const MAX_HISTORY_LIMIT: usize = 100;

/// Replace the schedule document wholesale with freshly ingested output.
pub async fn replace_schedule(
    state: &SharedState,
    identity: &str,
    request: ReplaceScheduleRequest,
) -> Result<CommitView, ServiceError> {
    state.ensure_authorized(identity)?;

    let venue_timezone = request.venue_timezone.parse::<Tz>().map_err(|_| {
        ServiceError::InvalidInput(format!(
            "`{}` is not a known IANA timezone",
            request.venue_timezone
        ))
    })?;

    let doc = ScheduleDocument {
        event_name: request.event_name,
        venue_timezone,
        sessions: request
            .sessions
            .into_iter()
            .map(|session| Session {
                id: session.id,
                label: session.label,
                start: session.start,
                end: session.end,
            })
            .collect(),
        version: 0,
    };

    let message = request
        .message
        .unwrap_or_else(|| "replace schedule".to_owned());
    let record = state
        .gateway()
        .replace_schedule(doc, request.expected_version, identity, &message)
        .await?;
    Ok(record.into())
}

/// Apply an overlay patch on behalf of `identity`.
pub async fn apply_overlay_patch(
    state: &SharedState,
    identity: &str,
    request: OverlayPatchRequest,
) -> Result<CommitView, ServiceError> {
    state.ensure_authorized(identity)?;

    if request.days.is_empty() {
        return Err(ServiceError::InvalidInput("patch contains no edits".into()));
    }

    let venue_timezone = state
        .gateway()
        .schedule()
        .load()
        .await
        .map(|doc| doc.venue_timezone);
    let patch = build_patch(&request, venue_timezone)?;

    let message = request
        .message
        .unwrap_or_else(|| "update day configuration".to_owned());
    let (record, _overlay) = state
        .gateway()
        .apply_overlay_patch(&patch, identity, &message)
        .await?;
    Ok(record.into())
}

/// Reset the overlay to its documented default (no configured days).
pub async fn reset_overlay(
    state: &SharedState,
    identity: &str,
) -> Result<CommitView, ServiceError> {
    state.ensure_authorized(identity)?;
    let record = state.gateway().reset_overlay(identity).await?;
    Ok(record.into())
}

/// Return the overlay exactly as stored.
pub async fn get_overlay(state: &SharedState) -> Result<OverlayView, ServiceError> {
    Ok(state.gateway().overlay().load().await.into())
}

/// Commit history, most recent first.
pub async fn get_history(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<Vec<CommitView>, ServiceError> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    let records = state.gateway().history(limit).await?;
    Ok(records.into_iter().map(Into::into).collect())
}

/// Restore both stores to the state recorded at the target version.
pub async fn rollback(
    state: &SharedState,
    identity: &str,
    request: RollbackRequest,
) -> Result<CommitView, ServiceError> {
    state.ensure_authorized(identity)?;
    let record = state
        .gateway()
        .rollback(request.target_version, identity)
        .await?;
    Ok(record.into())
}

/// Fast-forward sync against the configured remote mirror, bounded by the
/// configured timeout.
pub async fn sync_remote(
    state: &SharedState,
    identity: &str,
) -> Result<SyncResponse, ServiceError> {
    state.ensure_authorized(identity)?;

    let remote = state
        .remote()
        .ok_or_else(|| ServiceError::InvalidState("no remote mirror is configured".into()))?;

    let outcome = match timeout(state.config().sync_timeout, state.gateway().sync(remote)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("sync against remote mirror timed out");
            return Err(ServiceError::Timeout);
        }
    };

    Ok(SyncResponse {
        pulled: outcome.pulled,
        pushed: outcome.pushed,
    })
}

fn build_patch(
    request: &OverlayPatchRequest,
    venue_timezone: Option<Tz>,
) -> Result<OverlayPatch, ServiceError> {
    let mut patch = OverlayPatch::default();
    for (key, day) in &request.days {
        let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| {
            ServiceError::InvalidInput(format!("`{key}` is not a YYYY-MM-DD date"))
        })?;

        patch.days.insert(
            date,
            DayPatch {
                breakfast: field_edit(&day.breakfast, date, venue_timezone)?,
                lunch: field_edit(&day.lunch, date, venue_timezone)?,
                dinner: field_edit(&day.dinner, date, venue_timezone)?,
                hotel_departure: field_edit(&day.hotel_departure, date, venue_timezone)?,
            },
        );
    }
    Ok(patch)
}

fn field_edit(
    field: &Option<Option<String>>,
    date: NaiveDate,
    venue_timezone: Option<Tz>,
) -> Result<FieldEdit, ServiceError> {
    match field {
        None => Ok(FieldEdit::Keep),
        Some(None) => Ok(FieldEdit::Clear),
        Some(Some(raw)) => Ok(FieldEdit::Set(parse_patch_time(raw, date, venue_timezone)?)),
    }
}

/// Parse one overlay time value.
///
/// Full RFC 3339 instants are taken as-is; bare `HH:MM` values are read as
/// venue-local wall-clock time on `date`. An ambiguous wall-clock time (the
/// repeated hour of a DST fall-back) resolves to its earlier occurrence; a
/// nonexistent one is rejected.
fn parse_patch_time(
    raw: &str,
    date: NaiveDate,
    venue_timezone: Option<Tz>,
) -> Result<DateTime<Utc>, ServiceError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let time = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
        ServiceError::InvalidInput(format!(
            "invalid time `{raw}`: expected HH:MM or an RFC 3339 instant"
        ))
    })?;
    let venue_timezone = venue_timezone.ok_or_else(|| {
        ServiceError::InvalidInput(
            "venue-local times require an ingested schedule; use RFC 3339 instants".into(),
        )
    })?;

    match venue_timezone.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(at) => Ok(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => Err(ServiceError::InvalidInput(format!(
            "time `{raw}` does not exist on {date} in {venue_timezone}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::{config::AppConfig, dto::operator::SessionInput, state::AppState};

    fn test_state(dir: &std::path::Path) -> crate::state::SharedState {
        AppState::new(AppConfig {
            data_dir: dir.to_path_buf(),
            allowed_operators: vec!["race-ops".into()],
            ..AppConfig::default()
        })
        .unwrap()
    }

    fn replace_request() -> ReplaceScheduleRequest {
        ReplaceScheduleRequest {
            event_name: "SINGAPORE GRAND PRIX".into(),
            venue_timezone: "Asia/Singapore".into(),
            sessions: vec![SessionInput {
                id: "race".into(),
                label: "RACE".into(),
                start: Utc.with_ymd_and_hms(2024, 9, 22, 12, 0, 0).unwrap(),
                end: Some(Utc.with_ymd_and_hms(2024, 9, 22, 14, 0, 0).unwrap()),
            }],
            expected_version: 0,
            message: None,
        }
    }

    fn lunch_request(value: &str) -> OverlayPatchRequest {
        serde_json::from_str(&format!(
            r#"{{"days":{{"2024-09-22":{{"lunch":"{value}"}}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn hh_mm_times_resolve_in_the_venue_timezone() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
        let at = parse_patch_time("13:00", date, Some(chrono_tz::Asia::Singapore)).unwrap();
        // 13:00 SGT is 05:00 UTC.
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 9, 22, 5, 0, 0).unwrap());
    }

    #[test]
    fn rfc3339_times_need_no_schedule() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
        let at = parse_patch_time("2024-09-22T05:00:00+00:00", date, None).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 9, 22, 5, 0, 0).unwrap());
    }

    #[test]
    fn hh_mm_without_a_schedule_is_refused() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
        assert!(matches!(
            parse_patch_time("13:00", date, None),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn garbage_times_are_refused() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
        assert!(matches!(
            parse_patch_time("1pm", date, Some(chrono_tz::UTC)),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn authorized_patch_commits_and_is_visible_in_history() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        replace_schedule(&state, "race-ops", replace_request())
            .await
            .unwrap();

        let commit = apply_overlay_patch(&state, "race-ops", lunch_request("13:00"))
            .await
            .unwrap();
        assert_eq!(commit.version, 2);
        assert_eq!(commit.author, "race-ops");

        let overlay = get_overlay(&state).await.unwrap();
        assert_eq!(overlay.version, 2);
        // 13:00 SGT stored as 05:00 UTC.
        assert_eq!(
            overlay.days["2024-09-22"].lunch.as_deref(),
            Some("2024-09-22T05:00:00Z")
        );

        let history = get_history(&state, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 2);
    }

    #[tokio::test]
    async fn unlisted_identities_never_reach_the_stores() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = apply_overlay_patch(&state, "intruder", lunch_request("13:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(get_history(&state, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_without_a_remote_is_an_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = sync_remote(&state, "race-ops").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
