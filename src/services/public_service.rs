//! Service helpers that expose read-only projections of the race weekend.

use chrono::Utc;

use crate::{
    dto::public::{CountdownResponse, DisplayQuery, WeekendResponse},
    error::ServiceError,
    state::SharedState,
    weekend::{countdown, reconcile::reconcile},
};

/// Compute the current countdown against the reconciled weekend view.
pub async fn get_countdown(
    state: &SharedState,
    query: DisplayQuery,
) -> Result<CountdownResponse, ServiceError> {
    let display = super::resolve_display_timezone(state, query.timezone.as_deref())?;

    let doc = state
        .gateway()
        .schedule()
        .load()
        .await
        .ok_or_else(|| ServiceError::NotFound("no schedule has been ingested".into()))?;
    let overlay = state.gateway().overlay().load().await;

    let view = reconcile(&doc, &overlay);
    let now = Utc::now();
    let countdown_state =
        countdown::compute(&view, now, state.config().open_ended_session_window)
            .ok_or_else(|| ServiceError::NotFound("schedule has no sessions".into()))?;

    Ok(CountdownResponse::project(
        &view,
        countdown_state,
        now,
        display,
    ))
}

/// Return the full reconciled view: every session with its day's overlay.
pub async fn get_weekend(
    state: &SharedState,
    query: DisplayQuery,
) -> Result<WeekendResponse, ServiceError> {
    let display = super::resolve_display_timezone(state, query.timezone.as_deref())?;

    let doc = state
        .gateway()
        .schedule()
        .load()
        .await
        .ok_or_else(|| ServiceError::NotFound("no schedule has been ingested".into()))?;
    let overlay = state.gateway().overlay().load().await;

    let view = reconcile(&doc, &overlay);
    Ok(WeekendResponse::project(
        &view,
        doc.version,
        overlay.version,
        display,
    ))
}
