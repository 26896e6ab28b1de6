//! DTO definitions for the public read path.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    dao::models::DayOverlay,
    dto::{format_in_zone, format_utc},
    weekend::{ReconciledSession, ReconciledView, countdown::CountdownState},
};

/// Query selecting the timezone public responses are localized to.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DisplayQuery {
    /// IANA timezone name; the configured default applies when omitted.
    pub timezone: Option<String>,
}

/// One session as shown to dashboard clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub id: String,
    pub label: String,
    /// Start instant in UTC.
    pub start: String,
    /// End instant in UTC, if the session has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Start localized to the venue timezone.
    pub venue_local_start: String,
    /// Start localized to the requested display timezone.
    pub display_start: String,
    /// End localized to the requested display timezone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_end: Option<String>,
}

impl SessionView {
    pub(crate) fn project(reconciled: &ReconciledSession, venue: Tz, display: Tz) -> Self {
        let session = &reconciled.session;
        Self {
            id: session.id.clone(),
            label: session.label.clone(),
            start: format_utc(session.start),
            end: session.end.map(format_utc),
            venue_local_start: format_in_zone(session.start, venue),
            display_start: format_in_zone(session.start, display),
            display_end: session.end.map(|end| format_in_zone(end, display)),
        }
    }
}

/// Per-day operator times localized to the display timezone.
#[derive(Debug, Serialize, ToSchema)]
pub struct DayOverlayView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dinner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_departure: Option<String>,
}

impl DayOverlayView {
    pub(crate) fn project(overlay: &DayOverlay, display: Tz) -> Self {
        let localize = |at: Option<DateTime<Utc>>| at.map(|at| format_in_zone(at, display));
        Self {
            breakfast: localize(overlay.breakfast),
            lunch: localize(overlay.lunch),
            dinner: localize(overlay.dinner),
            hotel_departure: localize(overlay.hotel_departure),
        }
    }
}

/// Countdown phase discriminated on where `now` falls.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CountdownPhaseView {
    /// The weekend has not started yet.
    Upcoming {
        next: SessionView,
        seconds_remaining: i64,
    },
    /// A session is running right now.
    Live {
        current: SessionView,
        seconds_remaining: i64,
    },
    /// Waiting between two sessions.
    Between {
        last: SessionView,
        next: SessionView,
        seconds_until_next: i64,
    },
    /// Every session is over.
    WeekendOver { last: SessionView },
}

/// Payload of the public countdown endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountdownResponse {
    pub event_name: String,
    /// Current instant localized to the display timezone.
    pub now: String,
    pub display_timezone: String,
    #[serde(flatten)]
    pub state: CountdownPhaseView,
}

impl CountdownResponse {
    pub(crate) fn project(
        view: &ReconciledView,
        state: CountdownState,
        now: DateTime<Utc>,
        display: Tz,
    ) -> Self {
        let venue = view.venue_timezone;
        let session = |s: &ReconciledSession| SessionView::project(s, venue, display);

        let state = match state {
            CountdownState::Upcoming {
                next,
                time_remaining,
            } => CountdownPhaseView::Upcoming {
                next: session(&next),
                seconds_remaining: time_remaining.num_seconds(),
            },
            CountdownState::Live {
                current,
                time_remaining,
            } => CountdownPhaseView::Live {
                current: session(&current),
                seconds_remaining: time_remaining.num_seconds(),
            },
            CountdownState::Between {
                last,
                next,
                time_until_next,
            } => CountdownPhaseView::Between {
                last: session(&last),
                next: session(&next),
                seconds_until_next: time_until_next.num_seconds(),
            },
            CountdownState::WeekendOver { last } => CountdownPhaseView::WeekendOver {
                last: session(&last),
            },
        };

        Self {
            event_name: view.event_name.clone(),
            now: format_in_zone(now, display),
            display_timezone: display.name().to_owned(),
            state,
        }
    }
}

/// One session paired with its day's operator times.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciledSessionView {
    #[serde(flatten)]
    pub session: SessionView,
    /// Venue-local calendar date the session belongs to.
    pub venue_date: String,
    pub overlay: DayOverlayView,
}

/// Payload of the public weekend endpoint: the full reconciled view.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeekendResponse {
    pub event_name: String,
    pub venue_timezone: String,
    pub display_timezone: String,
    pub schedule_version: u64,
    pub overlay_version: u64,
    pub sessions: Vec<ReconciledSessionView>,
    /// Overlay dates that match no session; kept so operators can prepare
    /// days ahead of a confirmed schedule.
    pub configured_days_without_sessions: Vec<String>,
}

impl WeekendResponse {
    pub(crate) fn project(
        view: &ReconciledView,
        schedule_version: u64,
        overlay_version: u64,
        display: Tz,
    ) -> Self {
        let venue = view.venue_timezone;
        Self {
            event_name: view.event_name.clone(),
            venue_timezone: venue.name().to_owned(),
            display_timezone: display.name().to_owned(),
            schedule_version,
            overlay_version,
            sessions: view
                .sessions
                .iter()
                .map(|reconciled| ReconciledSessionView {
                    session: SessionView::project(reconciled, venue, display),
                    venue_date: reconciled.venue_date.to_string(),
                    overlay: DayOverlayView::project(&reconciled.overlay, display),
                })
                .collect(),
            configured_days_without_sessions: view
                .unused_days
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}
