//! Pure race-weekend logic: merging the schedule with the overlay and
//! computing countdowns against the merged view.
//!
//! Nothing in this module performs I/O or reads ambient state; both entry
//! points are plain functions of their inputs, which is what keeps them
//! independently testable. All comparisons happen on absolute instants —
//! timezone conversion is confined to the date-grouping step in
//! [`reconcile::reconcile`] and to the presentation boundary.

pub mod countdown;
pub mod reconcile;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::dao::models::{DayOverlay, Session};

/// One session paired with the overlay of its venue-local day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledSession {
    /// The scheduled session.
    pub session: Session,
    /// Calendar date of the session start in the venue timezone.
    pub venue_date: NaiveDate,
    /// Overlay for that date; all-unset when the operator configured nothing.
    pub overlay: DayOverlay,
}

/// The merged, derived structure the countdown engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledView {
    /// Event name carried over from the schedule document.
    pub event_name: String,
    /// Timezone the schedule was authored in.
    pub venue_timezone: Tz,
    /// Sessions sorted by start instant, ties broken by id.
    pub sessions: Vec<ReconciledSession>,
    /// Dates configured in the overlay that match no session. Preserved, not
    /// an error: operators configure meals before sessions are confirmed.
    pub unused_days: Vec<NaiveDate>,
}
