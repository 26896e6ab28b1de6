//! Merge the immutable schedule with the operator overlay.

use std::collections::BTreeSet;

use crate::dao::models::{ConfigurationOverlay, ScheduleDocument};

use super::{ReconciledSession, ReconciledView};

/// Merge `doc` and `overlay` into one canonical view.
///
/// Sessions are grouped by the venue-local calendar date of their start
/// instant; every session on a date picks up that date's overlay (all-unset
/// when absent). Overlay dates with no session are retained in
/// [`ReconciledView::unused_days`]. Output ordering is deterministic: by
/// start instant, ties broken by session id.
pub fn reconcile(doc: &ScheduleDocument, overlay: &ConfigurationOverlay) -> ReconciledView {
    let mut sessions: Vec<ReconciledSession> = doc
        .sessions
        .iter()
        .map(|session| {
            let venue_date = session
                .start
                .with_timezone(&doc.venue_timezone)
                .date_naive();
            ReconciledSession {
                session: session.clone(),
                venue_date,
                overlay: overlay.days.get(&venue_date).cloned().unwrap_or_default(),
            }
        })
        .collect();

    sessions.sort_by(|a, b| {
        a.session
            .start
            .cmp(&b.session.start)
            .then_with(|| a.session.id.cmp(&b.session.id))
    });

    let session_dates: BTreeSet<_> = sessions.iter().map(|s| s.venue_date).collect();
    let unused_days = overlay
        .days
        .keys()
        .filter(|date| !session_dates.contains(*date))
        .copied()
        .collect();

    ReconciledView {
        event_name: doc.event_name.clone(),
        venue_timezone: doc.venue_timezone,
        sessions,
        unused_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::dao::models::{DayOverlay, Session};

    fn session(id: &str, day: u32, hour: u32) -> Session {
        Session {
            id: id.into(),
            label: id.to_uppercase(),
            start: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            end: None,
        }
    }

    fn singapore_doc(sessions: Vec<Session>) -> ScheduleDocument {
        ScheduleDocument {
            event_name: "SINGAPORE GRAND PRIX".into(),
            venue_timezone: chrono_tz::Asia::Singapore,
            sessions,
            version: 1,
        }
    }

    fn overlay_with(dates: &[(u32, u32)]) -> ConfigurationOverlay {
        let mut overlay = ConfigurationOverlay::default();
        for (day, lunch_hour) in dates {
            overlay.days.insert(
                NaiveDate::from_ymd_opt(2024, 3, *day).unwrap(),
                DayOverlay {
                    lunch: Some(Utc.with_ymd_and_hms(2024, 3, *day, *lunch_hour, 0, 0).unwrap()),
                    ..DayOverlay::default()
                },
            );
        }
        overlay
    }

    #[test]
    fn sessions_pick_up_the_overlay_of_their_venue_local_date() {
        // 18:00 UTC on March 1st is already March 2nd in Singapore (UTC+8).
        let doc = singapore_doc(vec![session("fp1", 1, 18)]);
        let overlay = overlay_with(&[(2, 5)]);

        let view = reconcile(&doc, &overlay);
        assert_eq!(
            view.sessions[0].venue_date,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert!(view.sessions[0].overlay.lunch.is_some());
        assert!(view.unused_days.is_empty());
    }

    #[test]
    fn unmatched_overlay_dates_are_preserved_not_dropped() {
        let doc = singapore_doc(vec![session("fp1", 1, 2)]);
        let overlay = overlay_with(&[(1, 5), (9, 5)]);

        let view = reconcile(&doc, &overlay);
        assert_eq!(
            view.unused_days,
            vec![NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()]
        );
    }

    #[test]
    fn sessions_without_configuration_get_an_all_unset_overlay() {
        let doc = singapore_doc(vec![session("fp1", 1, 2)]);
        let view = reconcile(&doc, &ConfigurationOverlay::default());
        assert!(view.sessions[0].overlay.is_unset());
    }

    #[test]
    fn ordering_is_by_start_then_id_and_deterministic() {
        let doc = singapore_doc(vec![
            session("quali", 2, 9),
            session("b-event", 1, 9),
            session("a-event", 1, 9),
        ]);
        let overlay = overlay_with(&[(1, 5)]);

        let first = reconcile(&doc, &overlay);
        let ids: Vec<_> = first
            .sessions
            .iter()
            .map(|s| s.session.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a-event", "b-event", "quali"]);

        // Pure function of its inputs: calling again yields the same view.
        assert_eq!(reconcile(&doc, &overlay), first);
    }
}
