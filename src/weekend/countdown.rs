//! Countdown computation over a reconciled view.

use chrono::{DateTime, Duration, Utc};

use super::{ReconciledSession, ReconciledView};

/// Where `now` falls relative to the weekend's sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownState {
    /// `now` precedes the earliest session start.
    Upcoming {
        /// The first session of the weekend.
        next: ReconciledSession,
        /// Time until it starts; never negative.
        time_remaining: Duration,
    },
    /// `now` falls within a session's window.
    Live {
        /// The session currently running.
        current: ReconciledSession,
        /// Time until its window closes; never negative.
        time_remaining: Duration,
    },
    /// `now` sits between two sessions.
    Between {
        /// The most recently finished session.
        last: ReconciledSession,
        /// The session coming up.
        next: ReconciledSession,
        /// Time until the next session starts; never negative.
        time_until_next: Duration,
    },
    /// Every session is over.
    WeekendOver {
        /// The final session of the weekend.
        last: ReconciledSession,
    },
}

/// Compute the countdown state at `now`.
///
/// Sessions without an explicit end stay live for `open_ended_window` (the
/// configured fallback, not a literal baked in here). Returns `None` when the
/// view has no sessions at all. Comparisons are on absolute instants only;
/// converting to a display timezone is the caller's concern.
///
/// Overlapping windows cannot occur in a validated schedule, but if handed
/// one anyway the earliest-starting live session wins.
pub fn compute(
    view: &ReconciledView,
    now: DateTime<Utc>,
    open_ended_window: Duration,
) -> Option<CountdownState> {
    let effective_end =
        |s: &ReconciledSession| s.session.end.unwrap_or(s.session.start + open_ended_window);

    // Sessions arrive sorted by start, so the first live hit is the earliest.
    for candidate in &view.sessions {
        if candidate.session.start <= now && now < effective_end(candidate) {
            return Some(CountdownState::Live {
                current: candidate.clone(),
                time_remaining: effective_end(candidate) - now,
            });
        }
    }

    let next = view
        .sessions
        .iter()
        .find(|s| s.session.start > now)
        .cloned();
    let last = view
        .sessions
        .iter()
        .rev()
        .find(|s| effective_end(s) <= now)
        .cloned();

    match (last, next) {
        (None, Some(next)) => Some(CountdownState::Upcoming {
            time_remaining: next.session.start - now,
            next,
        }),
        (Some(last), Some(next)) => Some(CountdownState::Between {
            last,
            time_until_next: next.session.start - now,
            next,
        }),
        (Some(last), None) => Some(CountdownState::WeekendOver { last }),
        (None, None) => None,
    }
}
