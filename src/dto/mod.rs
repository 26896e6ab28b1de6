use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

pub mod health;
pub mod operator;
pub mod public;
pub mod validation;

fn format_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_in_zone(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false)
}
