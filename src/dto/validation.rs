//! Validation helpers for DTOs.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use validator::ValidationError;

/// Validates that a string names a known IANA timezone.
///
/// # Examples
///
/// ```ignore
/// validate_timezone_name("Asia/Singapore") // Ok
/// validate_timezone_name("Mars/Olympus")   // Err - unknown zone
/// ```
pub fn validate_timezone_name(name: &str) -> Result<(), ValidationError> {
    if name.parse::<Tz>().is_err() {
        let mut err = ValidationError::new("timezone");
        err.message = Some(format!("`{name}` is not a known IANA timezone").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a calendar date key in `YYYY-MM-DD` form.
pub fn validate_date_key(value: &str) -> Result<(), ValidationError> {
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        let mut err = ValidationError::new("date");
        err.message = Some(format!("`{value}` is not a YYYY-MM-DD date").into());
        return Err(err);
    }
    Ok(())
}

/// Validates an overlay time value: either `HH:MM` (venue-local) or a full
/// RFC 3339 instant.
pub fn validate_overlay_time(value: &str) -> Result<(), ValidationError> {
    if DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveTime::parse_from_str(value, "%H:%M").is_ok()
    {
        return Ok(());
    }

    let mut err = ValidationError::new("overlay_time");
    err.message = Some(format!("`{value}` must be HH:MM or an RFC 3339 instant").into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_timezone_name() {
        assert!(validate_timezone_name("Asia/Singapore").is_ok());
        assert!(validate_timezone_name("Europe/Monaco").is_ok());
        assert!(validate_timezone_name("UTC").is_ok());

        assert!(validate_timezone_name("Mars/Olympus").is_err());
        assert!(validate_timezone_name("").is_err());
        assert!(validate_timezone_name("+08:00").is_err());
    }

    #[test]
    fn test_validate_date_key() {
        assert!(validate_date_key("2024-03-01").is_ok());
        assert!(validate_date_key("2024-3-1").is_err());
        assert!(validate_date_key("01-03-2024").is_err());
        assert!(validate_date_key("Friday").is_err());
    }

    #[test]
    fn test_validate_overlay_time() {
        assert!(validate_overlay_time("13:00").is_ok());
        assert!(validate_overlay_time("07:30").is_ok());
        assert!(validate_overlay_time("2024-03-01T13:00:00+08:00").is_ok());
        assert!(validate_overlay_time("2024-03-01T05:00:00Z").is_ok());

        assert!(validate_overlay_time("25:00").is_err());
        assert!(validate_overlay_time("1pm").is_err());
        assert!(validate_overlay_time("").is_err());
    }
}
