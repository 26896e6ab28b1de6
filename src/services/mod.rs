/// OpenAPI document assembly.
pub mod documentation;
/// Health reporting.
pub mod health_service;
/// Mutating operations behind the access gate.
pub mod operator_service;
/// Read-only countdown and weekend projections.
pub mod public_service;

use chrono_tz::Tz;

use crate::{error::ServiceError, state::SharedState};

/// Resolve the display timezone from an optional query value, falling back to
/// the configured default.
pub(crate) fn resolve_display_timezone(
    state: &SharedState,
    requested: Option<&str>,
) -> Result<Tz, ServiceError> {
    match requested {
        Some(name) => name.parse::<Tz>().map_err(|_| {
            ServiceError::InvalidInput(format!("`{name}` is not a known IANA timezone"))
        }),
        None => Ok(state.config().display_timezone),
    }
}
