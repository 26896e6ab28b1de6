use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether a schedule document has been ingested.
    pub schedule_loaded: bool,
    /// Most recent commit version; 0 while the log is empty.
    pub last_commit_version: u64,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(schedule_loaded: bool, last_commit_version: u64) -> Self {
        Self {
            status: "ok".to_string(),
            schedule_loaded,
            last_commit_version,
        }
    }

    /// Create a health response indicating the durable layer is failing.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            schedule_loaded: false,
            last_commit_version: 0,
        }
    }
}
