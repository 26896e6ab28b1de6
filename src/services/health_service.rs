//! Health reporting backed by a cheap probe of the commit log.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness plus the durable layer's status.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.gateway().last_version().await {
        Ok(version) => {
            let schedule_loaded = state.gateway().schedule().load().await.is_some();
            HealthResponse::ok(schedule_loaded, version)
        }
        Err(err) => {
            warn!(error = %err, "commit log probe failed");
            HealthResponse::degraded()
        }
    }
}
