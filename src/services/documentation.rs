use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Pitwall Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_countdown,
        crate::routes::public::get_weekend,
        crate::routes::operator::replace_schedule,
        crate::routes::operator::get_overlay,
        crate::routes::operator::patch_overlay,
        crate::routes::operator::reset_overlay,
        crate::routes::operator::get_history,
        crate::routes::operator::rollback,
        crate::routes::operator::sync_remote,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::public::CountdownResponse,
            crate::dto::public::CountdownPhaseView,
            crate::dto::public::WeekendResponse,
            crate::dto::public::SessionView,
            crate::dto::public::ReconciledSessionView,
            crate::dto::public::DayOverlayView,
            crate::dto::operator::ReplaceScheduleRequest,
            crate::dto::operator::SessionInput,
            crate::dto::operator::OverlayPatchRequest,
            crate::dto::operator::DayPatchInput,
            crate::dto::operator::OverlayView,
            crate::dto::operator::OverlayDayView,
            crate::dto::operator::RollbackRequest,
            crate::dto::operator::CommitView,
            crate::dto::operator::SyncResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only countdown and weekend views"),
        (name = "operator", description = "Gated schedule and overlay mutations"),
    )
)]
pub struct ApiDoc;
