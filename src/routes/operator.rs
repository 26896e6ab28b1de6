use axum::{
    Json, Router,
    body::Body,
    extract::{Extension, Query, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dto::operator::{
        CommitView, OverlayPatchRequest, OverlayView, ReplaceScheduleRequest, RollbackRequest,
        SyncResponse,
    },
    error::AppError,
    services::operator_service,
    state::SharedState,
};

const OPERATOR_ID_HEADER: &str = "x-operator-id";

/// Identity established by the ingress and checked against the access gate.
#[derive(Debug, Clone)]
pub struct OperatorIdentity(pub String);

/// Operator-only endpoints for editing the schedule and overlay.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/operator/schedule", put(replace_schedule))
        .route("/operator/overlay", get(get_overlay).patch(patch_overlay))
        .route("/operator/overlay/reset", post(reset_overlay))
        .route("/operator/history", get(get_history))
        .route("/operator/rollback", post(rollback))
        .route("/operator/sync", post(sync_remote))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_operator_identity,
        ))
}

#[utoipa::path(
    put,
    path = "/operator/schedule",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    request_body = ReplaceScheduleRequest,
    responses(
        (status = 200, description = "Schedule replaced", body = CommitView),
        (status = 400, description = "Invalid schedule"),
        (status = 409, description = "Stale expected version")
    )
)]
/// Replace the schedule document wholesale with ingestion output.
pub async fn replace_schedule(
    State(state): State<SharedState>,
    Extension(OperatorIdentity(identity)): Extension<OperatorIdentity>,
    Json(request): Json<ReplaceScheduleRequest>,
) -> Result<Json<CommitView>, AppError> {
    request.validate()?;
    let payload = operator_service::replace_schedule(&state, &identity, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/operator/overlay",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    responses((status = 200, description = "Overlay as stored", body = OverlayView))
)]
/// Return the overlay exactly as stored, with UTC instants.
pub async fn get_overlay(
    State(state): State<SharedState>,
) -> Result<Json<OverlayView>, AppError> {
    Ok(Json(operator_service::get_overlay(&state).await?))
}

#[utoipa::path(
    patch,
    path = "/operator/overlay",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    request_body = OverlayPatchRequest,
    responses(
        (status = 200, description = "Patch committed", body = CommitView),
        (status = 400, description = "Malformed dates or times")
    )
)]
/// Set or clear individual day times; omitted fields are left unchanged.
pub async fn patch_overlay(
    State(state): State<SharedState>,
    Extension(OperatorIdentity(identity)): Extension<OperatorIdentity>,
    Json(request): Json<OverlayPatchRequest>,
) -> Result<Json<CommitView>, AppError> {
    request.validate()?;
    let payload = operator_service::apply_overlay_patch(&state, &identity, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/operator/overlay/reset",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    responses((status = 200, description = "Overlay reset committed", body = CommitView))
)]
/// Reset the overlay to its documented default (no configured days).
pub async fn reset_overlay(
    State(state): State<SharedState>,
    Extension(OperatorIdentity(identity)): Extension<OperatorIdentity>,
) -> Result<Json<CommitView>, AppError> {
    let payload = operator_service::reset_overlay(&state, &identity).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/operator/history",
    tag = "operator",
    params(
        ("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list"),
        crate::dto::operator::HistoryQuery
    ),
    responses((status = 200, description = "Commit history, most recent first", body = [CommitView]))
)]
/// Return the commit history, most recent first.
pub async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<crate::dto::operator::HistoryQuery>,
) -> Result<Json<Vec<CommitView>>, AppError> {
    let payload = operator_service::get_history(&state, query.limit).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/operator/rollback",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    request_body = RollbackRequest,
    responses(
        (status = 200, description = "Rollback committed", body = CommitView),
        (status = 404, description = "Unknown target version")
    )
)]
/// Restore both stores to a previous commit by appending a forward commit.
pub async fn rollback(
    State(state): State<SharedState>,
    Extension(OperatorIdentity(identity)): Extension<OperatorIdentity>,
    Json(request): Json<RollbackRequest>,
) -> Result<Json<CommitView>, AppError> {
    let payload = operator_service::rollback(&state, &identity, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/operator/sync",
    tag = "operator",
    params(("X-Operator-Id" = String, Header, description = "Operator identity checked against the allow-list")),
    responses(
        (status = 200, description = "Fast-forward sync outcome", body = SyncResponse),
        (status = 409, description = "Diverged histories"),
        (status = 503, description = "Remote timed out")
    )
)]
/// Fast-forward sync the commit log against the configured remote mirror.
pub async fn sync_remote(
    State(state): State<SharedState>,
    Extension(OperatorIdentity(identity)): Extension<OperatorIdentity>,
) -> Result<Json<SyncResponse>, AppError> {
    let payload = operator_service::sync_remote(&state, &identity).await?;
    Ok(Json(payload))
}

/// Require the operator identity header and check it against the access gate
/// before any handler runs.
async fn require_operator_identity(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .headers()
        .get(OPERATOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing operator header `X-Operator-Id`".into())
        })?;

    state.ensure_authorized(&identity).map_err(AppError::from)?;

    req.extensions_mut().insert(OperatorIdentity(identity));
    Ok(next.run(req).await)
}
