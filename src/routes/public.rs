use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::public::{CountdownResponse, DisplayQuery, WeekendResponse},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints consumed by the dashboard.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/countdown", get(get_countdown))
        .route("/public/weekend", get(get_weekend))
}

#[utoipa::path(
    get,
    path = "/public/countdown",
    tag = "public",
    params(DisplayQuery),
    responses(
        (status = 200, description = "Current countdown state", body = CountdownResponse),
        (status = 404, description = "No schedule ingested")
    )
)]
/// Return the current countdown, localized to the requested display timezone.
pub async fn get_countdown(
    State(state): State<SharedState>,
    Query(query): Query<DisplayQuery>,
) -> Result<Json<CountdownResponse>, AppError> {
    let payload = public_service::get_countdown(&state, query).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/public/weekend",
    tag = "public",
    params(DisplayQuery),
    responses(
        (status = 200, description = "Reconciled weekend view", body = WeekendResponse),
        (status = 404, description = "No schedule ingested")
    )
)]
/// Return every session with its day's operator times attached.
pub async fn get_weekend(
    State(state): State<SharedState>,
    Query(query): Query<DisplayQuery>,
) -> Result<Json<WeekendResponse>, AppError> {
    let payload = public_service::get_weekend(&state, query).await?;
    Ok(Json(payload))
}
