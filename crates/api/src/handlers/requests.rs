//! Handlers for the `/requests` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use shotserver_core::dispatch::model::{NewRequestGroup, PluginRequirements, RequestedBrowser};
use shotserver_core::error::CoreError;
use shotserver_core::registration::{
    validate_expire_minutes, validate_plugins, validate_request_screen,
    validate_requested_browsers,
    DEFAULT_EXPIRE_MINUTES,
};
use shotserver_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::handlers::poll::PollRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for submitting a request group.
#[derive(Debug, Deserialize)]
pub struct SubmitRequestGroup {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bpp: Option<i32>,
    #[serde(default)]
    pub plugins: PluginRequirements,
    /// Lifetime of the group in minutes (default: 30).
    pub expire_minutes: Option<i64>,
    pub browsers: Vec<RequestedBrowser>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/requests
///
/// Queue one request per browser in the group. Returns the created requests.
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<SubmitRequestGroup>,
) -> AppResult<impl IntoResponse> {
    validate_request_screen(input.width, input.height, input.bpp)?;
    validate_requested_browsers(&input.browsers)?;
    validate_plugins(&input.plugins)?;
    let expire_minutes = input.expire_minutes.unwrap_or(DEFAULT_EXPIRE_MINUTES);
    validate_expire_minutes(expire_minutes)?;

    let now = Utc::now();
    let group = NewRequestGroup {
        width: input.width,
        height: input.height,
        bits_per_pixel: input.bpp,
        plugins: input.plugins,
        submitted_at: now,
        expires_at: now + Duration::minutes(expire_minutes),
        browsers: input.browsers,
    };
    let created = state.store.submit_request_group(&group).await?;

    tracing::info!(
        request_group_id = created.first().map(|r| r.request_group_id),
        count = created.len(),
        "Request group submitted",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/requests/{id}
///
/// Current state of a request, including its lease holder.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .store
        .find_request(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Request",
            id,
        }))?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{id}/complete
///
/// Mark a request done. Only the factory currently holding the lease may
/// complete it.
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PollRequest>,
) -> AppResult<impl IntoResponse> {
    let factory = state.poll.authenticate(&input.factory, &input.password).await?;

    if state.store.find_leased_request(id, factory.id).await?.is_none() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Request {id} is not leased by factory '{}'",
            factory.name
        ))));
    }
    if !state.store.mark_completed(id, factory.id, Utc::now()).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Request {id} is already completed"
        ))));
    }

    let request = state
        .store
        .find_request(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Request",
            id,
        }))?;
    tracing::info!(request_id = id, factory = %factory.name, "Request completed");
    Ok(Json(DataResponse { data: request }))
}
