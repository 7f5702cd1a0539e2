//! Handler for the factory poll endpoint.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use shotserver_core::dispatch::PollOutcome;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Credentials a factory sends with each poll.
#[derive(Debug, Deserialize)]
pub struct PollRequest {
    pub factory: String,
    pub password: String,
}

/// POST /api/v1/poll
///
/// Authenticate the factory, record its heartbeat, and lease the oldest
/// request it can serve. Returns the assignment, or `NO_MATCHING_REQUEST`
/// when there is nothing to do.
pub async fn poll(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Json(input): Json<PollRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .poll
        .poll(&input.factory, &input.password, remote.ip(), Utc::now())
        .await?;

    match outcome {
        PollOutcome::Assigned(assignment) => Ok(Json(DataResponse { data: assignment })),
        PollOutcome::NoWork => Err(AppError::NoMatchingRequest),
    }
}
