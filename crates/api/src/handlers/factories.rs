//! Handlers for the `/factories` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use shotserver_core::dispatch::model::{NewBrowser, NewFactory, ScreenSize};
use shotserver_core::dispatch::PollError;
use shotserver_core::error::CoreError;
use shotserver_core::registration::{validate_browser, validate_factory_name, validate_screens};

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for registering a factory.
#[derive(Debug, Deserialize)]
pub struct RegisterFactory {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub screen_sizes: Vec<ScreenSize>,
    #[serde(default)]
    pub color_depths: Vec<i32>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/factories
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterFactory>,
) -> AppResult<impl IntoResponse> {
    validate_factory_name(&input.name)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_screens(&input.screen_sizes, &input.color_depths)?;

    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let factory = state
        .store
        .create_factory(&NewFactory {
            name: input.name,
            password_hash,
            screen_sizes: input.screen_sizes,
            color_depths: input.color_depths,
        })
        .await?;

    tracing::info!(factory_id = factory.id, factory = %factory.name, "Factory registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: factory })))
}

/// POST /api/v1/factories/{name}/browsers
pub async fn add_browser(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<NewBrowser>,
) -> AppResult<impl IntoResponse> {
    validate_browser(&input)?;

    let factory = state
        .store
        .find_factory_by_name(&name)
        .await?
        .ok_or(PollError::UnknownFactory(name))?;

    let browser = state.store.add_browser(factory.id, &input).await?;

    tracing::info!(
        factory = %factory.name,
        browser = %browser.browser_group,
        version = %browser.version,
        "Browser registered",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: browser })))
}
