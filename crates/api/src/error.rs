use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shotserver_core::dispatch::{AuthError, PollError, StoreError};
use shotserver_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store and poll errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// The factory polled but nothing it can serve is queued.
    #[error("No matching request")]
    NoMatchingRequest,

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

fn internal(error: &dyn std::fmt::Display) -> Classified {
    tracing::error!(error = %error, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        StoreError::Core(core) => classify_core(core),
        StoreError::Backend(_) => internal(err),
    }
}

fn classify_poll(err: &PollError) -> Classified {
    match err {
        PollError::UnknownFactory(_) => (StatusCode::NOT_FOUND, "UNKNOWN_FACTORY", err.to_string()),
        PollError::Authentication(AuthError::InvalidCredentials(_)) => {
            (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string())
        }
        PollError::Authentication(AuthError::Internal(_)) => internal(err),
        PollError::NoMatchingBrowser(_) => {
            (StatusCode::CONFLICT, "NO_MATCHING_BROWSER", err.to_string())
        }
        PollError::Store(store) => classify_store(store),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Store(store) => classify_store(store),
            AppError::Poll(poll) => classify_poll(poll),
            AppError::NoMatchingRequest => (
                StatusCode::NOT_FOUND,
                "NO_MATCHING_REQUEST",
                self.to_string(),
            ),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
