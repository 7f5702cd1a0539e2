use axum::routing::{get, post};
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// POST   /                 -> submit
/// GET    /{id}             -> get_by_id
/// POST   /{id}/complete    -> complete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(requests::submit))
        .route("/{id}", get(requests::get_by_id))
        .route("/{id}/complete", post(requests::complete))
}
