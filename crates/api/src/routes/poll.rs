use axum::routing::post;
use axum::Router;

use crate::handlers::poll;
use crate::state::AppState;

/// Routes mounted at the `/api/v1` root.
///
/// ```text
/// POST /poll   -> poll
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/poll", post(poll::poll))
}
