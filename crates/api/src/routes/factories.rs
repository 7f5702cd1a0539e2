use axum::routing::post;
use axum::Router;

use crate::handlers::factories;
use crate::state::AppState;

/// Routes mounted at `/factories`.
///
/// ```text
/// POST   /                   -> register
/// POST   /{name}/browsers    -> add_browser
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(factories::register))
        .route("/{name}/browsers", post(factories::add_browser))
}
