pub mod factories;
pub mod health;
pub mod poll;
pub mod requests;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /poll                               factory poll for work (POST)
///
/// /requests                           submit a request group (POST)
/// /requests/{id}                      request state incl. lease holder
/// /requests/{id}/complete             lease holder marks done (POST)
///
/// /factories                          register a factory (POST)
/// /factories/{name}/browsers          register a browser variant (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(poll::router())
        .nest("/requests", requests::router())
        .nest("/factories", factories::router())
}
