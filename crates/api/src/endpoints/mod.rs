//! API endpoints.

mod ai;
mod analytics;
mod auth;
mod geocode;
mod issues;
mod notifications;
mod search;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(issues::router())
        .merge(search::router())
        .merge(notifications::router())
        .merge(users::router())
        .merge(geocode::router())
        .merge(ai::router())
        .merge(analytics::router())
}
