//! Notification endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use communitywatch_common::AppResult;
use communitywatch_core::{NotificationPage, NotificationView};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, QueryParams},
    middleware::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SinceParams {
    /// Unix seconds; `0` returns everything.
    pub since: f64,
}

/// Notifications newer than `since`, oldest first.
async fn poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SinceParams>,
) -> AppResult<Json<Vec<NotificationView>>> {
    let items = state
        .notification_service
        .since(&user.id, params.since)
        .await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "first_page")]
    pub page: u64,
}

const fn first_page() -> u64 {
    1
}

/// Paginated history, newest first.
async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HistoryParams>,
) -> AppResult<Json<NotificationPage>> {
    let page = state
        .notification_service
        .history(&user.id, params.page)
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(poll))
        .route("/notification-history", get(history))
}
