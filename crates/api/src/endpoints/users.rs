//! User profile endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use communitywatch_common::AppResult;
use communitywatch_core::UserProfile;

use crate::{extractors::AuthUser, middleware::AppState};

async fn profile(
    AuthUser(_viewer): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.user_service.profile(&username).await?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/user/{username}", get(profile))
}
