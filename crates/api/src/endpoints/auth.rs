//! Authentication endpoints.

use axum::{Router, extract::State, routing::post};
use communitywatch_common::AppResult;
use communitywatch_core::{LoginInput, PublicUser, RegisterInput};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::{self, ApiResponse, Empty},
};

/// Register response.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterInput>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let user = state.user_service.register(req).await?;

    Ok(ApiResponse::created(RegisterResponse {
        user: PublicUser::from(&user),
    }))
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Verify credentials and hand out a bearer token.
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginInput>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let (user, token) = state.user_service.login(req).await?;

    Ok(ApiResponse::ok(LoginResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

/// Rotate the caller's token so the current one stops working.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Empty>> {
    state.user_service.logout(user).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}
