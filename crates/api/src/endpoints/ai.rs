//! AI photo classification endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use communitywatch_common::AppResult;
use communitywatch_core::ImageInput;
use serde::Deserialize;
use serde_json::json;

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
};

/// Base64 image, optionally as a `data:` URL.
#[derive(Debug, Deserialize)]
pub struct ClassifyImageRequest {
    pub image: String,
    pub mime_type: Option<String>,
}

/// Suggest a category and severity for an issue photo.
async fn classify_image(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ClassifyImageRequest>,
) -> AppResult<Response> {
    let image = ImageInput::from_base64(&req.image, req.mime_type.as_deref())?;

    match state.ai_service.classify_image(&image).await {
        Ok(classification) => Ok(Json(classification).into_response()),
        Err(_) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Could not analyze image" })),
        )
            .into_response()),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/classify-image", post(classify_image))
}
