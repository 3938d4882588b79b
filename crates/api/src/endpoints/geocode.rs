//! Reverse geocoding endpoint.

use axum::{Json, Router, extract::State, routing::post};
use communitywatch_common::{AppResult, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReverseGeocodeResponse {
    pub address: String,
}

/// Address for a map click. Lookup failures come back as placeholder text.
async fn reverse_geocode(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReverseGeocodeRequest>,
) -> AppResult<Json<ReverseGeocodeResponse>> {
    let point = GeoPoint::from_parts(req.lat, req.lng)?;
    let address = state.geocoding_service.describe(point).await;
    Ok(Json(ReverseGeocodeResponse { address }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reverse-geocode", post(reverse_geocode))
}
