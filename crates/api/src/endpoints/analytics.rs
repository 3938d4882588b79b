//! Analytics dashboard and weekly report.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use communitywatch_common::AppResult;
use communitywatch_core::Analytics;
use serde::Serialize;

use crate::middleware::AppState;

async fn analytics(State(state): State<AppState>) -> AppResult<Json<Analytics>> {
    Ok(Json(state.report_service.analytics().await?))
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub report: String,
}

/// Markdown summary of the last seven days.
async fn generate_report(State(state): State<AppState>) -> AppResult<Json<ReportResponse>> {
    let report = state.report_service.weekly_report().await?;
    Ok(Json(ReportResponse { report }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(analytics))
        .route("/generate-report", post(generate_report))
}
