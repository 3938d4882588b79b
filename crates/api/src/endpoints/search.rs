//! Search endpoint.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use communitywatch_common::AppResult;
use communitywatch_core::SearchOutcome;
use serde::Deserialize;

use crate::{extractors::QueryParams, middleware::AppState};

/// Search parameters. Either may be blank, not both.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
    pub loc: String,
}

/// Geo-semantic issue search.
async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> AppResult<Json<SearchOutcome>> {
    let outcome = state.search_service.search(&params.q, &params.loc).await?;
    Ok(Json(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}
