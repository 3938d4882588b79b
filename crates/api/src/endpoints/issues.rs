//! Issue endpoints: map, reporting, upvotes, comments and moderation.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use communitywatch_common::{AppResult, GeoPoint};
use communitywatch_core::{
    CommentInput, DuplicateCheck, IssueDetail, MapIssue, ReportIssueInput, UpvoteResult,
    issue::parse_status,
};
use communitywatch_db::entities::{comment, issue};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, JsonBody, MaybeAuthUser, ModeratorUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Map markers for every issue.
async fn map_data(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MapIssue>>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let markers = state.issue_service.map_issues(viewer_id).await?;
    Ok(Json(markers))
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub issue: issue::Model,
}

/// Submit a new issue.
async fn report_issue(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReportIssueInput>,
) -> AppResult<ApiResponse<IssueResponse>> {
    let issue = state.issue_service.report(&user, req).await?;
    Ok(ApiResponse::created(IssueResponse { issue }))
}

/// Toggle the caller's upvote.
async fn upvote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UpvoteResult>> {
    let result = state.issue_service.toggle_upvote(&user.id, &id).await?;
    Ok(ApiResponse::ok(result))
}

/// Issue with reporter and comments.
async fn show_issue(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<IssueDetail>> {
    Ok(Json(state.issue_service.detail(&id).await?))
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub comment: comment::Model,
}

/// Comment on an issue.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.issue_service.add_comment(&user, &id, req).await?;
    Ok(ApiResponse::created(CommentResponse { comment }))
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Change an issue's status. Moderators only.
async fn update_status(
    ModeratorUser(moderator): ModeratorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> AppResult<ApiResponse<IssueResponse>> {
    let status = parse_status(&req.status)?;
    let issue = state
        .issue_service
        .update_status(&moderator, &id, status)
        .await?;
    Ok(ApiResponse::ok(IssueResponse { issue }))
}

/// Draft report to compare against nearby issues.
#[derive(Debug, Deserialize)]
pub struct CheckDuplicatesRequest {
    #[serde(default)]
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Ask whether a draft report repeats a nearby issue.
async fn check_duplicates(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CheckDuplicatesRequest>,
) -> AppResult<Json<DuplicateCheck>> {
    let point = GeoPoint::from_parts(req.lat, req.lng)?;
    let check = state
        .duplicate_service
        .check(&req.description, point)
        .await?;
    Ok(Json(check))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(map_data))
        .route("/report-issue", post(report_issue))
        .route("/upvote/{id}", post(upvote))
        .route("/issue/{id}", get(show_issue).post(add_comment))
        .route("/issue/{id}/update_status", post(update_status))
        .route("/check-duplicates", post(check_duplicates))
}
