//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use communitywatch_core::{
    AiService, DuplicateService, GenerativeModel, Geocoder, GeocodingService, IssueService,
    NotificationService, ReportService, SearchService, UserService,
};
use communitywatch_db::repositories::{
    CommentRepository, IssueRepository, NotificationRepository, UpvoteRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub issue_service: IssueService,
    pub search_service: SearchService,
    pub duplicate_service: DuplicateService,
    pub report_service: ReportService,
    pub notification_service: NotificationService,
    pub geocoding_service: GeocodingService,
    pub ai_service: AiService,
}

impl AppState {
    /// Wire every service from a connection and the external capabilities.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        model: Arc<dyn GenerativeModel>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let issue_repo = IssueRepository::new(Arc::clone(&db));
        let upvote_repo = UpvoteRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(db);

        let ai_service = AiService::new(Arc::clone(&model));
        let geocoding_service = GeocodingService::new(geocoder);
        let notification_service = NotificationService::new(notification_repo);

        Self {
            user_service: UserService::new(user_repo.clone(), issue_repo.clone()),
            issue_service: IssueService::new(
                issue_repo.clone(),
                user_repo,
                upvote_repo,
                comment_repo,
                notification_service.clone(),
                ai_service.clone(),
            ),
            search_service: SearchService::new(
                issue_repo.clone(),
                ai_service.clone(),
                geocoding_service.clone(),
            ),
            duplicate_service: DuplicateService::new(issue_repo.clone(), model),
            report_service: ReportService::new(issue_repo, ai_service.clone()),
            notification_service,
            geocoding_service,
            ai_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Requests without a valid token pass through
/// anonymously; extractors decide whether that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .map(ToString::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
