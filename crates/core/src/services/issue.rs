//! Issue service: reporting, upvotes, status changes and comments.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use communitywatch_common::{
    AppError, AppResult, FieldErrors, GeoPoint, IdGenerator, error::field_errors, sanitize_html,
};
use communitywatch_db::{
    entities::{
        comment,
        issue::{self, IssueStatus},
        upvote, user,
    },
    repositories::{CommentRepository, IssueRepository, UpvoteRepository, UserRepository},
};
use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use super::ai::{AiService, EmbeddingTask};
use super::notification::{NotificationPayload, NotificationService};
use super::reputation::{REPORT_POINTS, resolution_bonus, toggle_outcome};
use super::user::PublicUser;

/// Report categories, alphabetical with `Other` last.
pub const ISSUE_CATEGORIES: &[&str] = &[
    "Blocked Drainage",
    "Broken Park Bench",
    "Broken Streetlight",
    "Broken Traffic Light",
    "Damaged Public Property",
    "Faded Road Markings",
    "Fallen Tree",
    "Flooding",
    "Graffiti",
    "Leaking Pipe",
    "Overgrown Vegetation",
    "Pothole",
    "Power Line Down",
    "Stray Animal Concern",
    "Waste Dumping",
    "Other",
];

/// Input for reporting a new issue.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ReportIssueInput {
    pub category: String,

    #[validate(length(min = 1, max = 500, message = "Description must be 1 to 500 characters."))]
    pub description: String,

    #[validate(length(min = 1, max = 200, message = "Location must be 1 to 200 characters."))]
    pub location_text: String,

    /// GeoJSON geometry as a JSON string.
    #[validate(length(max = 1000, message = "GeoJSON must be at most 1000 characters."))]
    pub geojson: Option<String>,

    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Input for commenting on an issue.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 500, message = "Comment must be 1 to 500 characters."))]
    pub body: String,
}

/// Result of an upvote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpvoteResult {
    pub upvote_count: i32,
    pub voted: bool,
}

/// One map marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapIssue {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub upvotes: i32,
    pub user_has_voted: bool,
    pub status: IssueStatus,
}

/// A comment with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: String,
    pub body: String,
    pub author_id: String,
    pub author: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

/// An issue with its reporter and comments, oldest comment first.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    pub issue: issue::Model,
    pub reporter: Option<PublicUser>,
    pub comments: Vec<CommentView>,
}

/// Parse a status label such as `In Progress`.
pub fn parse_status(raw: &str) -> AppResult<IssueStatus> {
    match raw.trim() {
        "Reported" => Ok(IssueStatus::Reported),
        "In Progress" => Ok(IssueStatus::InProgress),
        "Resolved" => Ok(IssueStatus::Resolved),
        _ => Err(AppError::field("status", "Invalid status.")),
    }
}

/// Issue service for business logic.
#[derive(Clone)]
pub struct IssueService {
    issue_repo: IssueRepository,
    user_repo: UserRepository,
    upvote_repo: UpvoteRepository,
    comment_repo: CommentRepository,
    notifications: NotificationService,
    ai: AiService,
    id_gen: IdGenerator,
}

impl IssueService {
    /// Create a new issue service.
    #[must_use]
    pub const fn new(
        issue_repo: IssueRepository,
        user_repo: UserRepository,
        upvote_repo: UpvoteRepository,
        comment_repo: CommentRepository,
        notifications: NotificationService,
        ai: AiService,
    ) -> Self {
        Self {
            issue_repo,
            user_repo,
            upvote_repo,
            comment_repo,
            notifications,
            ai,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a new report and credit its author.
    pub async fn report(
        &self,
        reporter: &user::Model,
        input: ReportIssueInput,
    ) -> AppResult<issue::Model> {
        let mut fields = input
            .validate()
            .map_or_else(|e| field_errors(&e), |()| FieldErrors::new());

        if !ISSUE_CATEGORIES.contains(&input.category.as_str()) {
            fields.insert("category".to_string(), vec!["Not a valid choice.".to_string()]);
        }

        let description = sanitize_html(&input.description);
        if description.trim().is_empty() && !fields.contains_key("description") {
            fields.insert(
                "description".to_string(),
                vec!["This field is required.".to_string()],
            );
        }

        let location_text = input.location_text.trim().to_string();
        if location_text.is_empty() && !fields.contains_key("location_text") {
            fields.insert(
                "location_text".to_string(),
                vec!["This field is required.".to_string()],
            );
        }

        let geojson = match input.geojson.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() && !fields.contains_key("geojson") => {
                match serde_json::from_str::<Value>(raw) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        fields.insert(
                            "geojson".to_string(),
                            vec!["Invalid GeoJSON.".to_string()],
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        if !fields.is_empty() {
            return Err(AppError::InvalidFields(fields));
        }

        let point = GeoPoint::from_parts(input.lat, input.lng)?;

        let embedding = self
            .ai
            .embed(
                &format!("{}: {description}", input.category),
                EmbeddingTask::Document,
            )
            .await;
        if embedding.is_none() {
            debug!("Storing report without an embedding");
        }

        let model = issue::ActiveModel {
            id: Set(self.id_gen.generate()),
            category: Set(input.category),
            description: Set(description),
            latitude: Set(point.lat),
            longitude: Set(point.lng),
            location_text: Set(Some(location_text)),
            status: Set(IssueStatus::Reported),
            upvote_count: Set(0),
            embedding: Set(embedding.map(Value::from)),
            geojson: Set(geojson),
            reporter_id: Set(reporter.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let created = self.issue_repo.create(model).await?;
        self.user_repo
            .add_reputation(&reporter.id, REPORT_POINTS)
            .await?;

        info!(
            issue_id = %created.id,
            reporter_id = %reporter.id,
            category = %created.category,
            "Issue reported"
        );
        Ok(created)
    }

    /// Get an issue by ID.
    pub async fn get(&self, issue_id: &str) -> AppResult<issue::Model> {
        self.issue_repo.get_by_id(issue_id).await
    }

    /// Add or remove the voter's upvote and move the reporter's reputation.
    pub async fn toggle_upvote(&self, voter_id: &str, issue_id: &str) -> AppResult<UpvoteResult> {
        let issue = self.issue_repo.get_by_id(issue_id).await?;
        let existing = self
            .upvote_repo
            .find_by_voter_and_issue(voter_id, issue_id)
            .await?;
        let outcome = toggle_outcome(existing.is_some());

        if let Some(vote) = existing {
            self.upvote_repo.delete(vote).await?;
            self.issue_repo.decrement_upvote_count(issue_id).await?;
        } else {
            let vote = upvote::ActiveModel {
                id: Set(self.id_gen.generate()),
                voter_id: Set(voter_id.to_string()),
                issue_id: Set(issue_id.to_string()),
                created_at: Set(Utc::now().into()),
            };
            self.upvote_repo.create(vote).await?;
            self.issue_repo.increment_upvote_count(issue_id).await?;
        }

        self.user_repo
            .add_reputation(&issue.reporter_id, outcome.reputation_delta)
            .await?;

        let upvote_count = self.issue_repo.get_by_id(issue_id).await?.upvote_count;
        debug!(issue_id = %issue_id, voter_id = %voter_id, voted = outcome.voted, "Upvote toggled");

        Ok(UpvoteResult {
            upvote_count,
            voted: outcome.voted,
        })
    }

    /// Change an issue's status and notify everyone involved.
    ///
    /// The reporter and every upvoter get one notification each.
    pub async fn update_status(
        &self,
        actor: &user::Model,
        issue_id: &str,
        status: IssueStatus,
    ) -> AppResult<issue::Model> {
        if !actor.is_moderator {
            return Err(AppError::Forbidden("Permission denied".to_string()));
        }

        let issue = self.issue_repo.get_by_id(issue_id).await?;
        let previous = issue.status;
        let updated = self.issue_repo.update_status(issue, status).await?;

        let bonus = resolution_bonus(previous, status);
        if bonus > 0 {
            self.user_repo
                .add_reputation(&updated.reporter_id, bonus)
                .await?;
        }

        let mut recipients = vec![updated.reporter_id.clone()];
        for voter_id in self.upvote_repo.find_voter_ids(issue_id).await? {
            if !recipients.contains(&voter_id) {
                recipients.push(voter_id);
            }
        }

        let payload = NotificationPayload::StatusUpdate {
            issue_id: updated.id.clone(),
            issue_category: updated.category.clone(),
            status,
        };
        for recipient in &recipients {
            self.notifications.notify(recipient, &payload).await?;
        }

        info!(
            issue_id = %updated.id,
            moderator_id = %actor.id,
            from = %previous,
            to = %status,
            notified = recipients.len(),
            "Issue status updated"
        );
        Ok(updated)
    }

    /// Map markers for every issue, flagging the viewer's own votes.
    pub async fn map_issues(&self, viewer_id: Option<&str>) -> AppResult<Vec<MapIssue>> {
        let issues = self.issue_repo.find_all().await?;
        let voted: HashSet<String> = match viewer_id {
            Some(id) => self
                .upvote_repo
                .find_issue_ids_by_voter(id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        Ok(issues
            .into_iter()
            .map(|issue| MapIssue {
                user_has_voted: voted.contains(&issue.id),
                id: issue.id,
                lat: issue.latitude,
                lng: issue.longitude,
                title: issue.category,
                upvotes: issue.upvote_count,
                status: issue.status,
            })
            .collect())
    }

    /// An issue with its reporter and comments.
    pub async fn detail(&self, issue_id: &str) -> AppResult<IssueDetail> {
        let issue = self.issue_repo.get_by_id(issue_id).await?;
        let reporter = self
            .user_repo
            .find_by_id(&issue.reporter_id)
            .await?
            .as_ref()
            .map(PublicUser::from);

        let comments = self.comment_repo.find_by_issue(issue_id).await?;
        let mut authors: HashMap<String, Option<String>> = HashMap::new();
        for comment in &comments {
            if !authors.contains_key(&comment.author_id) {
                let name = self
                    .user_repo
                    .find_by_id(&comment.author_id)
                    .await?
                    .map(|u| u.username);
                authors.insert(comment.author_id.clone(), name);
            }
        }

        let comments = comments
            .into_iter()
            .map(|c| CommentView {
                author: authors.get(&c.author_id).cloned().flatten(),
                id: c.id,
                body: c.body,
                author_id: c.author_id,
                created_at: c.created_at,
            })
            .collect();

        Ok(IssueDetail {
            issue,
            reporter,
            comments,
        })
    }

    /// Add a sanitized comment to an issue.
    pub async fn add_comment(
        &self,
        author: &user::Model,
        issue_id: &str,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let body = sanitize_html(&input.body);
        if body.trim().is_empty() {
            return Err(AppError::field("body", "This field is required."));
        }

        self.issue_repo.get_by_id(issue_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            body: Set(body),
            issue_id: Set(issue_id.to_string()),
            author_id: Set(author.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;
        info!(issue_id = %issue_id, author_id = %author.id, "Comment added");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::StubModel;
    use communitywatch_db::entities::notification::{self, NotificationName};
    use communitywatch_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, reputation: i32, moderator: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            username_lower: format!("user_{id}"),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            token: None,
            reputation_points: reputation,
            is_moderator: moderator,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_issue(id: &str, status: IssueStatus, upvotes: i32) -> issue::Model {
        issue::Model {
            id: id.to_string(),
            category: "Pothole".to_string(),
            description: "Deep pothole".to_string(),
            latitude: 10.0,
            longitude: 20.0,
            location_text: Some("Main St".to_string()),
            status,
            upvote_count: upvotes,
            embedding: None,
            geojson: None,
            reporter_id: "reporter".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn stored_notification(id: &str, user_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: NotificationName::StatusUpdate,
            data: serde_json::json!({}),
            created_at: Utc::now().into(),
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn service_on(db: &Arc<DatabaseConnection>, model: StubModel) -> IssueService {
        IssueService::new(
            IssueRepository::new(Arc::clone(db)),
            UserRepository::new(Arc::clone(db)),
            UpvoteRepository::new(Arc::clone(db)),
            CommentRepository::new(Arc::clone(db)),
            NotificationService::new(NotificationRepository::new(Arc::clone(db))),
            AiService::new(Arc::new(model)),
        )
    }

    fn service(db: MockDatabase) -> IssueService {
        service_on(&Arc::new(db.into_connection()), StubModel::default())
    }

    fn logged_statements(db: Arc<DatabaseConnection>) -> Vec<String> {
        Arc::into_inner(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .map(|t| format!("{t:?}"))
            .collect()
    }

    fn reputation_updates(statements: &[String]) -> Vec<&String> {
        statements
            .iter()
            .filter(|s| s.contains("reputation_points"))
            .collect()
    }

    fn report_input() -> ReportIssueInput {
        ReportIssueInput {
            category: "Pothole".to_string(),
            description: "<p>Deep <b>pothole</b></p>".to_string(),
            location_text: "Main St".to_string(),
            geojson: None,
            lat: Some(10.0),
            lng: Some(20.0),
        }
    }

    #[test]
    fn test_categories_sorted_with_other_last() {
        let (other, named) = ISSUE_CATEGORIES.split_last().unwrap();
        assert_eq!(*other, "Other");
        assert_eq!(named.len(), 15);
        assert!(named.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("In Progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(parse_status("Resolved").unwrap(), IssueStatus::Resolved);
        assert!(matches!(
            parse_status("Closed"),
            Err(AppError::InvalidFields(_))
        ));
    }

    #[tokio::test]
    async fn test_report_field_errors() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let input = ReportIssueInput {
            category: "Volcano".to_string(),
            description: String::new(),
            location_text: "x".repeat(201),
            geojson: Some("{not json".to_string()),
            lat: Some(10.0),
            lng: Some(20.0),
        };

        let Err(AppError::InvalidFields(fields)) = svc.report(&create_test_user("r", 0, false), input).await
        else {
            panic!("expected field errors");
        };

        assert!(fields.contains_key("category"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("location_text"));
        assert_eq!(fields["geojson"], vec!["Invalid GeoJSON."]);
    }

    #[tokio::test]
    async fn test_report_missing_coordinates() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let input = ReportIssueInput {
            lng: None,
            ..report_input()
        };

        let result = svc.report(&create_test_user("r", 0, false), input).await;

        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Missing coordinates"));
    }

    #[tokio::test]
    async fn test_report_blank_location_is_required() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let input = ReportIssueInput {
            location_text: "   ".to_string(),
            ..report_input()
        };

        let Err(AppError::InvalidFields(fields)) = svc.report(&create_test_user("r", 0, false), input).await
        else {
            panic!("expected field errors");
        };

        assert_eq!(fields["location_text"], vec!["This field is required."]);
    }

    #[tokio::test]
    async fn test_report_without_embedding() {
        let mut created = create_test_issue("i1", IssueStatus::Reported, 0);
        created.description = "<p>Deep pothole</p>".to_string();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created]])
                .append_exec_results([exec_ok()])
                .into_connection(),
        );
        let svc = service_on(&db, StubModel::default());

        let issue = svc
            .report(&create_test_user("reporter", 0, false), report_input())
            .await
            .unwrap();

        assert_eq!(issue.id, "i1");
        assert_eq!(issue.status, IssueStatus::Reported);

        drop(svc);
        let statements = logged_statements(db);
        let insert = statements
            .iter()
            .find(|s| s.contains("INSERT INTO \\\"issue\\\""))
            .unwrap();
        assert!(!insert.contains("Json(Some("));
        assert!(insert.contains("\"Main St\""));

        let reputation = reputation_updates(&statements);
        assert_eq!(reputation.len(), 1);
        assert!(reputation[0].contains("Int(Some(5))"));
        assert!(reputation[0].contains("\"reporter\""));
    }

    #[tokio::test]
    async fn test_report_stores_embedding() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 0)]])
                .append_exec_results([exec_ok()])
                .into_connection(),
        );
        let svc = service_on(&db, StubModel::with_embedding(vec![0.5, 0.25]));

        svc.report(&create_test_user("reporter", 0, false), report_input())
            .await
            .unwrap();

        drop(svc);
        let statements = logged_statements(db);
        let insert = statements
            .iter()
            .find(|s| s.contains("INSERT INTO \\\"issue\\\""))
            .unwrap();
        assert!(insert.contains("Json(Some("));
        assert!(insert.contains("0.25"));
    }

    #[tokio::test]
    async fn test_toggle_upvote_adds_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 0)]])
                .append_query_results([Vec::<upvote::Model>::new()])
                .append_query_results([[upvote::Model {
                    id: "v1".to_string(),
                    voter_id: "voter".to_string(),
                    issue_id: "i1".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 1)]])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );
        let svc = service_on(&db, StubModel::default());

        let result = svc.toggle_upvote("voter", "i1").await.unwrap();

        assert_eq!(
            result,
            UpvoteResult {
                upvote_count: 1,
                voted: true
            }
        );

        drop(svc);
        let statements = logged_statements(db);
        let reputation = reputation_updates(&statements);
        assert_eq!(reputation.len(), 1);
        assert!(reputation[0].contains("Int(Some(2))"));
        assert!(reputation[0].contains("\"reporter\""));
        assert!(!reputation[0].contains("\"voter\""));
    }

    #[tokio::test]
    async fn test_toggle_upvote_removes_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 1)]])
                .append_query_results([[upvote::Model {
                    id: "v1".to_string(),
                    voter_id: "voter".to_string(),
                    issue_id: "i1".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 0)]])
                .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
                .into_connection(),
        );
        let svc = service_on(&db, StubModel::default());

        let result = svc.toggle_upvote("voter", "i1").await.unwrap();

        assert_eq!(
            result,
            UpvoteResult {
                upvote_count: 0,
                voted: false
            }
        );

        drop(svc);
        let statements = logged_statements(db);
        let reputation = reputation_updates(&statements);
        assert_eq!(reputation.len(), 1);
        assert!(reputation[0].contains("Int(Some(-2))"));
        assert!(reputation[0].contains("\"reporter\""));
    }

    #[tokio::test]
    async fn test_toggle_upvote_missing_issue() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<issue::Model>::new()]);
        let svc = service(db);

        let result = svc.toggle_upvote("voter", "nope").await;

        assert!(matches!(result, Err(AppError::IssueNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status_requires_moderator() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .update_status(&create_test_user("u", 0, false), "i1", IssueStatus::Resolved)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(msg)) if msg == "Permission denied"));
    }

    #[tokio::test]
    async fn test_resolve_grants_bonus_and_notifies_once_each() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 2)]])
                .append_query_results([[create_test_issue("i1", IssueStatus::Resolved, 2)]])
                .append_query_results([vec![
                    maplit::btreemap! { "voter_id" => sea_orm::Value::from("reporter") },
                    maplit::btreemap! { "voter_id" => sea_orm::Value::from("fan") },
                ]])
                .append_query_results([[stored_notification("n1", "reporter")]])
                .append_query_results([[stored_notification("n2", "fan")]])
                .append_exec_results([exec_ok()])
                .into_connection(),
        );
        let svc = service_on(&db, StubModel::default());

        let updated = svc
            .update_status(&create_test_user("mod", 0, true), "i1", IssueStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(updated.status, IssueStatus::Resolved);

        drop(svc);
        let log = format!("{:?}", Arc::into_inner(db).unwrap().into_transaction_log());
        assert!(log.contains("reputation_points"));
        assert!(log.contains("Int(Some(20))"));
        assert_eq!(log.matches("INSERT INTO \\\"notification\\\"").count(), 2);
    }

    #[tokio::test]
    async fn test_map_issues_flags_votes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                create_test_issue("i1", IssueStatus::Reported, 3),
                create_test_issue("i2", IssueStatus::Resolved, 0),
            ]])
            .append_query_results([vec![
                maplit::btreemap! { "issue_id" => sea_orm::Value::from("i2") },
            ]]);
        let svc = service(db);

        let markers = svc.map_issues(Some("viewer")).await.unwrap();

        assert_eq!(markers.len(), 2);
        assert!(!markers[0].user_has_voted);
        assert_eq!(markers[0].upvotes, 3);
        assert_eq!(markers[0].title, "Pothole");
        assert!(markers[1].user_has_voted);
    }

    #[tokio::test]
    async fn test_detail_resolves_authors() {
        let comment = |id: &str, author: &str| comment::Model {
            id: id.to_string(),
            body: "Still there".to_string(),
            issue_id: "i1".to_string(),
            author_id: author.to_string(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_issue("i1", IssueStatus::Reported, 0)]])
            .append_query_results([[create_test_user("reporter", 5, false)]])
            .append_query_results([vec![comment("c1", "a"), comment("c2", "a")]])
            .append_query_results([[create_test_user("a", 0, false)]]);
        let svc = service(db);

        let detail = svc.detail("i1").await.unwrap();

        assert_eq!(detail.reporter.unwrap().username, "user_reporter");
        assert_eq!(detail.comments.len(), 2);
        assert!(detail.comments.iter().all(|c| c.author.as_deref() == Some("user_a")));
    }

    #[tokio::test]
    async fn test_add_comment_rejects_empty_after_sanitizing() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .add_comment(
                &create_test_user("a", 0, false),
                "i1",
                CommentInput {
                    body: "<script>alert(1)</script>".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidFields(_))));
    }

    #[tokio::test]
    async fn test_add_comment_too_long() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .add_comment(
                &create_test_user("a", 0, false),
                "i1",
                CommentInput {
                    body: "x".repeat(501),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidFields(_))));
    }
}
