//! Duplicate report detection.

use std::sync::Arc;

use communitywatch_common::{AppResult, GeoPoint};
use communitywatch_db::repositories::IssueRepository;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::ai::{GenerativeModel, strip_code_fences};
use super::matcher::filter_within;

/// Box half-width, in degrees, for nearby-issue lookup.
pub const DUPLICATE_RADIUS_DEG: f64 = 0.001;

/// A nearby issue offered to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCandidate {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Outcome of a duplicate check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_title: Option<String>,
}

impl DuplicateCheck {
    /// Not a duplicate.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Duplicate detection service.
#[derive(Clone)]
pub struct DuplicateService {
    issue_repo: IssueRepository,
    model: Arc<dyn GenerativeModel>,
}

impl DuplicateService {
    /// Create a new duplicate detection service.
    #[must_use]
    pub fn new(issue_repo: IssueRepository, model: Arc<dyn GenerativeModel>) -> Self {
        Self { issue_repo, model }
    }

    /// Check a draft report against the issues right around `point`.
    pub async fn check(&self, description: &str, point: GeoPoint) -> AppResult<DuplicateCheck> {
        let bbox = point.bounding_box(DUPLICATE_RADIUS_DEG);
        let nearby = filter_within(self.issue_repo.find_in_bbox(&bbox).await?, &bbox);

        let candidates: Vec<DuplicateCandidate> = nearby
            .into_iter()
            .map(|issue| DuplicateCandidate {
                id: issue.id,
                title: issue.category,
                description: issue.description,
            })
            .collect();

        Ok(self.classify(description, &candidates).await)
    }

    /// Ask the classifier whether `description` repeats one of `candidates`.
    ///
    /// Never fails: any classifier problem reads as "not a duplicate".
    pub async fn classify(
        &self,
        description: &str,
        candidates: &[DuplicateCandidate],
    ) -> DuplicateCheck {
        if candidates.is_empty() {
            return DuplicateCheck::none();
        }

        let existing = match serde_json::to_string(candidates) {
            Ok(existing) => existing,
            Err(e) => {
                error!(error = %e, "Failed to serialize duplicate candidates");
                return DuplicateCheck::none();
            }
        };

        let prompt = format!(
            "You are an issue analysis expert. Based on the text descriptions, is the \
             'new_report' a duplicate of any of the 'existing_reports'? Be strict in your \
             matching; only identify a duplicate if it clearly describes the exact same \
             problem, not merely the same category. If you find a duplicate, return a single, \
             minified JSON object: {{\"is_duplicate\": true, \"duplicate_id\": ID_OF_THE_DUPLICATE}}. \
             If none match, return {{\"is_duplicate\": false}}.\n\n\
             NEW REPORT: {description}\n\n\
             EXISTING REPORTS: {existing}"
        );

        let raw = match self.model.generate_text(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Duplicate check failed");
                return DuplicateCheck::none();
            }
        };

        let Some(duplicate_id) = parse_verdict(&raw) else {
            debug!(candidates = candidates.len(), "No duplicate found");
            return DuplicateCheck::none();
        };

        match candidates.iter().find(|c| c.id == duplicate_id) {
            Some(candidate) => {
                info!(duplicate_id = %candidate.id, "Duplicate report detected");
                DuplicateCheck {
                    is_duplicate: true,
                    duplicate_id: Some(candidate.id.clone()),
                    duplicate_title: Some(candidate.title.clone()),
                }
            }
            None => {
                warn!(duplicate_id = %duplicate_id, "Classifier named an unknown issue");
                DuplicateCheck::none()
            }
        }
    }
}

/// Extract the duplicate id from a classifier answer.
fn parse_verdict(raw: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(strip_code_fences(raw)) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unparseable duplicate verdict");
            return None;
        }
    };

    if !value.get("is_duplicate").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }

    match value.get("duplicate_id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::StubModel;
    use chrono::Utc;
    use communitywatch_db::entities::issue::{self, IssueStatus};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::atomic::Ordering;

    fn candidate(id: &str, title: &str) -> DuplicateCandidate {
        DuplicateCandidate {
            id: id.to_string(),
            title: title.to_string(),
            description: "Large pothole in the left lane".to_string(),
        }
    }

    fn service(db: MockDatabase, model: StubModel) -> DuplicateService {
        DuplicateService::new(
            IssueRepository::new(Arc::new(db.into_connection())),
            Arc::new(model),
        )
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_model() {
        let model = StubModel::with_text(r#"{"is_duplicate":true,"duplicate_id":"a"}"#);
        let calls = model.calls();
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), model);

        let result = svc.classify("pothole", &[]).await;

        assert_eq!(result, DuplicateCheck::none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_carries_title() {
        let model = StubModel::with_text("```json\n{\"is_duplicate\":true,\"duplicate_id\":\"b\"}\n```");
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), model);

        let result = svc
            .classify("pothole", &[candidate("a", "Graffiti"), candidate("b", "Pothole")])
            .await;

        assert!(result.is_duplicate);
        assert_eq!(result.duplicate_id.as_deref(), Some("b"));
        assert_eq!(result.duplicate_title.as_deref(), Some("Pothole"));
    }

    #[tokio::test]
    async fn test_numeric_id_accepted() {
        let model = StubModel::with_text(r#"{"is_duplicate":true,"duplicate_id":42}"#);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), model);

        let result = svc.classify("pothole", &[candidate("42", "Pothole")]).await;

        assert!(result.is_duplicate);
        assert_eq!(result.duplicate_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_duplicate() {
        let model = StubModel::with_text(r#"{"is_duplicate":true,"duplicate_id":"zzz"}"#);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), model);

        let result = svc.classify("pothole", &[candidate("a", "Pothole")]).await;

        assert_eq!(result, DuplicateCheck::none());
    }

    #[tokio::test]
    async fn test_failures_are_not_duplicates() {
        let failing = service(MockDatabase::new(DatabaseBackend::Postgres), StubModel::default());
        assert_eq!(
            failing.classify("pothole", &[candidate("a", "Pothole")]).await,
            DuplicateCheck::none()
        );

        let garbage = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            StubModel::with_text("yes, probably the first one"),
        );
        assert_eq!(
            garbage.classify("pothole", &[candidate("a", "Pothole")]).await,
            DuplicateCheck::none()
        );
    }

    #[tokio::test]
    async fn test_check_without_neighbours_skips_model() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<issue::Model>::new()]);
        let model = StubModel::with_text(r#"{"is_duplicate":true,"duplicate_id":"a"}"#);
        let calls = model.calls();
        let svc = service(db, model);

        let result = svc
            .check("pothole", GeoPoint::new(10.0, 20.0).unwrap())
            .await
            .unwrap();

        assert!(!result.is_duplicate);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_with_neighbour() {
        let nearby = issue::Model {
            id: "a".to_string(),
            category: "Pothole".to_string(),
            description: "Pothole by the bakery".to_string(),
            latitude: 10.0005,
            longitude: 20.0,
            location_text: None,
            status: IssueStatus::Reported,
            upvote_count: 0,
            embedding: None,
            geojson: None,
            reporter_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![nearby]]);
        let svc = service(
            db,
            StubModel::with_text(r#"{"is_duplicate":true,"duplicate_id":"a"}"#),
        );

        let result = svc
            .check("pothole near the bakery", GeoPoint::new(10.0, 20.0).unwrap())
            .await
            .unwrap();

        assert!(result.is_duplicate);
        assert_eq!(result.duplicate_title.as_deref(), Some("Pothole"));
    }
}
