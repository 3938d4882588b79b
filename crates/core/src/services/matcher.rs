//! Geo-semantic issue matching.
//!
//! Search narrows stored issues to an axis-aligned box around a resolved
//! location, then ranks what is left by cosine similarity between the query
//! embedding and each issue's stored embedding.

use std::cmp::Ordering;

use communitywatch_common::{AppError, AppResult, BoundingBox};
use communitywatch_db::{entities::issue, repositories::IssueRepository};
use serde::Serialize;
use tracing::{debug, info};

use super::ai::{AiService, EmbeddingTask};
use super::geocoding::GeocodingService;

/// Box half-width, in degrees, around a searched location.
pub const SEARCH_RADIUS_DEG: f64 = 0.05;

/// Matches must score strictly above this.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Cosine similarity of two vectors.
///
/// `None` when the lengths differ, either vector is empty, or either has zero
/// norm.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0, 0.0), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    similarity.is_finite().then_some(similarity)
}

/// Keep the issues inside `bbox`, edges included.
#[must_use]
pub fn filter_within(issues: Vec<issue::Model>, bbox: &BoundingBox) -> Vec<issue::Model> {
    issues
        .into_iter()
        .filter(|i| bbox.contains(i.latitude, i.longitude))
        .collect()
}

/// An issue with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIssue {
    pub issue: issue::Model,
    pub similarity: f64,
}

/// Rank candidates by similarity to `query`.
///
/// Candidates without a usable embedding are dropped, as is anything at or
/// below [`SIMILARITY_THRESHOLD`]. Highest similarity first; ties by id.
#[must_use]
pub fn rank_by_similarity(query: &[f64], candidates: Vec<issue::Model>) -> Vec<ScoredIssue> {
    let mut scored: Vec<ScoredIssue> = candidates
        .into_iter()
        .filter_map(|issue| {
            let embedding = issue.embedding_vector()?;
            let similarity = cosine_similarity(query, &embedding)?;
            (similarity > SIMILARITY_THRESHOLD).then_some(ScoredIssue { issue, similarity })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.issue.id.cmp(&b.issue.id))
    });
    scored
}

/// One search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub status: issue::IssueStatus,
    pub upvotes: i32,
    /// Present when the search had a text query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl SearchHit {
    fn new(issue: issue::Model, similarity: Option<f64>) -> Self {
        Self {
            id: issue.id,
            title: issue.category,
            description: issue.description,
            lat: issue.latitude,
            lng: issue.longitude,
            status: issue.status,
            upvotes: issue.upvote_count,
            similarity,
        }
    }
}

/// Search results plus an optional user-facing warning.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub location: String,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Geo-semantic search over stored issues.
#[derive(Clone)]
pub struct SearchService {
    issue_repo: IssueRepository,
    ai: AiService,
    geocoding: GeocodingService,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(
        issue_repo: IssueRepository,
        ai: AiService,
        geocoding: GeocodingService,
    ) -> Self {
        Self {
            issue_repo,
            ai,
            geocoding,
        }
    }

    /// Search by free text, by location, or both.
    pub async fn search(&self, query: &str, location: &str) -> AppResult<SearchOutcome> {
        let query = query.trim().to_string();
        let location = location.trim().to_string();

        if query.is_empty() && location.is_empty() {
            return Err(AppError::field(
                "q",
                "Provide a search query or a location",
            ));
        }

        let mut outcome = SearchOutcome {
            query: query.clone(),
            location: location.clone(),
            results: Vec::new(),
            warning: None,
        };

        let candidates = if location.is_empty() {
            self.issue_repo.find_all().await?
        } else {
            let Some(center) = self.geocoding.resolve(&location).await else {
                outcome.warning = Some(format!("Could not find location: {location}"));
                return Ok(outcome);
            };
            let bbox = center.bounding_box(SEARCH_RADIUS_DEG);
            filter_within(self.issue_repo.find_in_bbox(&bbox).await?, &bbox)
        };

        if query.is_empty() || candidates.is_empty() {
            outcome.results = candidates
                .into_iter()
                .map(|i| SearchHit::new(i, None))
                .collect();
            return Ok(outcome);
        }

        let Some(query_embedding) = self.ai.embed(&query, EmbeddingTask::Query).await else {
            debug!(query = %query, "No query embedding; returning no results");
            return Ok(outcome);
        };

        let candidate_count = candidates.len();
        outcome.results = rank_by_similarity(&query_embedding, candidates)
            .into_iter()
            .map(|s| SearchHit::new(s.issue, Some(s.similarity)))
            .collect();

        info!(
            query = %query,
            location = %location,
            candidates = candidate_count,
            matches = outcome.results.len(),
            "Search completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{StubGeocoder, StubModel};
    use chrono::Utc;
    use communitywatch_common::GeoPoint;
    use communitywatch_db::entities::issue::IssueStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn issue_with(id: &str, lat: f64, lng: f64, embedding: Option<Vec<f64>>) -> issue::Model {
        issue::Model {
            id: id.to_string(),
            category: "Pothole".to_string(),
            description: format!("Issue {id}"),
            latitude: lat,
            longitude: lng,
            location_text: None,
            status: IssueStatus::Reported,
            upvote_count: 0,
            embedding: embedding.map(|v| json!(v)),
            geojson: None,
            reporter_id: "user1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_symmetric() {
        let pairs = [
            (vec![0.3, -1.2, 4.0], vec![2.0, 0.5, -0.7]),
            (vec![1.0, 1.0], vec![1.0, 0.0]),
            (vec![-5.0, 3.0, 0.1, 9.0], vec![0.2, 0.2, 0.2, 0.2]),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
    }

    #[test]
    fn test_rank_single_exact_match() {
        let ranked = rank_by_similarity(
            &[1.0, 0.0],
            vec![issue_with("a", 10.0, 20.0, Some(vec![1.0, 0.0]))],
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].issue.id, "a");
        assert!((ranked[0].similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rank_threshold_and_exclusions() {
        let candidates = vec![
            issue_with("missing", 0.0, 0.0, None),
            issue_with("zero", 0.0, 0.0, Some(vec![0.0, 0.0])),
            issue_with("wrong_dim", 0.0, 0.0, Some(vec![1.0, 0.0, 0.0])),
            // cos = 0.6 exactly: excluded
            issue_with("edge", 0.0, 0.0, Some(vec![3.0, 4.0])),
            issue_with("good", 0.0, 0.0, Some(vec![0.9, 0.1])),
        ];

        let ranked = rank_by_similarity(&[1.0, 0.0], candidates);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].issue.id, "good");
        assert!(ranked.iter().all(|s| s.similarity > SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_rank_order_and_ties() {
        let candidates = vec![
            issue_with("c", 0.0, 0.0, Some(vec![1.0, 0.0])),
            issue_with("b", 0.0, 0.0, Some(vec![0.8, 0.2])),
            issue_with("a", 0.0, 0.0, Some(vec![2.0, 0.0])),
        ];

        let ids: Vec<String> = rank_by_similarity(&[1.0, 0.0], candidates)
            .into_iter()
            .map(|s| s.issue.id)
            .collect();

        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_filter_within_inclusive() {
        let bbox = GeoPoint::new(10.0, 20.0).unwrap().bounding_box(0.05);
        let kept = filter_within(
            vec![
                issue_with("in", 10.0, 20.0, None),
                issue_with("edge", 10.05, 19.95, None),
                issue_with("out", 10.06, 20.0, None),
            ],
            &bbox,
        );
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["in", "edge"]);
    }

    fn service(db: MockDatabase, model: StubModel, geocoder: StubGeocoder) -> SearchService {
        SearchService::new(
            IssueRepository::new(Arc::new(db.into_connection())),
            AiService::new(Arc::new(model)),
            GeocodingService::new(Arc::new(geocoder)),
        )
    }

    #[tokio::test]
    async fn test_search_requires_query_or_location() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            StubModel::default(),
            StubGeocoder::default(),
        );

        let result = svc.search("  ", "").await;
        assert!(matches!(result, Err(AppError::InvalidFields(_))));
    }

    #[tokio::test]
    async fn test_search_unknown_location_warns() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            StubModel::default(),
            StubGeocoder::default(),
        );

        let outcome = svc.search("pothole", "Atlantis").await.unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(
            outcome.warning.as_deref(),
            Some("Could not find location: Atlantis")
        );
    }

    #[tokio::test]
    async fn test_search_location_only_returns_box() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            issue_with("a", 10.01, 20.01, None),
            issue_with("b", 9.96, 20.04, None),
        ]]);
        let svc = service(
            db,
            StubModel::default(),
            StubGeocoder::default().place("Town", GeoPoint::new(10.0, 20.0).unwrap()),
        );

        let outcome = svc.search("", "Town").await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|h| h.similarity.is_none()));
    }

    #[tokio::test]
    async fn test_search_query_ranks_all() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            issue_with("far", 50.0, 50.0, Some(vec![0.0, 1.0])),
            issue_with("near", 10.0, 20.0, Some(vec![1.0, 0.0])),
        ]]);
        let svc = service(
            db,
            StubModel::default().embedding_for("pothole", vec![1.0, 0.0]),
            StubGeocoder::default(),
        );

        let outcome = svc.search("pothole", "").await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].id, "near");
        assert_eq!(outcome.results[0].similarity, Some(1.0));
    }

    #[tokio::test]
    async fn test_search_embedding_failure_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![issue_with("a", 10.0, 20.0, Some(vec![1.0, 0.0]))]]);
        let svc = service(db, StubModel::default(), StubGeocoder::default());

        let outcome = svc.search("pothole", "").await.unwrap();

        assert!(outcome.results.is_empty());
        assert!(outcome.warning.is_none());
    }
}
