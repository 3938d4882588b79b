//! Issue repository.

use std::sync::Arc;

use crate::entities::{
    Issue,
    issue::{self, IssueStatus},
};
use chrono::{DateTime, Utc};
use communitywatch_common::{AppError, AppResult, BoundingBox};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};

/// Issue repository for database operations.
#[derive(Clone)]
pub struct IssueRepository {
    db: Arc<DatabaseConnection>,
}

impl IssueRepository {
    /// Create a new issue repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an issue by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<issue::Model>> {
        Issue::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an issue by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<issue::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::IssueNotFound(id.to_string()))
    }

    /// Create a new issue.
    pub async fn create(&self, model: issue::ActiveModel) -> AppResult<issue::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All issues, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<issue::Model>> {
        Issue::find()
            .order_by_desc(issue::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issues whose coordinates fall inside the box, edges included.
    pub async fn find_in_bbox(&self, bbox: &BoundingBox) -> AppResult<Vec<issue::Model>> {
        Issue::find()
            .filter(issue::Column::Latitude.between(bbox.min_lat, bbox.max_lat))
            .filter(issue::Column::Longitude.between(bbox.min_lng, bbox.max_lng))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issues reported by a user, newest first.
    pub async fn find_by_reporter(&self, reporter_id: &str) -> AppResult<Vec<issue::Model>> {
        Issue::find()
            .filter(issue::Column::ReporterId.eq(reporter_id))
            .order_by_desc(issue::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Issues created at or after `since`.
    pub async fn find_created_since(&self, since: DateTime<Utc>) -> AppResult<Vec<issue::Model>> {
        Issue::find()
            .filter(issue::Column::CreatedAt.gte(since))
            .order_by_asc(issue::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count issues in a status.
    pub async fn count_by_status(&self, status: IssueStatus) -> AppResult<u64> {
        Issue::find()
            .filter(issue::Column::Status.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most upvoted issues that are not resolved yet.
    pub async fn find_top_unresolved(&self, limit: u64) -> AppResult<Vec<issue::Model>> {
        Issue::find()
            .filter(issue::Column::Status.ne(IssueStatus::Resolved))
            .order_by_desc(issue::Column::UpvoteCount)
            .order_by_asc(issue::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// `(latitude, longitude)` of every issue that is not resolved yet.
    pub async fn find_unresolved_coordinates(&self) -> AppResult<Vec<(f64, f64)>> {
        Issue::find()
            .filter(issue::Column::Status.ne(IssueStatus::Resolved))
            .select_only()
            .column(issue::Column::Latitude)
            .column(issue::Column::Longitude)
            .into_tuple::<(f64, f64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the status of an issue.
    pub async fn update_status(
        &self,
        issue: issue::Model,
        status: IssueStatus,
    ) -> AppResult<issue::Model> {
        let mut active: issue::ActiveModel = issue.into();
        active.status = Set(status);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment the upvote count atomically (single UPDATE query, no fetch).
    pub async fn increment_upvote_count(&self, issue_id: &str) -> AppResult<()> {
        Issue::update_many()
            .col_expr(
                issue::Column::UpvoteCount,
                Expr::col(issue::Column::UpvoteCount).add(1),
            )
            .filter(issue::Column::Id.eq(issue_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement the upvote count atomically, never below zero.
    pub async fn decrement_upvote_count(&self, issue_id: &str) -> AppResult<()> {
        Issue::update_many()
            .col_expr(
                issue::Column::UpvoteCount,
                Expr::cust("GREATEST(upvote_count - 1, 0)"),
            )
            .filter(issue::Column::Id.eq(issue_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete issues created before `cutoff`. Comments and upvotes cascade.
    pub async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = Issue::delete_many()
            .filter(issue::Column::CreatedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
