//! Upvote repository.

use std::sync::Arc;

use crate::entities::{Upvote, upvote};
use communitywatch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QuerySelect,
};

/// Upvote repository for database operations.
#[derive(Clone)]
pub struct UpvoteRepository {
    db: Arc<DatabaseConnection>,
}

impl UpvoteRepository {
    /// Create a new upvote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an upvote by voter and issue.
    pub async fn find_by_voter_and_issue(
        &self,
        voter_id: &str,
        issue_id: &str,
    ) -> AppResult<Option<upvote::Model>> {
        Upvote::find()
            .filter(upvote::Column::VoterId.eq(voter_id))
            .filter(upvote::Column::IssueId.eq(issue_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new upvote.
    pub async fn create(&self, model: upvote::ActiveModel) -> AppResult<upvote::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an upvote.
    pub async fn delete(&self, upvote: upvote::Model) -> AppResult<()> {
        upvote
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// IDs of every user who upvoted an issue.
    pub async fn find_voter_ids(&self, issue_id: &str) -> AppResult<Vec<String>> {
        Upvote::find()
            .filter(upvote::Column::IssueId.eq(issue_id))
            .select_only()
            .column(upvote::Column::VoterId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every issue a user has upvoted.
    pub async fn find_issue_ids_by_voter(&self, voter_id: &str) -> AppResult<Vec<String>> {
        Upvote::find()
            .filter(upvote::Column::VoterId.eq(voter_id))
            .select_only()
            .column(upvote::Column::IssueId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
