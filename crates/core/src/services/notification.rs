//! Notification service.

use chrono::{DateTime, Utc};
use communitywatch_common::{AppError, AppResult, IdGenerator};
use communitywatch_db::{
    entities::{
        issue::IssueStatus,
        notification::{self, NotificationName},
    },
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Notification history page size.
pub const HISTORY_PAGE_SIZE: u64 = 15;

/// Typed notification payload. The variant is stored in the `name` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    /// An issue the user reported or upvoted changed status.
    StatusUpdate {
        issue_id: String,
        issue_category: String,
        status: IssueStatus,
    },
}

impl NotificationPayload {
    /// Tag stored alongside the payload.
    #[must_use]
    pub const fn name(&self) -> NotificationName {
        match self {
            Self::StatusUpdate { .. } => NotificationName::StatusUpdate,
        }
    }

    /// Decode a stored payload for its tag.
    pub fn decode(name: NotificationName, data: Value) -> AppResult<Self> {
        match name {
            NotificationName::StatusUpdate => serde_json::from_value(data)
                .map_err(|e| AppError::Internal(format!("Corrupt {name:?} notification: {e}"))),
        }
    }
}

/// Notification as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    pub id: String,
    pub name: NotificationName,
    pub data: Value,
    /// Unix seconds.
    pub timestamp: f64,
}

impl From<notification::Model> for NotificationView {
    fn from(model: notification::Model) -> Self {
        Self {
            timestamp: unix_seconds(&model.created_at.with_timezone(&Utc)),
            id: model.id,
            name: model.name,
            data: model.data,
        }
    }
}

/// One page of notification history.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub items: Vec<NotificationView>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a notification for `user_id`.
    pub async fn notify(
        &self,
        user_id: &str,
        payload: &NotificationPayload,
    ) -> AppResult<notification::Model> {
        let data = serde_json::to_value(payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {e}")))?;

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            name: Set(payload.name()),
            data: Set(data),
            created_at: Set(Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;
        debug!(user_id = %user_id, name = ?created.name, "Notification stored");
        Ok(created)
    }

    /// Notifications strictly newer than `since` (unix seconds), oldest first.
    pub async fn since(&self, user_id: &str, since: f64) -> AppResult<Vec<NotificationView>> {
        let cutoff = from_unix_seconds(since);
        let items = self.notification_repo.find_since(user_id, cutoff).await?;
        Ok(items.into_iter().map(NotificationView::from).collect())
    }

    /// One page of history, newest first. Pages start at 1.
    pub async fn history(&self, user_id: &str, page: u64) -> AppResult<NotificationPage> {
        let page = page.max(1);
        let offset = (page - 1) * HISTORY_PAGE_SIZE;

        let total = self.notification_repo.count_by_user(user_id).await?;
        let items = self
            .notification_repo
            .find_page(user_id, offset, HISTORY_PAGE_SIZE)
            .await?;

        Ok(NotificationPage {
            items: items.into_iter().map(NotificationView::from).collect(),
            page,
            per_page: HISTORY_PAGE_SIZE,
            total,
            has_next: offset + HISTORY_PAGE_SIZE < total,
            has_prev: page > 1,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn unix_seconds(at: &DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}

#[allow(clippy::cast_possible_truncation)]
fn from_unix_seconds(seconds: f64) -> DateTime<Utc> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return DateTime::<Utc>::UNIX_EPOCH;
    }
    DateTime::from_timestamp_micros((seconds * 1_000_000.0) as i64).unwrap_or_else(|| {
        warn!(since = seconds, "Timestamp out of range");
        DateTime::<Utc>::MAX_UTC
    })
}
