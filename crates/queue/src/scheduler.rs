//! Periodic maintenance: the issue retention sweep.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use communitywatch_common::{AppResult, config::RetentionConfig};
use communitywatch_db::repositories::IssueRepository;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Scheduled job types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledJob {
    /// Delete issues older than the retention window.
    PurgeOldIssues { retention_days: i64 },
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between retention sweeps (default: 1 day).
    pub retention_interval: Duration,
    /// Issues older than this many days are purged.
    pub issue_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retention_interval: Duration::from_secs(86400),
            issue_retention_days: 90,
        }
    }
}

impl From<&RetentionConfig> for SchedulerConfig {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            retention_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            issue_retention_days: config.issue_days,
        }
    }
}

impl SchedulerConfig {
    /// The job a sweep runs.
    #[must_use]
    pub const fn retention_job(&self) -> ScheduledJob {
        ScheduledJob::PurgeOldIssues {
            retention_days: self.issue_retention_days,
        }
    }
}

/// Scheduler state for tracking job runs.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub last_issue_purge: Option<DateTime<Utc>>,
    pub total_purged: u64,
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Delete issues created before `cutoff`, returning how many went.
    async fn purge_issues_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Executor backed by the issue table.
#[derive(Clone)]
pub struct RetentionExecutor {
    issue_repo: IssueRepository,
}

impl RetentionExecutor {
    #[must_use]
    pub const fn new(issue_repo: IssueRepository) -> Self {
        Self { issue_repo }
    }
}

#[async_trait::async_trait]
impl JobExecutor for RetentionExecutor {
    async fn purge_issues_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        self.issue_repo.delete_created_before(cutoff).await
    }
}

/// Run one job against `executor` as of `now`.
pub async fn run_job<E: JobExecutor + ?Sized>(
    job: &ScheduledJob,
    executor: &E,
    state: &mut SchedulerState,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    match job {
        ScheduledJob::PurgeOldIssues { retention_days } => {
            let cutoff = now - chrono::Duration::days(*retention_days);
            let count = executor.purge_issues_before(cutoff).await?;
            state.last_issue_purge = Some(now);
            state.total_purged += count;
            Ok(count)
        }
    }
}

/// Spawn the scheduler with the given configuration and executor.
///
/// Each sweep finishes before the next tick is awaited, so sweeps never
/// overlap.
pub fn run_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    executor: Arc<E>,
) -> JoinHandle<()> {
    let job = config.retention_job();
    let period = config.retention_interval;

    tokio::spawn(async move {
        let mut state = SchedulerState::default();
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match run_job(&job, executor.as_ref(), &mut state, Utc::now()).await {
                Ok(count) => {
                    tracing::info!(
                        count,
                        retention_days = config.issue_retention_days,
                        "Purged old issues"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to purge old issues");
                }
            }
        }
    })
}
