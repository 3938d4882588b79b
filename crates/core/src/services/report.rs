//! Analytics and the AI weekly report.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use communitywatch_common::AppResult;
use communitywatch_db::{
    entities::issue::{self, IssueStatus},
    repositories::IssueRepository,
};
use sea_orm::Iterable;
use serde::Serialize;
use tracing::info;

use super::ai::AiService;

/// Returned instead of a report when the week was quiet.
pub const NO_RECENT_ISSUES: &str = "No new issues reported in the last 7 days";

/// Issues shown in the analytics leaderboard.
pub const TOP_UNRESOLVED_LIMIT: u64 = 5;

const REPORT_WINDOW_DAYS: i64 = 7;
const DATE_FORMAT: &str = "%B %d, %Y";

/// Compact issue listing for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub upvotes: i32,
    pub status: IssueStatus,
}

impl From<issue::Model> for IssueSummary {
    fn from(issue: issue::Model) -> Self {
        Self {
            id: issue.id,
            title: issue.category,
            description: issue.description,
            upvotes: issue.upvote_count,
            status: issue.status,
        }
    }
}

/// Community analytics dashboard data.
#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    /// Issue count per status label; every status is present.
    pub status_counts: BTreeMap<String, u64>,
    /// Most upvoted unresolved issues.
    pub top_issues: Vec<IssueSummary>,
    /// `[lat, lng]` of every unresolved issue.
    pub heatmap_data: Vec<[f64; 2]>,
}

/// Analytics and reporting service.
#[derive(Clone)]
pub struct ReportService {
    issue_repo: IssueRepository,
    ai: AiService,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(issue_repo: IssueRepository, ai: AiService) -> Self {
        Self { issue_repo, ai }
    }

    /// Status counts, leaderboard and heatmap.
    pub async fn analytics(&self) -> AppResult<Analytics> {
        let mut status_counts = BTreeMap::new();
        for status in IssueStatus::iter() {
            let count = self.issue_repo.count_by_status(status).await?;
            status_counts.insert(status.as_str().to_string(), count);
        }

        let top_issues = self
            .issue_repo
            .find_top_unresolved(TOP_UNRESOLVED_LIMIT)
            .await?
            .into_iter()
            .map(IssueSummary::from)
            .collect();

        let heatmap_data = self
            .issue_repo
            .find_unresolved_coordinates()
            .await?
            .into_iter()
            .map(|(lat, lng)| [lat, lng])
            .collect();

        Ok(Analytics {
            status_counts,
            top_issues,
            heatmap_data,
        })
    }

    /// Summarize the last seven days of reports.
    ///
    /// Never fails on the AI side; the summarizer falls back to a fixed
    /// message.
    pub async fn weekly_report(&self) -> AppResult<String> {
        let end = Utc::now();
        let start = end - Duration::days(REPORT_WINDOW_DAYS);

        let recent = self.issue_repo.find_created_since(start).await?;
        let Some(summary) = build_data_summary(start, end, &recent) else {
            return Ok(NO_RECENT_ISSUES.to_string());
        };

        info!(issues = recent.len(), "Generating weekly report");
        Ok(self.ai.summarize(&summary).await)
    }
}

/// Plain-text data summary handed to the summarizer, or `None` for no issues.
#[must_use]
pub fn build_data_summary(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    issues: &[issue::Model],
) -> Option<String> {
    let first = issues.first()?;

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for issue in issues {
        *by_category.entry(issue.category.as_str()).or_default() += 1;
    }
    let breakdown = by_category
        .iter()
        .map(|(category, count)| format!("'{category}': {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    // first maximum wins
    let top = issues.iter().fold(first, |best, issue| {
        if issue.upvote_count > best.upvote_count {
            issue
        } else {
            best
        }
    });

    Some(format!(
        "Date Range: {} to {}\n\
         - Total new issues: {}\n\
         - Breakdown by category: {{{breakdown}}}\n\
         - Most upvoted new issue: '{}' with {} upvotes",
        start.format(DATE_FORMAT),
        end.format(DATE_FORMAT),
        issues.len(),
        top.category,
        top.upvote_count,
    ))
}
