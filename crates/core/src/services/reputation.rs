//! Reputation point rules.

use communitywatch_db::entities::issue::IssueStatus;

/// Points granted to the author of a new report.
pub const REPORT_POINTS: i32 = 5;

/// Points moved to or from the reporter on each upvote toggle.
pub const UPVOTE_POINTS: i32 = 2;

/// Points granted to the reporter when their issue becomes resolved.
pub const RESOLVE_POINTS: i32 = 20;

/// Effect of toggling an upvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the voter has a vote after the toggle.
    pub voted: bool,
    /// Change to the issue's upvote count.
    pub count_delta: i32,
    /// Change to the reporter's reputation.
    pub reputation_delta: i32,
}

/// What an upvote toggle does, given whether a vote already exists.
#[must_use]
pub const fn toggle_outcome(already_voted: bool) -> ToggleOutcome {
    if already_voted {
        ToggleOutcome {
            voted: false,
            count_delta: -1,
            reputation_delta: -UPVOTE_POINTS,
        }
    } else {
        ToggleOutcome {
            voted: true,
            count_delta: 1,
            reputation_delta: UPVOTE_POINTS,
        }
    }
}

/// Reputation granted for moving an issue from `from` to `to`.
///
/// Only entering `Resolved` pays out; re-resolving does not.
#[must_use]
pub fn resolution_bonus(from: IssueStatus, to: IssueStatus) -> i32 {
    if to == IssueStatus::Resolved && from != IssueStatus::Resolved {
        RESOLVE_POINTS
    } else {
        0
    }
}
