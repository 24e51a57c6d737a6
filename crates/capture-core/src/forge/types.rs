//! The normalised response shape every forge path (compound or
//! fine-grained) must be transformed into before it reaches a Capture
//! Worker, per spec §4.2. Downstream workers never branch on which path
//! produced the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The forge's account of a PR or review author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub login: String,
    pub avatar: Option<String>,
}

/// Whether a PR is open or closed; draft-ness is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestTimestamps {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
    pub merged: Option<DateTime<Utc>>,
}

/// Normalised pull-request record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub state: PullRequestState,
    pub draft: bool,
    pub additions: i64,
    pub deletions: i64,
    pub changed_files: i64,
    pub commit_count: i64,
    pub author: Author,
    pub merged_by: Option<Author>,
    pub timestamps: PullRequestTimestamps,
    pub merged: bool,
    pub mergeable: Option<bool>,
    pub base_ref: String,
    pub head_ref: String,
}

/// A changed file within a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub additions: i64,
    pub deletions: i64,
    pub changes: i64,
    pub status: String,
}

/// A pull-request review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub state: String,
    pub body: Option<String>,
    pub author: Author,
    pub submitted_at: DateTime<Utc>,
    pub commit_id: Option<String>,
}

/// A top-level issue comment on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: String,
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment attached to a specific diff line within a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: String,
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub path: String,
    pub position: Option<i64>,
    pub original_position: Option<i64>,
    pub diff_hunk: String,
    pub in_reply_to_id: Option<String>,
    pub review_id: Option<String>,
}

/// The full normalised payload for one pull request, assembled by either
/// the compound path or the fine-grained path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestComplete {
    pub pull_request: PullRequest,
    pub files: Vec<FileChange>,
    pub reviews: Vec<Review>,
    pub issue_comments: Vec<IssueComment>,
    pub review_comments: Vec<ReviewComment>,
}

/// Rate-limit envelope the forge attaches to every response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub cost: u32,
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}
