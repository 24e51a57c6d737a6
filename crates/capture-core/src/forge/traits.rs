use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::types::{IssueComment, PullRequest, PullRequestComplete, Review, ReviewComment};

/// Capability set a forge read path must implement, per the design note
/// in spec §9: "model `ForgeClient` as a capability set
/// `{getPRCompleteData, getPRReviews, getPRComments, getRecentPRs}`". The
/// compound path and the fine-grained path are two implementations; the
/// hybrid client is a third that composes both with fallback. None of
/// the three ever reflects on which implementation served a call.
pub trait ForgeReader: Send + Sync {
    fn get_pr_complete_data<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<PullRequestComplete>> + Send + 'a>>;

    fn get_pr_reviews<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>>> + Send + 'a>>;

    fn get_pr_comments<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<IssueComment>, Vec<ReviewComment>)>> + Send + 'a>>;

    fn get_recent_prs<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PullRequest>>> + Send + 'a>>;
}
