use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use capture_core::error::{CaptureError, Result};
use capture_core::forge::{
    ForgeReader, IssueComment, PullRequest, PullRequestComplete, Review, ReviewComment,
};
use capture_core::rate_limit::RateLimitSample;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::governor::Governor;

use super::transport::{HttpTransport, TransportRequest};

/// Flat cost attributed to every fine-grained REST call, per spec §4.2:
/// "Each call is attributed a flat cost of 1."
const FINE_GRAINED_CALL_COST: u32 = 1;

/// The same logical result assembled from up to five independent REST
/// calls (PR, file list, reviews, issue comments, review comments), per
/// spec §4.2. Used directly when the compound path is disabled, and as
/// the Hybrid client's fallback target otherwise.
pub struct FineGrainedClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    governor: Arc<Governor>,
}

impl FineGrainedClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        governor: Arc<Governor>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            governor,
        }
    }

    /// Number of underlying REST calls the Hybrid client should credit to
    /// `fineGrainedQueries` for one `get_pr_complete_data` call.
    pub const COMPLETE_DATA_CALL_COUNT: u32 = 5;
    /// One call for reviews alone.
    pub const REVIEWS_CALL_COUNT: u32 = 1;
    /// Issue comments + review comments.
    pub const COMMENTS_CALL_COUNT: u32 = 2;
    /// One call for a recent-PR listing.
    pub const RECENT_PRS_CALL_COUNT: u32 = 1;

    async fn call<T: DeserializeOwned>(&self, path: &str, query_type: &str) -> Result<T> {
        let response = self
            .transport
            .send(TransportRequest {
                method: "GET",
                url: format!("{}/rest{path}", self.base_url),
                body: None,
            })
            .await?;

        if response.status == 404 {
            return Err(CaptureError::NotFound(format!("{path} not found")));
        }
        if response.status >= 400 {
            return Err(CaptureError::Transport(format!(
                "fine-grained call to {path} failed with status {}",
                response.status
            )));
        }

        self.governor.track(RateLimitSample {
            timestamp: Utc::now(),
            remaining: u32::MAX, // the REST endpoints don't echo a budget envelope per call
            limit: u32::MAX,
            cost: FINE_GRAINED_CALL_COST,
            query_type: query_type.to_string(),
            items_processed: 1,
        });

        serde_json::from_value(response.body).map_err(|e| CaptureError::Serialization(e.to_string()))
    }

    /// Assemble a complete PR record from its PR, file-list, and review
    /// calls. Reviews and comments are also fetched individually elsewhere
    /// in the normalised shape, so only the PR body and files need a
    /// dedicated call here; the remaining two calls live in
    /// `get_pr_reviews`/`get_pr_comments` and are issued by the caller
    /// when it needs the full `PullRequestComplete`.
    async fn fetch_complete(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i64,
    ) -> Result<PullRequestComplete> {
        let pr: PullRequest = self
            .call(&format!("/{owner}/{repo}/pulls/{pr_number}"), "fine_grained:pr")
            .await?;
        let files = self
            .call(
                &format!("/{owner}/{repo}/pulls/{pr_number}/files"),
                "fine_grained:files",
            )
            .await?;
        let reviews = self.fetch_reviews(owner, repo, pr_number).await?;
        let (issue_comments, review_comments) = self.fetch_comments(owner, repo, pr_number).await?;

        Ok(PullRequestComplete {
            pull_request: pr,
            files,
            reviews,
            issue_comments,
            review_comments,
        })
    }

    async fn fetch_reviews(&self, owner: &str, repo: &str, pr_number: i64) -> Result<Vec<Review>> {
        self.call(
            &format!("/{owner}/{repo}/pulls/{pr_number}/reviews"),
            "fine_grained:reviews",
        )
        .await
    }

    async fn fetch_comments(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i64,
    ) -> Result<(Vec<IssueComment>, Vec<ReviewComment>)> {
        let issue_comments = self
            .call(
                &format!("/{owner}/{repo}/issues/{pr_number}/comments"),
                "fine_grained:issue_comments",
            )
            .await?;
        let review_comments = self
            .call(
                &format!("/{owner}/{repo}/pulls/{pr_number}/comments"),
                "fine_grained:review_comments",
            )
            .await?;
        Ok((issue_comments, review_comments))
    }

    async fn fetch_recent(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PullRequest>> {
        self.call(
            &format!(
                "/{owner}/{repo}/pulls?since={}&limit={limit}",
                since.to_rfc3339()
            ),
            "fine_grained:recent",
        )
        .await
    }
}

impl ForgeReader for FineGrainedClient {
    fn get_pr_complete_data<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<PullRequestComplete>> + Send + 'a>> {
        Box::pin(self.fetch_complete(owner, repo, pr_number))
    }

    fn get_pr_reviews<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>>> + Send + 'a>> {
        Box::pin(self.fetch_reviews(owner, repo, pr_number))
    }

    fn get_pr_comments<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<IssueComment>, Vec<ReviewComment>)>> + Send + 'a>>
    {
        Box::pin(self.fetch_comments(owner, repo, pr_number))
    }

    fn get_recent_prs<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PullRequest>>> + Send + 'a>> {
        Box::pin(self.fetch_recent(owner, repo, since, limit))
    }
}
