use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use capture_core::error::{CaptureError, Result};
use capture_core::forge::{
    ForgeReader, IssueComment, PullRequest, PullRequestComplete, RateLimitInfo, Review,
    ReviewComment,
};
use capture_core::rate_limit::RateLimitSample;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::governor::Governor;

use super::transport::{HttpTransport, TransportRequest};

#[derive(Deserialize)]
struct CompoundEnvelope<T> {
    data: T,
    rate_limit: RateLimitInfo,
}

/// One forge query requesting all fields of interest in a single
/// round-trip (spec §4.2, compound path). The wire format is assumed to
/// mirror the normalised shape directly — field names are illustrative
/// per spec, so this client treats the compound endpoint's response body
/// as already shaped like `PullRequestComplete`/`Vec<Review>`/etc.
pub struct CompoundClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    governor: Arc<Governor>,
}

impl CompoundClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>, governor: Arc<Governor>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            governor,
        }
    }

    /// Issue one compound query, track the governor with the forge's
    /// authoritative cost, and hand the reported cost back to the caller
    /// (the Hybrid client needs it to credit `totalPointsSaved`).
    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query_type: &str,
        items_processed: u32,
    ) -> Result<(T, u32)> {
        let response = self
            .transport
            .send(TransportRequest {
                method: "POST",
                url: format!("{}/graphql{path}", self.base_url),
                body: None,
            })
            .await?;

        if response.status == 404 {
            return Err(CaptureError::NotFound(format!("{path} not found")));
        }
        if response.status >= 400 {
            return Err(CaptureError::Transport(format!(
                "compound query to {path} failed with status {}",
                response.status
            )));
        }

        let envelope: CompoundEnvelope<T> = serde_json::from_value(response.body)
            .map_err(|e| CaptureError::Serialization(e.to_string()))?;

        self.governor.track(RateLimitSample {
            timestamp: Utc::now(),
            remaining: envelope.rate_limit.remaining,
            limit: envelope.rate_limit.limit,
            cost: envelope.rate_limit.cost,
            query_type: query_type.to_string(),
            items_processed,
        });

        Ok((envelope.data, envelope.rate_limit.cost))
    }

    /// Same as the `ForgeReader` method but also returns the forge's
    /// reported cost for this call, used by the Hybrid client to credit
    /// `totalPointsSaved`.
    pub async fn get_pr_complete_data_with_cost(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i64,
    ) -> Result<(PullRequestComplete, u32)> {
        self.query(
            &format!("/{owner}/{repo}/pulls/{pr_number}/complete"),
            "compound:complete",
            1,
        )
        .await
    }

    pub async fn get_pr_reviews_with_cost(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i64,
    ) -> Result<(Vec<Review>, u32)> {
        self.query(
            &format!("/{owner}/{repo}/pulls/{pr_number}/reviews"),
            "compound:reviews",
            1,
        )
        .await
    }

    pub async fn get_pr_comments_with_cost(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i64,
    ) -> Result<((Vec<IssueComment>, Vec<ReviewComment>), u32)> {
        self.query(
            &format!("/{owner}/{repo}/pulls/{pr_number}/comments"),
            "compound:comments",
            1,
        )
        .await
    }

    pub async fn get_recent_prs_with_cost(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<(Vec<PullRequest>, u32)> {
        self.query(
            &format!(
                "/{owner}/{repo}/pulls/recent?since={}&limit={limit}",
                since.to_rfc3339()
            ),
            "compound:recent",
            limit,
        )
        .await
    }
}

impl ForgeReader for CompoundClient {
    fn get_pr_complete_data<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<PullRequestComplete>> + Send + 'a>> {
        Box::pin(async move {
            self.get_pr_complete_data_with_cost(owner, repo, pr_number)
                .await
                .map(|(data, _)| data)
        })
    }

    fn get_pr_reviews<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>>> + Send + 'a>> {
        Box::pin(async move {
            self.get_pr_reviews_with_cost(owner, repo, pr_number)
                .await
                .map(|(data, _)| data)
        })
    }

    fn get_pr_comments<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<IssueComment>, Vec<ReviewComment>)>> + Send + 'a>>
    {
        Box::pin(async move {
            self.get_pr_comments_with_cost(owner, repo, pr_number)
                .await
                .map(|(data, _)| data)
        })
    }

    fn get_recent_prs<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PullRequest>>> + Send + 'a>> {
        Box::pin(async move {
            self.get_recent_prs_with_cost(owner, repo, since, limit)
                .await
                .map(|(data, _)| data)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::rate_limit::GovernorThresholds;
    use capture_core::testing::mock_http::MockHttp;

    // `MockHttp` (capture_core::testing) speaks the `HttpTransport`
    // trait directly in these tests via a thin adapter, mirroring the
    // teacher's pattern of wiring `MockHttp` behind whatever transport
    // seam a client exposes.
    struct MockTransport(MockHttp);

    impl HttpTransport for MockTransport {
        fn send<'a>(
            &'a self,
            request: TransportRequest,
        ) -> Pin<Box<dyn Future<Output = Result<super::super::transport::TransportResponse>> + Send + 'a>>
        {
            Box::pin(async move {
                let mock_request = capture_core::testing::mock_http::MockRequest {
                    method: request.method.to_string(),
                    path: request.url.clone(),
                    url: request.url,
                    headers: Default::default(),
                    body: request.body.unwrap_or(serde_json::Value::Null),
                };
                let response = self.0.execute(mock_request).await;
                Ok(super::super::transport::TransportResponse {
                    status: response.status,
                    body: response.body,
                })
            })
        }
    }

    #[tokio::test]
    async fn not_found_short_circuits_without_tracking() {
        let mock = MockHttp::new();
        mock.add_mock_sync("*", |_req| {
            capture_core::testing::mock_http::MockResponse {
                status: 404,
                headers: Default::default(),
                body: serde_json::Value::Null,
            }
        });
        let governor = Arc::new(crate::governor::Governor::new(GovernorThresholds::default()));
        let client = CompoundClient::new(Arc::new(MockTransport(mock)), "https://forge.example", governor);
        let result = client.get_pr_complete_data_with_cost("acme", "repo", 7).await;
        assert!(matches!(result, Err(CaptureError::NotFound(_))));
    }
}
