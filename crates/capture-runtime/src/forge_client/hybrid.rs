use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use capture_core::error::{CaptureError, Result};
use capture_core::forge::{
    ForgeMetrics, ForgeReader, IssueComment, PullRequest, PullRequestComplete, Review,
    ReviewComment,
};
use chrono::{DateTime, Utc};

use super::compound::CompoundClient;
use super::fine_grained::FineGrainedClient;

/// The third `ForgeReader` variant (per the design note in spec §9):
/// composes the compound and fine-grained paths with automatic fallback,
/// and is the only one of the three that maintains `ForgeMetrics`.
pub struct HybridForgeClient {
    compound: CompoundClient,
    fine_grained: FineGrainedClient,
    compound_enabled: AtomicBool,
    metrics: Mutex<ForgeMetrics>,
}

impl HybridForgeClient {
    pub fn new(compound: CompoundClient, fine_grained: FineGrainedClient, compound_enabled: bool) -> Self {
        Self {
            compound,
            fine_grained,
            compound_enabled: AtomicBool::new(compound_enabled),
            metrics: Mutex::new(ForgeMetrics::default()),
        }
    }

    /// `setCompoundEnabled` (spec §4.2).
    pub fn set_compound_enabled(&self, enabled: bool) {
        self.compound_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn compound_enabled(&self) -> bool {
        self.compound_enabled.load(Ordering::SeqCst)
    }

    /// `getMetrics` (spec §4.2).
    pub fn get_metrics(&self) -> ForgeMetrics {
        *self.metrics.lock().unwrap()
    }

    fn record_compound_success(&self, cost: u32) {
        self.metrics.lock().unwrap().record_compound_success(cost);
    }

    fn record_fallback(&self) {
        self.metrics.lock().unwrap().record_fallback();
    }

    fn record_fine_grained_calls(&self, count: u32) {
        let mut metrics = self.metrics.lock().unwrap();
        for _ in 0..count {
            metrics.record_fine_grained_call();
        }
    }

    /// Apply the fallback policy of spec §4.2: if the compound path is
    /// enabled and the compound future fails for any reason other than
    /// `NotFound`, fall back to the fine-grained path. `NotFound`
    /// short-circuits without fallback.
    async fn with_fallback<T>(
        &self,
        compound: impl Future<Output = Result<(T, u32)>>,
        fine_grained_call_count: u32,
        fine_grained: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if self.compound_enabled() {
            match compound.await {
                Ok((data, cost)) => {
                    self.record_compound_success(cost);
                    return Ok(data);
                }
                Err(CaptureError::NotFound(msg)) => return Err(CaptureError::NotFound(msg)),
                Err(err) => {
                    tracing::warn!(error = %err, "compound path failed, falling back to fine-grained");
                    self.record_fallback();
                }
            }
        }

        let result = fine_grained.await;
        if result.is_ok() {
            self.record_fine_grained_calls(fine_grained_call_count);
        }
        result
    }
}

impl ForgeReader for HybridForgeClient {
    fn get_pr_complete_data<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<PullRequestComplete>> + Send + 'a>> {
        Box::pin(self.with_fallback(
            self.compound.get_pr_complete_data_with_cost(owner, repo, pr_number),
            FineGrainedClient::COMPLETE_DATA_CALL_COUNT,
            self.fine_grained.get_pr_complete_data(owner, repo, pr_number),
        ))
    }

    fn get_pr_reviews<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>>> + Send + 'a>> {
        Box::pin(self.with_fallback(
            self.compound.get_pr_reviews_with_cost(owner, repo, pr_number),
            FineGrainedClient::REVIEWS_CALL_COUNT,
            self.fine_grained.get_pr_reviews(owner, repo, pr_number),
        ))
    }

    fn get_pr_comments<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        pr_number: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<IssueComment>, Vec<ReviewComment>)>> + Send + 'a>>
    {
        Box::pin(self.with_fallback(
            self.compound.get_pr_comments_with_cost(owner, repo, pr_number),
            FineGrainedClient::COMMENTS_CALL_COUNT,
            self.fine_grained.get_pr_comments(owner, repo, pr_number),
        ))
    }

    fn get_recent_prs<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PullRequest>>> + Send + 'a>> {
        Box::pin(self.with_fallback(
            self.compound.get_recent_prs_with_cost(owner, repo, since, limit),
            FineGrainedClient::RECENT_PRS_CALL_COUNT,
            self.fine_grained.get_recent_prs(owner, repo, since, limit),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge_client::transport::{HttpTransport, TransportRequest, TransportResponse};
    use capture_core::rate_limit::GovernorThresholds;
    use std::sync::Arc;

    struct ScriptedTransport {
        compound_fails: bool,
    }

    impl HttpTransport for ScriptedTransport {
        fn send<'a>(
            &'a self,
            request: TransportRequest,
        ) -> Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>> {
            Box::pin(async move {
                if request.url.contains("/graphql") {
                    if self.compound_fails {
                        return Ok(TransportResponse {
                            status: 500,
                            body: serde_json::json!({}),
                        });
                    }
                    return Ok(TransportResponse {
                        status: 200,
                        body: serde_json::json!({
                            "data": sample_complete(),
                            "rate_limit": {
                                "cost": 1,
                                "remaining": 4999,
                                "limit": 5000,
                                "reset_at": Utc::now().to_rfc3339(),
                            }
                        }),
                    });
                }

                // Fine-grained REST fallback path.
                let body = if request.url.ends_with("/files") {
                    serde_json::json!([])
                } else if request.url.contains("/reviews") {
                    serde_json::json!([])
                } else if request.url.contains("/comments") {
                    serde_json::json!([])
                } else {
                    serde_json::to_value(sample_complete().pull_request).unwrap()
                };
                Ok(TransportResponse { status: 200, body })
            })
        }
    }

    fn sample_complete() -> PullRequestComplete {
        PullRequestComplete {
            pull_request: capture_core::forge::PullRequest {
                id: "1".into(),
                number: 42,
                title: "title".into(),
                body: None,
                state: capture_core::forge::PullRequestState::Open,
                draft: false,
                additions: 1,
                deletions: 1,
                changed_files: 1,
                commit_count: 1,
                author: capture_core::forge::Author {
                    id: "a1".into(),
                    login: "octocat".into(),
                    avatar: None,
                },
                merged_by: None,
                timestamps: capture_core::forge::PullRequestTimestamps {
                    created: Utc::now(),
                    updated: Utc::now(),
                    closed: None,
                    merged: None,
                },
                merged: false,
                mergeable: Some(true),
                base_ref: "main".into(),
                head_ref: "feature".into(),
            },
            files: vec![],
            reviews: vec![],
            issue_comments: vec![],
            review_comments: vec![],
        }
    }

    fn client(compound_fails: bool, compound_enabled: bool) -> HybridForgeClient {
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport { compound_fails });
        let governor = Arc::new(crate::governor::Governor::new(GovernorThresholds::default()));
        let compound = CompoundClient::new(transport.clone(), "https://forge.example", governor.clone());
        let fine_grained = FineGrainedClient::new(transport, "https://forge.example", governor);
        HybridForgeClient::new(compound, fine_grained, compound_enabled)
    }

    #[tokio::test]
    async fn compound_success_records_no_fallback() {
        let hybrid = client(false, true);
        let result = hybrid.get_pr_complete_data("acme", "repo", 42).await;
        assert!(result.is_ok());
        let metrics = hybrid.get_metrics();
        assert_eq!(metrics.compound_queries, 1);
        assert_eq!(metrics.fallbacks, 0);
    }

    #[tokio::test]
    async fn compound_failure_falls_back_to_fine_grained() {
        let hybrid = client(true, true);
        let result = hybrid.get_pr_complete_data("acme", "repo", 42).await;
        assert!(result.is_ok());
        let metrics = hybrid.get_metrics();
        assert_eq!(metrics.fallbacks, 1);
        assert_eq!(metrics.fine_grained_queries, FineGrainedClient::COMPLETE_DATA_CALL_COUNT as u64);
        assert_eq!(metrics.total_points_saved, 0);
    }

    #[tokio::test]
    async fn compound_disabled_skips_straight_to_fine_grained() {
        let hybrid = client(false, false);
        let result = hybrid.get_pr_complete_data("acme", "repo", 42).await;
        assert!(result.is_ok());
        let metrics = hybrid.get_metrics();
        assert_eq!(metrics.compound_queries, 0);
        assert_eq!(metrics.fallbacks, 0);
        assert_eq!(metrics.fine_grained_queries, FineGrainedClient::COMPLETE_DATA_CALL_COUNT as u64);
    }
}
