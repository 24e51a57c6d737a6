use std::future::Future;
use std::pin::Pin;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{Job, JobKind};

use super::{check_cancelled, split_repository_name, CaptureWorker, WorkerContext};

/// Full per-PR sync: pull request metadata, file changes, reviews, and
/// both comment kinds in one pass. The natural low-latency worker
/// (spec §3: "a handful of explicit PR numbers").
pub struct DetailsWorker;

impl CaptureWorker for DetailsWorker {
    fn kind(&self) -> JobKind {
        JobKind::Details
    }

    fn run<'a>(
        &'a self,
        ctx: &'a WorkerContext,
        job: &'a Job,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let (owner, repo) = split_repository_name(&job.repository_name)?;
            ctx.capture_store
                .upsert_repository(&job.repository_id, &job.repository_name)
                .await?;
            let pr_numbers = job.pr_numbers.as_deref().ok_or_else(|| {
                CaptureError::InvalidArgument("details job requires explicit pr_numbers".into())
            })?;

            for &pr_number in pr_numbers {
                check_cancelled(ctx)?;
                let item_id = pr_number.to_string();
                ctx.process_item(job.id, &item_id, || async {
                    let complete = ctx.forge.get_pr_complete_data(owner, repo, pr_number).await?;

                    ctx.capture_store
                        .upsert_pull_request(&job.repository_id, &complete.pull_request)
                        .await?;
                    for file in &complete.files {
                        ctx.capture_store
                            .upsert_file_change(&job.repository_id, pr_number, file)
                            .await?;
                    }
                    for review in &complete.reviews {
                        ctx.capture_store
                            .upsert_review(&job.repository_id, pr_number, review)
                            .await?;
                    }
                    for comment in &complete.issue_comments {
                        ctx.capture_store
                            .upsert_issue_comment(&job.repository_id, pr_number, comment)
                            .await?;
                    }
                    for comment in &complete.review_comments {
                        ctx.capture_store
                            .upsert_review_comment(&job.repository_id, pr_number, comment)
                            .await?;
                    }
                    Ok(())
                })
                .await?;
            }

            Ok(())
        })
    }
}
