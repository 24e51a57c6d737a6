use std::future::Future;
use std::pin::Pin;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{Job, JobKind};

use super::{check_cancelled, split_repository_name, CaptureWorker, WorkerContext};

/// Comment-only re-sync: both issue-level and review-level comments for a
/// PR whose discussion changed without the rest of its metadata.
pub struct CommentsWorker;

impl CaptureWorker for CommentsWorker {
    fn kind(&self) -> JobKind {
        JobKind::Comments
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
                CaptureError::InvalidArgument("comments job requires explicit pr_numbers".into())
            })?;

            for &pr_number in pr_numbers {
                check_cancelled(ctx)?;
                let item_id = pr_number.to_string();
                ctx.process_item(job.id, &item_id, || async {
                    let (issue_comments, review_comments) =
                        ctx.forge.get_pr_comments(owner, repo, pr_number).await?;
                    for comment in &issue_comments {
                        ctx.capture_store
                            .upsert_issue_comment(&job.repository_id, pr_number, comment)
                            .await?;
                    }
                    for comment in &review_comments {
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
