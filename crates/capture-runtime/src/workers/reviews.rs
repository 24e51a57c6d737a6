use std::future::Future;
use std::pin::Pin;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{Job, JobKind};

use super::{check_cancelled, split_repository_name, CaptureWorker, WorkerContext};

/// Review-only re-sync for a PR whose reviews changed without the rest of
/// its metadata (a cheaper follow-up than re-running [`super::DetailsWorker`]).
pub struct ReviewsWorker;

impl CaptureWorker for ReviewsWorker {
    fn kind(&self) -> JobKind {
        JobKind::Reviews
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
                CaptureError::InvalidArgument("reviews job requires explicit pr_numbers".into())
            })?;

            for &pr_number in pr_numbers {
                check_cancelled(ctx)?;
                let item_id = pr_number.to_string();
                ctx.process_item(job.id, &item_id, || async {
                    let reviews = ctx.forge.get_pr_reviews(owner, repo, pr_number).await?;
                    for review in &reviews {
                        ctx.capture_store
                            .upsert_review(&job.repository_id, pr_number, review)
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
