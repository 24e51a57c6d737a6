use std::future::Future;
use std::pin::Pin;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{Job, JobKind};

use super::{check_cancelled, split_repository_name, CaptureWorker, WorkerContext};

/// File-diff-only re-sync. The forge has no standalone files endpoint, so
/// this still pulls the complete payload but only persists `files` —
/// cheaper to reason about than a fifth bespoke query path, at the cost of
/// discarding the rest of the response.
pub struct FileChangesWorker;

impl CaptureWorker for FileChangesWorker {
    fn kind(&self) -> JobKind {
        JobKind::FileChanges
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
                CaptureError::InvalidArgument("file-changes job requires explicit pr_numbers".into())
            })?;

            for &pr_number in pr_numbers {
                check_cancelled(ctx)?;
                let item_id = pr_number.to_string();
                ctx.process_item(job.id, &item_id, || async {
                    let complete = ctx.forge.get_pr_complete_data(owner, repo, pr_number).await?;
                    for file in &complete.files {
                        ctx.capture_store
                            .upsert_file_change(&job.repository_id, pr_number, file)
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
