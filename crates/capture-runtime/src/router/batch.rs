use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{BackendHandle, BackendKind, Job, JobData, JobKind};
use serde::Deserialize;
use uuid::Uuid;

use crate::forge_client::{HttpTransport, TransportRequest, TransportResponse};
use crate::store::JobStore;

const WORKFLOW_NAME: &str = "progressive-capture-historical-sync";
const RETRY_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct DispatchResponse {
    #[serde(rename = "runId")]
    run_id: String,
}

/// Batch back-end: a thin client for the external job runner's
/// `dispatch(workflowName, inputMap)` contract (spec §4.1, §6), grounded
/// on the teacher's `JobDispatcher::dispatch_by_name` shape (name + JSON
/// payload → opaque id) adapted to capture a `runId` string instead of a
/// `Uuid`. Never executes the capture itself — that happens out-of-process
/// in the runner, which is why `enqueue` returns once dispatch is accepted.
pub struct BatchBackend<T: HttpTransport> {
    transport: T,
    dispatch_url: String,
    job_store: JobStore,
}

impl<T: HttpTransport> BatchBackend<T> {
    pub fn new(transport: T, dispatch_url: impl Into<String>, job_store: JobStore) -> Self {
        Self {
            transport,
            dispatch_url: dispatch_url.into(),
            job_store,
        }
    }

    async fn dispatch_once(&self, job: &Job) -> Result<String> {
        let mut inputs = HashMap::new();
        inputs.insert("repository_id".to_string(), job.repository_id.clone());
        inputs.insert("repository_name".to_string(), job.repository_name.clone());
        inputs.insert("job_id".to_string(), job.id.to_string());
        if let Some(days) = job.time_range_days {
            inputs.insert("time_range_days".to_string(), days.to_string());
        }
        if let Some(max_items) = job.max_items {
            inputs.insert("max_items".to_string(), max_items.to_string());
        }

        let body = serde_json::json!({ "workflowName": WORKFLOW_NAME, "inputs": inputs });
        let response = self
            .transport
            .send(TransportRequest {
                method: "POST",
                url: self.dispatch_url.clone(),
                body: Some(body),
            })
            .await?;

        parse_dispatch_response(response)
    }

    /// One dispatch attempt, then one retry against the same back-end
    /// after a short bounded wait (spec §4.1 "Failure semantics").
    async fn dispatch_with_retry(&self, job: &Job) -> Result<String> {
        match self.dispatch_once(job).await {
            Ok(run_id) => Ok(run_id),
            Err(first) => {
                tracing::warn!(job_id = %job.id, error = %first, "batch dispatch refused, retrying once");
                tokio::time::sleep(RETRY_WAIT).await;
                self.dispatch_once(job).await.map_err(|_| {
                    CaptureError::BackendUnavailable(format!(
                        "batch dispatch refused twice for job {}: {first}",
                        job.id
                    ))
                })
            }
        }
    }
}

impl<T: HttpTransport> BackendHandle for BatchBackend<T> {
    fn enqueue<'a>(
        &'a self,
        kind: JobKind,
        data: JobData,
    ) -> Pin<Box<dyn Future<Output = Result<Job>> + Send + 'a>> {
        Box::pin(async move {
            let job = self.job_store.create(kind, BackendKind::Batch, data).await?;

            match self.dispatch_with_retry(&job).await {
                Ok(run_id) => {
                    self.job_store.set_external_run_id(job.id, run_id).await?;
                    self.job_store.start(job.id).await
                }
                Err(e) => {
                    self.job_store.fail(job.id, e.to_string()).await?;
                    Err(e)
                }
            }
        })
    }

    /// Best-effort: the external runner owns its own in-flight forge
    /// calls, so this only records the operator's intent locally.
    fn cancel<'a>(&'a self, job_id: Uuid) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.job_store.fail(job_id, "cancelled").await?;
            Ok(())
        })
    }
}

fn parse_dispatch_response(response: TransportResponse) -> Result<String> {
    if response.status >= 400 {
        return Err(CaptureError::Transport(format!(
            "dispatch refused with status {}",
            response.status
        )));
    }

    let parsed: DispatchResponse = serde_json::from_value(response.body)
        .map_err(|e| CaptureError::Transport(format!("malformed dispatch response: {e}")))?;
    Ok(parsed.run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_dispatch_response() {
        let response = TransportResponse {
            status: 202,
            body: serde_json::json!({ "runId": "run-123" }),
        };
        assert_eq!(parse_dispatch_response(response).unwrap(), "run-123");
    }

    #[test]
    fn rejects_an_error_status_as_transport() {
        let response = TransportResponse {
            status: 503,
            body: serde_json::json!({ "error": "runner unavailable" }),
        };
        let err = parse_dispatch_response(response).unwrap_err();
        assert!(matches!(err, CaptureError::Transport(_)));
    }

    #[test]
    fn rejects_a_body_missing_run_id_as_transport() {
        let response = TransportResponse {
            status: 200,
            body: serde_json::json!({ "status": "accepted" }),
        };
        let err = parse_dispatch_response(response).unwrap_err();
        assert!(matches!(err, CaptureError::Transport(_)));
    }
}
