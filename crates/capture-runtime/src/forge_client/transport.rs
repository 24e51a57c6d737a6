use std::future::Future;
use std::pin::Pin;

use capture_core::error::{CaptureError, Result};
use serde_json::Value;

/// A single HTTP exchange, abstracted so the compound and fine-grained
/// clients can run over either a real `reqwest::Client` or, in tests,
/// `capture_core::testing::MockHttp` without a network.
pub struct TransportRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

pub trait HttpTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    token: String,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = match request.method {
                "GET" => self.client.get(&request.url),
                "POST" => self.client.post(&request.url),
                other => {
                    return Err(CaptureError::Internal(format!(
                        "unsupported transport method '{other}'"
                    )))
                }
            }
            .bearer_auth(&self.token);

            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = tokio::time::timeout(std::time::Duration::from_secs(15), builder.send())
                .await
                .map_err(|_| CaptureError::Timeout(format!("forge call to {} timed out", request.url)))?
                .map_err(|e| CaptureError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .json::<Value>()
                .await
                .map_err(|e| CaptureError::Transport(e.to_string()))?;

            Ok(TransportResponse { status, body })
        })
    }
}
