//! Request execution with timeout cancellation and a one-shot proxy fallback

use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use crate::config::EngineConfig;
use crate::constants::HTTP_PROXY_ROUTE;
use crate::error::TryItError;
use crate::models::{BuiltRequest, ExecutionResult, HeaderRecord, RequestPayload};
use crate::network::proxy::{ProxyBody, ProxyErrorBody, ProxyRequestBody};
use crate::network::transport::{HttpTransport, TransportError, TransportRequest};

/// Outcome of the direct attempt when it does not produce a response
enum DirectFailure {
    TimedOut,
    Transport(TransportError),
}

pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    config: EngineConfig,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, config: EngineConfig) -> Self {
        RequestExecutor { transport, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sends `request`, retrying once through the proxy when the failure
    /// looks like a cross-origin block. `None` or zero uses the configured
    /// default timeout.
    pub async fn execute(
        &self,
        request: &BuiltRequest,
        timeout_ms: Option<u64>,
    ) -> Result<ExecutionResult, TryItError> {
        let timeout_ms = match timeout_ms {
            Some(ms) if ms > 0 => ms,
            _ => self.config.default_timeout_ms.max(1),
        };

        tracing::info!(
            method = %request.method,
            url = %request.url,
            timeout_ms,
            "Executing request"
        );

        let failure = match self.execute_direct(request, timeout_ms).await {
            Ok(result) => {
                tracing::info!(
                    status = result.status,
                    duration_ms = result.duration_ms,
                    "Request completed"
                );
                return Ok(result);
            }
            Err(DirectFailure::TimedOut) => {
                tracing::warn!(url = %request.url, timeout_ms, "Request timed out");
                return Err(TryItError::timeout(timeout_ms));
            }
            Err(DirectFailure::Transport(err)) => err,
        };

        if !self.is_likely_cors(&failure, &request.url) {
            tracing::warn!(url = %request.url, error = %failure, "Request failed");
            return Err(TryItError::network(failure.to_string()));
        }

        tracing::info!(
            url = %request.url,
            error = %failure,
            "Direct request blocked, retrying via proxy"
        );

        match self.execute_via_proxy(request, timeout_ms).await {
            Ok(result) => {
                tracing::info!(status = result.status, "Proxy request completed");
                Ok(result)
            }
            Err(proxy_failure) => {
                tracing::warn!(error = %proxy_failure, "Proxy retry failed");
                Err(TryItError::cors(&failure.to_string(), &proxy_failure))
            }
        }
    }

    async fn execute_direct(
        &self,
        request: &BuiltRequest,
        timeout_ms: u64,
    ) -> Result<ExecutionResult, DirectFailure> {
        let started = Instant::now();
        let outgoing = TransportRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        };

        // Losing the race drops the send future, which aborts the call
        let response = tokio::select! {
            result = self.transport.send(outgoing) => result,
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                return Err(DirectFailure::TimedOut);
            }
        };
        let response = response.map_err(DirectFailure::Transport)?;

        let content_type = response.content_type().map(String::from);
        Ok(ExecutionResult {
            method: request.method.clone(),
            url: request.url.clone(),
            status: response.status,
            status_text: response.status_text,
            duration_ms: started.elapsed().as_millis() as u64,
            headers: response.headers,
            body_text: response.body_text,
            content_type,
        })
    }

    /// A connection-level failure against a different origin than ours.
    /// Without a known origin nothing counts as cross-origin.
    fn is_likely_cors(&self, failure: &TransportError, request_url: &str) -> bool {
        if !failure.is_network() {
            return false;
        }

        let Some(origin) = self
            .config
            .current_origin
            .as_deref()
            .and_then(|origin| Url::parse(origin).ok())
        else {
            return false;
        };

        match origin.join(request_url) {
            Ok(target) => target.origin() != origin.origin(),
            Err(_) => false,
        }
    }

    async fn execute_via_proxy(
        &self,
        request: &BuiltRequest,
        timeout_ms: u64,
    ) -> Result<ExecutionResult, String> {
        let proxy_url = Url::parse(&self.config.proxy_base_url)
            .and_then(|base| base.join(HTTP_PROXY_ROUTE))
            .map_err(|e| format!("Invalid proxy URL: {}", e))?;

        let descriptor = ProxyRequestBody {
            method: Some(request.method.clone()),
            url: Some(request.url.clone()),
            headers: request.headers.clone(),
            timeout_ms: Some(timeout_ms as f64),
            body: ProxyBody::from(request.curl_body.as_ref()),
        };
        let payload = serde_json::to_string(&descriptor).map_err(|e| e.to_string())?;

        let mut headers = HeaderRecord::new();
        headers.insert(String::from("content-type"), String::from("application/json"));

        let response = self
            .transport
            .send(TransportRequest {
                method: String::from("POST"),
                url: proxy_url.to_string(),
                headers,
                body: Some(RequestPayload::Text(payload)),
            })
            .await
            .map_err(|e| e.to_string())?;

        if !response.is_success() {
            let message = serde_json::from_str::<ProxyErrorBody>(&response.body_text)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    format!(
                        "Proxy request failed (HTTP {} {}).",
                        response.status, response.status_text
                    )
                });
            return Err(message);
        }

        serde_json::from_str::<ExecutionResult>(&response.body_text)
            .map_err(|_| String::from("Proxy returned an invalid response."))
    }
}
