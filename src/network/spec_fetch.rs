//! Spec document retrieval through the `GET /api/spec/fetch` route

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::SPEC_FETCH_ROUTE;
use crate::error::SpecFetchError;
use crate::models::HeaderRecord;
use crate::network::proxy::{validate_target_url, ProxyErrorBody, ProxyFailure};
use crate::network::transport::{HttpTransport, TransportRequest};

/// Successful fetch payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedSpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub content: String,
}

/// Route handler: downloads a spec on behalf of a caller that cannot reach it
pub struct SpecFetcher {
    transport: Arc<dyn HttpTransport>,
    timeout_ms: u64,
}

impl SpecFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout_ms: u64) -> Self {
        SpecFetcher {
            transport,
            timeout_ms,
        }
    }

    pub async fn fetch(&self, url: Option<&str>) -> Result<FetchedSpec, ProxyFailure> {
        let url_input = url.map(str::trim).unwrap_or_default();
        if url_input.is_empty() {
            return Err(ProxyFailure::bad_request(
                "Missing required query parameter: url",
            ));
        }
        let url = validate_target_url(url_input)?;

        tracing::info!(url = %url, "Fetching spec upstream");

        let request = TransportRequest {
            method: String::from("GET"),
            url: url.to_string(),
            headers: HeaderRecord::new(),
            body: None,
        };

        let response = tokio::select! {
            result = self.transport.send(request) => result,
            _ = tokio::time::sleep(Duration::from_millis(self.timeout_ms)) => {
                return Err(ProxyFailure::new(
                    504,
                    format!("Fetching spec timed out after {}ms.", self.timeout_ms),
                ));
            }
        };

        let response = response.map_err(|e| {
            ProxyFailure::new(502, format!("Failed to fetch upstream spec: {}", e))
        })?;

        if !response.is_success() {
            return Err(ProxyFailure::new(
                502,
                format!(
                    "Upstream responded with HTTP {} {}.",
                    response.status, response.status_text
                ),
            ));
        }

        if response.body_text.trim().is_empty() {
            return Err(ProxyFailure::new(422, "Fetched spec content is empty."));
        }

        Ok(FetchedSpec {
            url: url.to_string(),
            content_type: response.content_type().map(String::from),
            content: response.body_text,
        })
    }
}

/// Asks the companion server to fetch `spec_url` on our behalf
pub async fn fetch_spec_via_proxy(
    transport: &dyn HttpTransport,
    proxy_base_url: &str,
    spec_url: &str,
) -> Result<FetchedSpec, SpecFetchError> {
    let mut endpoint = Url::parse(proxy_base_url)
        .and_then(|base| base.join(SPEC_FETCH_ROUTE))
        .map_err(|_| SpecFetchError::InvalidUrl(proxy_base_url.to_string()))?;
    endpoint.query_pairs_mut().append_pair("url", spec_url);

    let response = transport
        .send(TransportRequest {
            method: String::from("GET"),
            url: endpoint.to_string(),
            headers: HeaderRecord::new(),
            body: None,
        })
        .await
        .map_err(|e| SpecFetchError::Transport(e.to_string()))?;

    if !response.is_success() {
        let message = serde_json::from_str::<ProxyErrorBody>(&response.body_text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP {} {}", response.status, response.status_text));
        return Err(SpecFetchError::Proxy(message));
    }

    serde_json::from_str::<FetchedSpec>(&response.body_text)
        .map_err(|_| SpecFetchError::Proxy(String::from("Spec proxy returned an invalid response.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::{TransportError, TransportResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticTransport {
        response: Result<TransportResponse, TransportError>,
        urls: Mutex<Vec<String>>,
    }

    impl StaticTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(StaticTransport {
                response: Ok(TransportResponse {
                    status,
                    status_text: if status == 200 { "OK" } else { "Not Found" }.into(),
                    headers: [("content-type".to_string(), "application/yaml".to_string())]
                        .into_iter()
                        .collect(),
                    body_text: body.into(),
                }),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for StaticTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.urls.lock().unwrap().push(request.url);
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let fetcher = SpecFetcher::new(StaticTransport::new(200, "openapi: 3.0.0"), 15_000);
        let fetched = fetcher
            .fetch(Some(" https://example.com/spec.yaml "))
            .await
            .unwrap();
        assert_eq!(fetched.url, "https://example.com/spec.yaml");
        assert_eq!(fetched.content_type.as_deref(), Some("application/yaml"));
        assert_eq!(fetched.content, "openapi: 3.0.0");
    }

    #[tokio::test]
    async fn test_fetch_failure_statuses() {
        let fetcher = SpecFetcher::new(StaticTransport::new(200, "  \n"), 15_000);
        let err = fetcher.fetch(Some("https://example.com/a")).await.unwrap_err();
        assert_eq!(err.status, 422);

        let fetcher = SpecFetcher::new(StaticTransport::new(404, "nope"), 15_000);
        let err = fetcher.fetch(Some("https://example.com/a")).await.unwrap_err();
        assert_eq!(err.status, 502);
        assert_eq!(err.error, "Upstream responded with HTTP 404 Not Found.");

        let err = fetcher.fetch(None).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.error, "Missing required query parameter: url");
    }

    #[tokio::test]
    async fn test_client_builds_route_url_and_reads_errors() {
        let transport = StaticTransport::new(
            404,
            r#"{"error":"Upstream responded with HTTP 404 Not Found."}"#,
        );
        let err = fetch_spec_via_proxy(
            transport.as_ref(),
            "http://localhost:9090",
            "https://example.com/spec.json?v=1",
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Spec proxy rejected the request: Upstream responded with HTTP 404 Not Found."
        );
        assert_eq!(
            transport.urls.lock().unwrap()[0],
            "http://localhost:9090/api/spec/fetch?url=https%3A%2F%2Fexample.com%2Fspec.json%3Fv%3D1"
        );
    }

    #[tokio::test]
    async fn test_client_parses_payload() {
        let transport = StaticTransport::new(
            200,
            r#"{"url":"https://example.com/s.json","content":"{}","contentType":"application/json"}"#,
        );
        let fetched = fetch_spec_via_proxy(
            transport.as_ref(),
            "http://localhost:9090",
            "https://example.com/s.json",
        )
        .await
        .unwrap();
        assert_eq!(fetched.content, "{}");
        assert_eq!(fetched.content_type.as_deref(), Some("application/json"));
    }
}
