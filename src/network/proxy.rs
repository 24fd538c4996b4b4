//! Server side of the HTTP proxy used when direct requests are blocked
//!
//! Mirrors the `POST /api/http/proxy` contract: the caller describes a
//! request, the handler replays it upstream and answers with the same
//! envelope a direct attempt would have produced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::constants::{DEFAULT_TIMEOUT_MS, MAX_PROXY_TIMEOUT_MS, MAX_URL_LENGTH};
use crate::models::{CurlBody, ExecutionResult, FormEntry, HeaderRecord, RequestPayload};
use crate::network::transport::{HttpTransport, TransportRequest};

/// Body descriptor carried inside a proxy request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProxyBody {
    #[default]
    None,
    Raw {
        #[serde(default)]
        value: String,
    },
    Multipart {
        #[serde(default)]
        entries: Vec<FormEntry>,
    },
}

impl From<Option<&CurlBody>> for ProxyBody {
    fn from(body: Option<&CurlBody>) -> Self {
        match body {
            None => ProxyBody::None,
            Some(CurlBody::Raw { value }) => ProxyBody::Raw {
                value: value.clone(),
            },
            Some(CurlBody::Multipart { entries }) => ProxyBody::Multipart {
                entries: entries.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyRequestBody {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: HeaderRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<f64>,
    pub body: ProxyBody,
}

/// JSON error payload returned with a non-2xx status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyErrorBody {
    pub error: String,
}

/// Rejection with the HTTP status the route answers with
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{error}")]
pub struct ProxyFailure {
    pub status: u16,
    pub error: String,
}

impl ProxyFailure {
    pub fn new(status: u16, error: impl Into<String>) -> Self {
        ProxyFailure {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(400, error)
    }

    pub fn body(&self) -> ProxyErrorBody {
        ProxyErrorBody {
            error: self.error.clone(),
        }
    }
}

/// Checks length, syntax and scheme of a user-supplied target URL
pub fn validate_target_url(input: &str) -> Result<Url, ProxyFailure> {
    // Length is counted in UTF-16 code units, as browsers report it
    if input.encode_utf16().count() > MAX_URL_LENGTH {
        return Err(ProxyFailure::bad_request("URL is too long."));
    }

    let url = Url::parse(input)
        .map_err(|_| ProxyFailure::bad_request(format!("Invalid URL: \"{}\"", input)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ProxyFailure::bad_request(
            "Only http and https URLs are supported.",
        ));
    }

    Ok(url)
}

/// Missing, zero or non-finite values fall back to the default
pub fn clamp_timeout(timeout_ms: Option<f64>) -> u64 {
    match timeout_ms {
        Some(ms) if ms.is_finite() && ms != 0.0 => {
            (ms.floor().max(1.0) as u64).min(MAX_PROXY_TIMEOUT_MS)
        }
        _ => DEFAULT_TIMEOUT_MS,
    }
}

/// Replays described requests through the wrapped transport
pub struct ProxyHandler {
    transport: Arc<dyn HttpTransport>,
}

impl ProxyHandler {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        ProxyHandler { transport }
    }

    pub async fn handle(&self, request: ProxyRequestBody) -> Result<ExecutionResult, ProxyFailure> {
        let method = request
            .method
            .as_deref()
            .map(|m| m.trim().to_uppercase())
            .unwrap_or_default();
        let url_input = request
            .url
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let timeout_ms = clamp_timeout(request.timeout_ms);

        if method.is_empty() {
            return Err(ProxyFailure::bad_request("Missing required field: method"));
        }
        if url_input.is_empty() {
            return Err(ProxyFailure::bad_request("Missing required field: url"));
        }
        let url = validate_target_url(&url_input)?;

        let mut headers = HeaderRecord::new();
        for (name, value) in &request.headers {
            let normalized = name.trim().to_lowercase();
            if normalized.is_empty() || normalized == "host" || normalized == "content-length" {
                continue;
            }
            headers.insert(normalized, value.clone());
        }

        let body = match request.body {
            ProxyBody::None => None,
            ProxyBody::Raw { value } => Some(RequestPayload::Text(value)),
            ProxyBody::Multipart { entries } => {
                // The transport writes its own boundary
                headers.remove("content-type");
                Some(RequestPayload::Multipart(
                    entries
                        .into_iter()
                        .filter(|entry| !entry.name.trim().is_empty())
                        .collect(),
                ))
            }
        };

        tracing::info!(method = %method, url = %url, timeout_ms, "Proxying request");

        let started = Instant::now();
        let upstream = TransportRequest {
            method: method.clone(),
            url: url.to_string(),
            headers,
            body,
        };

        let response = tokio::select! {
            result = self.transport.send(upstream) => result,
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                tracing::warn!(url = %url, timeout_ms, "Proxied request timed out");
                return Err(ProxyFailure::new(
                    504,
                    format!("Proxy request timed out after {} ms.", timeout_ms),
                ));
            }
        };

        let response = response.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Proxied request failed");
            ProxyFailure::new(502, format!("Proxy request failed: {}", e))
        })?;

        let content_type = response.content_type().map(String::from);
        Ok(ExecutionResult {
            method,
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text,
            duration_ms: started.elapsed().as_millis() as u64,
            headers: response.headers,
            body_text: response.body_text,
            content_type,
        })
    }
}
