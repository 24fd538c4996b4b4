//! HTTP transport - the single I/O capability the executor and proxy handlers use

use async_trait::async_trait;
use thiserror::Error;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::models::{FormEntry, HeaderRecord, RequestPayload};

/// A request as handed to the wire
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderRecord,
    pub body: Option<RequestPayload>,
}

/// Buffered upstream response
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    /// Lower-cased names, repeated values joined with ", "
    pub headers: HeaderRecord,
    pub body_text: String,
}

impl TransportResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    /// Nothing came back: connection refused, DNS, TLS, reset
    #[error("{0}")]
    Network(String),

    /// The request could not be issued or its response could not be read
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        ReqwestTransport {
            client: create_client(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }

    fn build_request(
        &self,
        request: TransportRequest,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::Other(format!("Invalid HTTP method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(RequestPayload::Text(text)) => builder.body(text),
            Some(RequestPayload::Multipart(entries)) => builder.multipart(multipart_form(entries)),
            None => builder,
        };

        Ok(builder)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let builder = self.build_request(request)?;

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::Other(format!("Request failed: {}", e))
            } else {
                TransportError::Network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let headers = headers_to_record(response.headers());
        let body_text = response
            .text()
            .await
            .map_err(|e| TransportError::Other(format!("Error reading body: {}", e)))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body_text,
        })
    }
}

fn multipart_form(entries: Vec<FormEntry>) -> reqwest::multipart::Form {
    entries
        .into_iter()
        .fold(reqwest::multipart::Form::new(), |form, entry| {
            form.text(entry.name, entry.value)
        })
}

fn headers_to_record(headers: &reqwest::header::HeaderMap) -> HeaderRecord {
    let mut record = HeaderRecord::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        record
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    record
}

/// Create an HTTP client with default configuration.
/// Deadlines are enforced by callers, so the client itself has none.
pub fn create_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(format!("{}/{}", APP_NAME, APP_VERSION))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
