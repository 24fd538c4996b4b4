//! Session - single owner of the viewer state and the I/O around it

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::EngineConfig;
use crate::curl::build_curl_command;
use crate::error::{SpecFetchError, SpecLoadError, TryItError};
use crate::models::{ExecutionResult, HeaderRecord};
use crate::network::executor::RequestExecutor;
use crate::network::spec_fetch::fetch_spec_via_proxy;
use crate::network::transport::{HttpTransport, TransportError, TransportRequest};

use super::state::{DraftPatch, SpecSource, SpecViewerState};

pub struct SpecSession {
    state: SpecViewerState,
    transport: Arc<dyn HttpTransport>,
    executor: RequestExecutor,
}

impl SpecSession {
    pub fn new(transport: Arc<dyn HttpTransport>, config: EngineConfig) -> Self {
        SpecSession {
            state: SpecViewerState::default(),
            executor: RequestExecutor::new(transport.clone(), config),
            transport,
        }
    }

    pub fn state(&self) -> &SpecViewerState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        self.executor.config()
    }

    fn transition(&mut self, next: impl FnOnce(SpecViewerState) -> SpecViewerState) {
        let current = std::mem::take(&mut self.state);
        self.state = next(current);
    }

    pub fn load_from_text(
        &mut self,
        raw_spec: String,
        source: SpecSource,
    ) -> Result<(), SpecLoadError> {
        match SpecViewerState::apply_loaded_spec(raw_spec, source.clone()) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(err) => {
                self.transition(|state| state.with_parse_failure(&err, Some(source)));
                Err(err.into())
            }
        }
    }

    pub async fn load_from_file(&mut self, path: &Path) -> Result<(), SpecLoadError> {
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let source = SpecSource::file(label);

        match tokio::fs::read_to_string(path).await {
            Ok(raw_spec) => self.load_from_text(raw_spec, source),
            Err(err) => self.fail(SpecFetchError::from(err), Some(source)),
        }
    }

    /// Fetches the spec directly; when nothing comes back (connection
    /// failure or timeout) the companion server fetches it instead.
    pub async fn load_from_url(&mut self, input: &str) -> Result<(), SpecLoadError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return self.fail(SpecFetchError::MissingUrl, None);
        }
        let Ok(url) = Url::parse(trimmed) else {
            return self.fail(SpecFetchError::InvalidUrl(trimmed.to_string()), None);
        };
        let source = SpecSource::url(url.to_string());

        tracing::info!(url = %url, "Loading spec from URL");

        match self.fetch_direct(&url).await {
            Ok(raw_spec) => self.load_from_text(raw_spec, source),
            Err(err @ SpecFetchError::Http { .. }) => self.fail(err, Some(source)),
            Err(direct) => {
                tracing::info!(
                    url = %url,
                    error = %direct,
                    "Direct spec fetch failed, using spec proxy"
                );
                match fetch_spec_via_proxy(
                    self.transport.as_ref(),
                    &self.config().proxy_base_url,
                    url.as_str(),
                )
                .await
                {
                    Ok(fetched) => self.load_from_text(fetched.content, source),
                    Err(err) => self.fail(err, Some(source)),
                }
            }
        }
    }

    async fn fetch_direct(&self, url: &Url) -> Result<String, SpecFetchError> {
        let timeout_ms = self.config().spec_fetch_timeout_ms;
        let request = TransportRequest {
            method: String::from("GET"),
            url: url.to_string(),
            headers: HeaderRecord::new(),
            body: None,
        };

        let response = tokio::select! {
            result = self.transport.send(request) => result,
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                return Err(SpecFetchError::Timeout(timeout_ms));
            }
        };

        let response = response.map_err(|e| match e {
            TransportError::Network(message) | TransportError::Other(message) => {
                SpecFetchError::Transport(message)
            }
        })?;

        if !response.is_success() {
            return Err(SpecFetchError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }
        Ok(response.body_text)
    }

    fn fail(
        &mut self,
        err: SpecFetchError,
        source: Option<SpecSource>,
    ) -> Result<(), SpecLoadError> {
        let message = err.to_string();
        self.transition(|state| state.with_failure(message, source));
        Err(err.into())
    }

    pub fn clear(&mut self) {
        self.transition(SpecViewerState::cleared);
    }

    pub fn select_endpoint(&mut self, endpoint_id: Option<&str>) {
        self.transition(|state| state.select_endpoint(endpoint_id));
    }

    pub fn update_draft(&mut self, patch: DraftPatch) {
        self.transition(|state| state.with_draft_patch(patch));
    }

    pub fn clear_response(&mut self) {
        self.transition(SpecViewerState::without_response);
    }

    /// Equivalent shell command for the current draft
    pub fn curl_command(&self) -> Result<String, TryItError> {
        let request = self
            .state
            .build_request(self.config().current_origin.as_deref())?;
        Ok(build_curl_command(&request))
    }

    /// Builds and executes the current draft, keeping the response on success
    pub async fn send(&mut self, timeout_ms: Option<u64>) -> Result<ExecutionResult, TryItError> {
        let request = self
            .state
            .build_request(self.config().current_origin.as_deref())?;
        let result = self.executor.execute(&request, timeout_ms).await?;
        self.transition(|state| state.with_response(result.clone()));
        Ok(result)
    }
}
