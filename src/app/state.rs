//! Viewer state - pure data plus transitions, no I/O
//!
//! Every transition consumes the current state and returns the next one, so
//! the owner can swap states atomically and tests can drive them directly.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{OpenApiParseError, TryItError};
use crate::models::{AuthSelection, BuiltRequest, ExecutionResult, ParamValues};
use crate::openapi::normalize::{
    normalize_open_api_document, EndpointNavItem, EndpointTagGroup, SpecMetadata,
};
use crate::openapi::operation::{operation_details, OperationDetails};
use crate::openapi::parse::{
    format_open_api_error, parse_open_api_document, OpenApiDocument, ParseOptions,
};
use crate::request::{build_try_it_request, BuildRequestInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecSourceKind {
    Url,
    File,
    Text,
}

/// Where the current document came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpecSource {
    pub kind: SpecSourceKind,
    pub label: String,
}

impl SpecSource {
    pub fn url(label: impl Into<String>) -> Self {
        SpecSource {
            kind: SpecSourceKind::Url,
            label: label.into(),
        }
    }

    pub fn file(label: impl Into<String>) -> Self {
        SpecSource {
            kind: SpecSourceKind::File,
            label: label.into(),
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        SpecSource {
            kind: SpecSourceKind::Text,
            label: label.into(),
        }
    }
}

/// User input for the selected endpoint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TryItDraft {
    pub enabled: bool,
    pub base_url: String,
    pub path_params: ParamValues,
    pub query_params: ParamValues,
    pub header_params: ParamValues,
    pub cookie_params: ParamValues,
    pub body_text: String,
    pub content_type: Option<String>,
    pub accept_header: Option<String>,
    pub auth: AuthSelection,
    pub last_response: Option<ExecutionResult>,
}

impl TryItDraft {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        TryItDraft {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Partial update merged over the current draft. `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct DraftPatch {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub path_params: Option<ParamValues>,
    pub query_params: Option<ParamValues>,
    pub header_params: Option<ParamValues>,
    pub cookie_params: Option<ParamValues>,
    pub body_text: Option<String>,
    pub content_type: Option<Option<String>>,
    pub accept_header: Option<Option<String>>,
    pub auth: Option<AuthSelection>,
}

#[derive(Clone, Debug, Default)]
pub struct SpecViewerState {
    pub source: Option<SpecSource>,
    pub error: Option<String>,
    pub document: Option<OpenApiDocument>,
    pub raw_spec: Option<String>,
    pub metadata: Option<SpecMetadata>,
    pub endpoint_groups: Vec<EndpointTagGroup>,
    pub endpoint_by_id: BTreeMap<String, EndpointNavItem>,
    /// Sorted catalog, the first entry is selected on load
    pub endpoints: Vec<EndpointNavItem>,
    pub selected_endpoint_id: Option<String>,
    pub try_it: TryItDraft,
}

impl SpecViewerState {
    /// Parses and catalogs `raw_spec`, replacing any prior document. The first
    /// endpoint is selected and its draft pre-filled.
    pub fn apply_loaded_spec(
        raw_spec: String,
        source: SpecSource,
    ) -> Result<Self, OpenApiParseError> {
        let parsed = parse_open_api_document(&raw_spec, &ParseOptions::for_source(&source.label))?;
        let normalized = normalize_open_api_document(&parsed.document);
        let base_url = parsed.document.first_server_url().unwrap_or_default();
        let first_id = normalized.endpoints.first().map(|e| e.id.clone());

        tracing::info!(
            source = %source.label,
            title = %normalized.metadata.title,
            version = %normalized.metadata.version,
            format = parsed.format.as_str(),
            endpoints = normalized.operation_count(),
            "Spec loaded"
        );

        let state = SpecViewerState {
            source: Some(source),
            error: None,
            document: Some(parsed.document),
            raw_spec: Some(raw_spec),
            metadata: Some(normalized.metadata),
            endpoint_groups: normalized.endpoint_groups,
            endpoint_by_id: normalized.endpoint_by_id,
            endpoints: normalized.endpoints,
            selected_endpoint_id: None,
            try_it: TryItDraft::with_base_url(base_url),
        };

        Ok(match first_id {
            Some(id) => state.select_endpoint(Some(&id)),
            None => state,
        })
    }

    /// Drops the document and records `message`. The source is replaced only
    /// when one is given.
    pub fn with_failure(self, message: impl Into<String>, source: Option<SpecSource>) -> Self {
        let message = message.into();
        tracing::warn!(error = %message, "Spec load failed");
        SpecViewerState {
            source: source.or(self.source),
            error: Some(message),
            ..Default::default()
        }
    }

    /// Failure state for a parse error, rendered with its location
    pub fn with_parse_failure(self, err: &OpenApiParseError, source: Option<SpecSource>) -> Self {
        self.with_failure(format_open_api_error(err), source)
    }

    pub fn cleared(self) -> Self {
        SpecViewerState::default()
    }

    /// `None` clears the selection; unknown ids leave the state untouched.
    /// Moving to a different endpoint starts a fresh draft for it.
    pub fn select_endpoint(mut self, endpoint_id: Option<&str>) -> Self {
        let Some(endpoint_id) = endpoint_id else {
            self.selected_endpoint_id = None;
            return self;
        };

        let Some(endpoint) = self.endpoint_by_id.get(endpoint_id) else {
            tracing::debug!(endpoint_id, "Ignoring unknown endpoint");
            return self;
        };

        if self.selected_endpoint_id.as_deref() == Some(endpoint_id) {
            return self;
        }

        let details = self
            .document
            .as_ref()
            .and_then(|doc| operation_details(doc, &endpoint.path, endpoint.method));
        self.try_it = self.fresh_draft(details.as_ref());
        self.selected_endpoint_id = Some(endpoint_id.to_string());
        tracing::debug!(endpoint_id, "Endpoint selected");
        self
    }

    pub fn with_draft_patch(mut self, patch: DraftPatch) -> Self {
        let draft = &mut self.try_it;
        if let Some(enabled) = patch.enabled {
            draft.enabled = enabled;
        }
        if let Some(base_url) = patch.base_url {
            draft.base_url = base_url;
        }
        if let Some(values) = patch.path_params {
            draft.path_params = values;
        }
        if let Some(values) = patch.query_params {
            draft.query_params = values;
        }
        if let Some(values) = patch.header_params {
            draft.header_params = values;
        }
        if let Some(values) = patch.cookie_params {
            draft.cookie_params = values;
        }
        if let Some(body_text) = patch.body_text {
            draft.body_text = body_text;
        }
        if let Some(content_type) = patch.content_type {
            draft.content_type = content_type;
        }
        if let Some(accept_header) = patch.accept_header {
            draft.accept_header = accept_header;
        }
        if let Some(auth) = patch.auth {
            draft.auth = auth;
        }
        self
    }

    pub fn with_response(mut self, response: ExecutionResult) -> Self {
        self.try_it.last_response = Some(response);
        self
    }

    pub fn without_response(mut self) -> Self {
        self.try_it.last_response = None;
        self
    }

    pub fn selected_endpoint(&self) -> Option<&EndpointNavItem> {
        self.endpoint_by_id.get(self.selected_endpoint_id.as_deref()?)
    }

    pub fn operation_count(&self) -> usize {
        self.endpoint_by_id.len()
    }

    /// Parameters, body and auth details of the selected endpoint
    pub fn selected_operation(&self) -> Option<OperationDetails> {
        let endpoint = self.selected_endpoint()?;
        operation_details(self.document.as_ref()?, &endpoint.path, endpoint.method)
    }

    /// Builds the selected endpoint's request from the current draft
    pub fn build_request(&self, current_origin: Option<&str>) -> Result<BuiltRequest, TryItError> {
        let (Some(endpoint), Some(details)) = (self.selected_endpoint(), self.selected_operation())
        else {
            return Err(TryItError::validation(vec![String::from(
                "Select an endpoint before sending a request.",
            )]));
        };

        let draft = &self.try_it;
        build_try_it_request(&BuildRequestInput {
            method: endpoint.method.to_string(),
            path_template: endpoint.path.clone(),
            base_url: draft.base_url.clone(),
            parameters: details.parameters,
            path_params: draft.path_params.clone(),
            query_params: draft.query_params.clone(),
            header_params: draft.header_params.clone(),
            cookie_params: draft.cookie_params.clone(),
            body_text: draft.body_text.clone(),
            content_type: draft.content_type.clone(),
            accept_header: draft.accept_header.clone(),
            auth: draft.auth.clone(),
            current_origin: current_origin.map(String::from),
        })
    }

    /// Defaults for a newly selected endpoint: its server (or the document's),
    /// its default body content type and an example body
    fn fresh_draft(&self, details: Option<&OperationDetails>) -> TryItDraft {
        let document_server = self
            .document
            .as_ref()
            .and_then(OpenApiDocument::first_server_url);
        let base_url = details
            .and_then(|d| d.server_url.clone())
            .or(document_server)
            .unwrap_or_default();

        let mut draft = TryItDraft::with_base_url(base_url);
        if let Some(body) = details.and_then(|d| d.request_body.as_ref()) {
            draft.content_type = body.default_content_type.clone();
            draft.body_text = body.example_text.clone();
        }
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TryItErrorKind;

    const SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Pets
  version: "1.2"
servers:
  - url: https://api.example.com/v1
paths:
  /pets:
    post:
      operationId: createPet
      servers:
        - url: https://write.example.com
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: { type: string }
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          required: true
"#;

    fn loaded() -> SpecViewerState {
        SpecViewerState::apply_loaded_spec(SPEC.to_string(), SpecSource::file("pets.yaml"))
            .unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> ParamValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_selects_first_endpoint() {
        let state = loaded();
        assert_eq!(state.operation_count(), 2);
        assert_eq!(state.selected_endpoint_id.as_deref(), Some("listPets"));
        assert_eq!(state.try_it.base_url, "https://api.example.com/v1");
        assert_eq!(state.metadata.as_ref().unwrap().title, "Pets");
        assert!(state.error.is_none());
    }

    #[test]
    fn test_parse_failure_state() {
        let err = SpecViewerState::apply_loaded_spec("{".into(), SpecSource::text("inline"))
            .unwrap_err();
        let state = loaded().with_parse_failure(&err, Some(SpecSource::url("https://x.test/a")));
        assert!(state.document.is_none());
        assert!(state.endpoint_by_id.is_empty());
        assert!(state.error.as_deref().unwrap().starts_with("Invalid"));
        assert_eq!(state.source, Some(SpecSource::url("https://x.test/a")));
    }

    #[test]
    fn test_failure_keeps_previous_source_when_none_given() {
        let state = loaded().with_failure("Enter a spec URL to load.", None);
        assert_eq!(state.source, Some(SpecSource::file("pets.yaml")));
        assert_eq!(state.error.as_deref(), Some("Enter a spec URL to load."));
    }

    #[test]
    fn test_selecting_other_endpoint_replaces_draft() {
        let state = loaded().with_draft_patch(DraftPatch {
            query_params: Some(values(&[("limit", "5")])),
            ..Default::default()
        });
        assert_eq!(state.try_it.query_params.get("limit").map(String::as_str), Some("5"));

        let same = state.clone().select_endpoint(Some("listPets"));
        assert_eq!(same.try_it, state.try_it);

        let other = state.select_endpoint(Some("createPet"));
        assert!(other.try_it.query_params.is_empty());
        assert_eq!(other.try_it.base_url, "https://write.example.com");
        assert_eq!(other.try_it.content_type.as_deref(), Some("application/json"));
        assert_eq!(other.try_it.body_text, "{\n  \"name\": \"string\"\n}");
    }

    #[test]
    fn test_unknown_endpoint_ignored_and_none_clears() {
        let state = loaded().select_endpoint(Some("nope"));
        assert_eq!(state.selected_endpoint_id.as_deref(), Some("listPets"));

        let state = state.select_endpoint(None);
        assert!(state.selected_endpoint().is_none());
    }

    #[test]
    fn test_build_request_from_draft() {
        let state = loaded();
        let err = state.build_request(None).unwrap_err();
        assert_eq!(err.kind, TryItErrorKind::Validation);
        assert_eq!(err.message, "Query parameter \"limit\" is required.");

        let state = state.with_draft_patch(DraftPatch {
            query_params: Some(values(&[("limit", "5")])),
            ..Default::default()
        });
        let built = state.build_request(None).unwrap();
        assert_eq!(built.method, "GET");
        assert_eq!(built.url, "https://api.example.com/v1/pets?limit=5");
    }

    #[test]
    fn test_response_transitions_and_clear() {
        let response = ExecutionResult {
            method: "GET".into(),
            url: "https://api.example.com/v1/pets".into(),
            status: 200,
            status_text: "OK".into(),
            duration_ms: 3,
            headers: Default::default(),
            body_text: "[]".into(),
            content_type: None,
        };
        let state = loaded().with_response(response.clone());
        assert_eq!(state.try_it.last_response, Some(response));

        let state = state.without_response();
        assert!(state.try_it.last_response.is_none());

        let state = state.cleared();
        assert!(state.document.is_none());
        assert!(state.source.is_none());
        assert_eq!(state.try_it, TryItDraft::default());
    }

    #[test]
    fn test_build_without_selection_fails() {
        let err = SpecViewerState::default().build_request(None).unwrap_err();
        assert_eq!(err.message, "Select an endpoint before sending a request.");
    }
}
