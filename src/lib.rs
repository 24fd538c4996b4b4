//! # tryit
//!
//! OpenAPI-driven request construction and execution.
//!
//! ## Features
//! - OpenAPI 3.x documents in JSON or YAML, with located parse errors
//! - Local `$ref` resolution with cycle detection
//! - Example values synthesized from schemas
//! - Tag-grouped endpoint catalog
//! - Validated request building (path, query, header, cookie, body, auth)
//! - Execution with timeout and a proxy fallback for cross-origin failures
//! - cURL export
//!
//! ## Architecture
//! - `openapi` - parsing, schema resolution, examples, catalog
//! - `request` - draft input to a validated request
//! - `network` - transport, executor and the proxy route handlers
//! - `app` - viewer state and the session owning it

pub mod app;
pub mod config;
pub mod constants;
pub mod curl;
pub mod error;
pub mod models;
pub mod network;
pub mod openapi;
pub mod request;

// Re-export commonly used types
pub use app::{DraftPatch, SpecSession, SpecSource, SpecViewerState, TryItDraft};
pub use config::EngineConfig;
pub use curl::build_curl_command;
pub use error::{OpenApiParseError, SpecFetchError, SpecLoadError, TryItError, TryItErrorKind};
pub use models::{AuthSelection, BuiltRequest, ExecutionResult, HttpMethod, ParamLocation};
pub use network::{HttpTransport, ProxyHandler, ReqwestTransport, RequestExecutor, SpecFetcher};
pub use openapi::{normalize_open_api_document, parse_open_api_document, OpenApiDocument};
pub use request::{build_try_it_request, BuildRequestInput};
