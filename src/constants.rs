//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default base URL of the companion server that hosts the proxy routes
pub const DEFAULT_PROXY_BASE_URL: &str = "http://localhost:9090";

/// Route on the companion server that replays a request on our behalf
pub const HTTP_PROXY_ROUTE: &str = "/api/http/proxy";

/// Route on the companion server that fetches a remote spec document
pub const SPEC_FETCH_ROUTE: &str = "/api/spec/fetch";

/// Default deadline for a single request execution
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Upper bound the proxy applies to a caller-supplied timeout
pub const MAX_PROXY_TIMEOUT_MS: u64 = 120_000;

/// Fixed deadline for fetching a remote spec
pub const SPEC_FETCH_TIMEOUT_MS: u64 = 15_000;

/// Longest target URL either proxy route accepts
pub const MAX_URL_LENGTH: usize = 4096;

/// Tag assigned to operations that declare none
pub const UNTAGGED: &str = "Untagged";

/// Schema example synthesis stops descending past this depth
pub const MAX_SAMPLE_DEPTH: usize = 6;

/// Log file written by the binary
pub const LOG_FILE_NAME: &str = "tryit.log";

/// Application name
pub const APP_NAME: &str = "tryit";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
