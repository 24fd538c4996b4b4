//! Engine configuration
//!
//! Defaults come from [`crate::constants`]; `from_env` layers environment
//! overrides on top and the binary layers its flags on top of that.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROXY_BASE_URL, DEFAULT_TIMEOUT_MS, SPEC_FETCH_TIMEOUT_MS};

/// Environment variable naming the companion server base URL
pub const ENV_SERVER_URL: &str = "TRYIT_SERVER_URL";
/// Environment variable naming the origin requests are issued from
pub const ENV_ORIGIN: &str = "TRYIT_ORIGIN";
/// Environment variable overriding the default request timeout
pub const ENV_TIMEOUT_MS: &str = "TRYIT_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base URL of the server exposing the proxy routes
    pub proxy_base_url: String,
    /// Origin the host environment runs under. When unset, no request is
    /// considered cross-origin and the proxy fallback never triggers.
    pub current_origin: Option<String>,
    pub default_timeout_ms: u64,
    pub spec_fetch_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            proxy_base_url: String::from(DEFAULT_PROXY_BASE_URL),
            current_origin: None,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            spec_fetch_timeout_ms: SPEC_FETCH_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any `TRYIT_*` variables present in the environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Blank or unparsable
    /// values are skipped.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_SERVER_URL).map(|v| v.trim().to_string()) {
            if url.is_empty() {
                tracing::warn!(key = ENV_SERVER_URL, "Ignoring blank override");
            } else {
                self.proxy_base_url = url;
            }
        }

        if let Some(origin) = lookup(ENV_ORIGIN).map(|v| v.trim().to_string()) {
            if !origin.is_empty() {
                self.current_origin = Some(origin);
            }
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.default_timeout_ms = ms,
                _ => tracing::warn!(key = ENV_TIMEOUT_MS, value = %raw, "Ignoring invalid timeout override"),
            }
        }

        self
    }
}
