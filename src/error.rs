//! Error types shared across the engine.
//!
//! Parsing and request execution each have their own taxonomy. Both carry a
//! human-readable message; parse errors additionally carry a best-effort
//! location, execution errors carry optional details and validation issues.

use serde::Serialize;
use thiserror::Error;

/// Whether a spec failed to parse at all or parsed into something that is
/// not an OpenAPI 3.x document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorKind {
    /// Syntax error, worth retrying under the other format
    Parse,
    /// Structurally invalid, never retried
    Validation,
}

/// Failure to turn raw spec text into a validated document
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message}{}", location_suffix(.line, .column))]
pub struct OpenApiParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub source_label: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl OpenApiParseError {
    pub fn validation(message: impl Into<String>, source_label: Option<&str>) -> Self {
        OpenApiParseError {
            kind: ParseErrorKind::Validation,
            message: message.into(),
            source_label: source_label.map(String::from),
            line: None,
            column: None,
        }
    }

    pub fn parse(
        message: impl Into<String>,
        source_label: Option<&str>,
        location: Option<(usize, usize)>,
    ) -> Self {
        OpenApiParseError {
            kind: ParseErrorKind::Parse,
            message: message.into(),
            source_label: source_label.map(String::from),
            line: location.map(|(line, _)| line),
            column: location.map(|(_, column)| column),
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ParseErrorKind::Validation
    }
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" (line {}, column {})", line, column),
        _ => String::new(),
    }
}

/// Category of a failed build or execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TryItErrorKind {
    Validation,
    Timeout,
    Network,
    Cors,
}

impl TryItErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            TryItErrorKind::Validation => "validation",
            TryItErrorKind::Timeout => "timeout",
            TryItErrorKind::Network => "network",
            TryItErrorKind::Cors => "cors",
        }
    }
}

/// Failure to build or execute a try-it request
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[error("{message}")]
pub struct TryItError {
    pub kind: TryItErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl TryItError {
    /// Aggregated validation failure. The first issue becomes the headline.
    pub fn validation(issues: Vec<String>) -> Self {
        let message = issues
            .first()
            .cloned()
            .unwrap_or_else(|| String::from("Request validation failed."));
        TryItError {
            kind: TryItErrorKind::Validation,
            message,
            details: None,
            issues,
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        TryItError {
            kind: TryItErrorKind::Timeout,
            message: format!(
                "Request timed out after {} ms. Increase timeout and try again.",
                timeout_ms
            ),
            details: None,
            issues: Vec::new(),
        }
    }

    pub fn network(details: impl Into<String>) -> Self {
        TryItError {
            kind: TryItErrorKind::Network,
            message: String::from("Network request failed before a response was received."),
            details: Some(details.into()),
            issues: Vec::new(),
        }
    }

    pub fn cors(direct_failure: &str, proxy_failure: &str) -> Self {
        TryItError {
            kind: TryItErrorKind::Cors,
            message: String::from("The request was blocked before a response was received."),
            details: Some(format!(
                "Likely CORS issue. Direct request failed ({}), and proxy retry failed: {}",
                direct_failure, proxy_failure
            )),
            issues: Vec::new(),
        }
    }

    /// Message and details on one line, for logs and terminal output
    pub fn describe(&self) -> String {
        match &self.details {
            Some(details) => format!("{} {}", self.message, details),
            None => self.message.clone(),
        }
    }
}

/// Failure to obtain spec text from a URL or file
#[derive(Debug, Error)]
pub enum SpecFetchError {
    #[error("Enter a spec URL to load.")]
    MissingUrl,

    #[error("\"{0}\" is not a valid URL.")]
    InvalidUrl(String),

    #[error("Failed to load spec from URL (HTTP {status} {status_text}).")]
    Http { status: u16, status_text: String },

    #[error("Fetching spec timed out after {0}ms.")]
    Timeout(u64),

    #[error("Spec proxy rejected the request: {0}")]
    Proxy(String),

    #[error("{0}")]
    Transport(String),

    #[error("Failed to read spec file: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a session could not load a spec
#[derive(Debug, Error)]
pub enum SpecLoadError {
    #[error(transparent)]
    Fetch(#[from] SpecFetchError),

    #[error(transparent)]
    Parse(#[from] OpenApiParseError),
}
