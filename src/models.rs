use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header names are stored lower-cased, one value per name
pub type HeaderRecord = BTreeMap<String, String>;

/// User-entered values for one parameter location, keyed by parameter name
/// and kept in entry order
pub type ParamValues = IndexMap<String, String>;

/// HTTP Method enum, declared in catalog display order
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    PUT,
    POST,
    DELETE,
    OPTIONS,
    HEAD,
    PATCH,
    TRACE,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::GET,
        HttpMethod::PUT,
        HttpMethod::POST,
        HttpMethod::DELETE,
        HttpMethod::OPTIONS,
        HttpMethod::HEAD,
        HttpMethod::PATCH,
        HttpMethod::TRACE,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::PUT => "PUT",
            HttpMethod::POST => "POST",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::TRACE => "TRACE",
        }
    }

    /// Key of the operation object inside an OpenAPI path item
    pub fn as_lower(&self) -> &'static str {
        match self {
            HttpMethod::GET => "get",
            HttpMethod::PUT => "put",
            HttpMethod::POST => "post",
            HttpMethod::DELETE => "delete",
            HttpMethod::OPTIONS => "options",
            HttpMethod::HEAD => "head",
            HttpMethod::PATCH => "patch",
            HttpMethod::TRACE => "trace",
        }
    }

    /// Position used when sorting endpoints that share a path
    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn parse(s: &str) -> Option<HttpMethod> {
        let upper = s.trim().to_uppercase();
        HttpMethod::ALL.into_iter().find(|m| m.as_str() == upper)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter location in request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(s: &str) -> Option<ParamLocation> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

/// A parameter the selected operation declares
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TryItParameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: Option<String>,
    /// Suggested value derived from the parameter's example or schema
    pub example: Option<String>,
}

impl TryItParameter {
    pub fn new(name: impl Into<String>, location: ParamLocation, required: bool) -> Self {
        TryItParameter {
            name: name.into(),
            location,
            required,
            description: None,
            example: None,
        }
    }
}

/// Where an API key credential is placed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyPlacement {
    Header,
    Query,
}

/// Credentials chosen by the user for one request. Variants are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuthSelection {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    ApiKey {
        name: String,
        value: String,
        placement: Option<ApiKeyPlacement>,
    },
}

/// Kind of credential a security scheme asks for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuthOptionKind {
    Bearer,
    Basic,
    ApiKey {
        name: String,
        placement: ApiKeyPlacement,
    },
}

/// An auth mode the selected operation supports, offered to the user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthOption {
    /// Security scheme name under `components.securitySchemes`
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: AuthOptionKind,
}

impl AuthOption {
    /// Empty selection of the matching kind, ready for the user to fill in
    pub fn blank_selection(&self) -> AuthSelection {
        match &self.kind {
            AuthOptionKind::Bearer => AuthSelection::Bearer {
                token: String::new(),
            },
            AuthOptionKind::Basic => AuthSelection::Basic {
                username: String::new(),
                password: String::new(),
            },
            AuthOptionKind::ApiKey { name, placement } => AuthSelection::ApiKey {
                name: name.clone(),
                value: String::new(),
                placement: Some(*placement),
            },
        }
    }
}

/// One field of a multipart form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
    pub name: String,
    pub value: String,
}

impl FormEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormEntry {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Body description used for shell export and proxy replay
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CurlBody {
    Raw { value: String },
    Multipart { entries: Vec<FormEntry> },
}

/// Body as handed to the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPayload {
    Text(String),
    Multipart(Vec<FormEntry>),
}

/// A fully resolved request, only ever produced when validation found no issues
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderRecord,
    pub body: Option<RequestPayload>,
    pub curl_body: Option<CurlBody>,
}

/// Normalized HTTP outcome, identical whether obtained directly or via the proxy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub duration_ms: u64,
    pub headers: HeaderRecord,
    pub body_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_rank_follows_declaration() {
        assert!(HttpMethod::GET.rank() < HttpMethod::PUT.rank());
        assert!(HttpMethod::POST.rank() < HttpMethod::DELETE.rank());
        assert_eq!(HttpMethod::TRACE.rank(), 7);
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse(" patch "), Some(HttpMethod::PATCH));
        assert_eq!(HttpMethod::parse("connect"), None);
    }

    #[test]
    fn test_curl_body_wire_shape() {
        let body = CurlBody::Multipart {
            entries: vec![FormEntry::new("name", "Ann")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "multipart", "entries": [{"name": "name", "value": "Ann"}]})
        );

        let raw: CurlBody = serde_json::from_str(r#"{"kind":"raw","value":"a=1"}"#).unwrap();
        assert_eq!(raw, CurlBody::Raw { value: "a=1".into() });
    }

    #[test]
    fn test_execution_result_omits_missing_content_type() {
        let result = ExecutionResult {
            method: "GET".into(),
            url: "https://api.example.com/".into(),
            status: 204,
            status_text: "No Content".into(),
            duration_ms: 3,
            headers: HeaderRecord::new(),
            body_text: String::new(),
            content_type: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("contentType").is_none());
        assert_eq!(json["statusText"], "No Content");
        assert!(result.is_success());
    }
}
