//! Request construction from an endpoint's parameter definitions and draft input
//!
//! Validation is additive: every problem is recorded and building continues,
//! so the caller sees the complete list. Nothing is returned unless the list
//! ends up empty.

use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;
use url::Url;

use crate::error::TryItError;
use crate::models::{
    ApiKeyPlacement, AuthSelection, BuiltRequest, CurlBody, FormEntry, HeaderRecord, ParamLocation,
    ParamValues, RequestPayload, TryItParameter,
};
use crate::request::form::parse_form_like_input;
use crate::request::normalize_content_type;

/// Everything the builder needs for one request
#[derive(Clone, Debug, Default)]
pub struct BuildRequestInput {
    pub method: String,
    pub path_template: String,
    pub base_url: String,
    pub parameters: Vec<TryItParameter>,
    pub path_params: ParamValues,
    pub query_params: ParamValues,
    pub header_params: ParamValues,
    pub cookie_params: ParamValues,
    pub body_text: String,
    pub content_type: Option<String>,
    pub accept_header: Option<String>,
    pub auth: AuthSelection,
    /// Origin used to resolve a relative base URL
    pub current_origin: Option<String>,
}

fn path_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("path token pattern is valid"))
}

/// Query pairs with `URLSearchParams.set` semantics
#[derive(Default)]
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn set(&mut self, key: &str, value: &str) {
        match self.0.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.0[index].1 = value.to_string();
                let mut seen = false;
                self.0.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }
}

/// Build a request, or fail with every validation issue found
pub fn build_try_it_request(input: &BuildRequestInput) -> Result<BuiltRequest, TryItError> {
    let mut issues: Vec<String> = Vec::new();
    let method = normalize_method(&input.method);
    let base_url = input.base_url.trim();

    if base_url.is_empty() {
        issues.push(String::from("Base URL is required before sending a request."));
    }

    validate_required_parameters(input, &mut issues);
    let resolved_path = resolve_path(&input.path_template, &input.path_params, &mut issues);

    let base = parse_base_url(base_url, input.current_origin.as_deref());
    if base.is_none() {
        issues.push(format!("\"{}\" is not a valid base URL.", base_url));
    }

    let mut headers = HeaderRecord::new();
    let mut query = QueryPairs::default();

    for (key, value) in &input.query_params {
        if !value.trim().is_empty() {
            query.set(key, value.trim());
        }
    }
    add_header_parameters(&mut headers, &input.header_params);
    add_cookie_header(&mut headers, &input.cookie_params);
    apply_auth(&input.auth, &mut headers, &mut query, &mut issues);

    let normalized_content_type = normalize_content_type(input.content_type.as_deref());
    let mut body = None;
    let mut curl_body = None;
    if !input.body_text.trim().is_empty() {
        let (payload, curl) =
            encode_request_body(&input.body_text, &normalized_content_type, &mut issues);
        body = Some(payload);
        curl_body = Some(curl);

        if !normalized_content_type.is_empty() && normalized_content_type != "multipart/form-data" {
            let header = input
                .content_type
                .clone()
                .unwrap_or_else(|| normalized_content_type.clone());
            set_header(&mut headers, "Content-Type", &header);
        }
    }

    if let Some(accept) = input.accept_header.as_deref().map(str::trim) {
        if !accept.is_empty() {
            set_header(&mut headers, "Accept", accept);
        }
    }

    let base = match base {
        Some(base) if issues.is_empty() => base,
        _ => {
            tracing::debug!(issues = issues.len(), "Request validation failed");
            return Err(TryItError::validation(issues));
        }
    };

    let url = build_final_url(base, &resolved_path, &query);
    tracing::debug!(method = %method, url = %url, "Built request");

    Ok(BuiltRequest {
        method,
        url,
        headers,
        body,
        curl_body,
    })
}

fn normalize_method(method: &str) -> String {
    let trimmed = method.trim().to_uppercase();
    if trimmed.is_empty() {
        String::from("GET")
    } else {
        trimmed
    }
}

fn validate_required_parameters(input: &BuildRequestInput, issues: &mut Vec<String>) {
    for parameter in input.parameters.iter().filter(|p| p.required) {
        let (values, label) = match parameter.location {
            ParamLocation::Query => (&input.query_params, "Query"),
            ParamLocation::Header => (&input.header_params, "Header"),
            // path tokens are checked during substitution; cookies are never required
            ParamLocation::Path | ParamLocation::Cookie => continue,
        };
        if is_blank(values.get(&parameter.name)) {
            issues.push(format!("{} parameter \"{}\" is required.", label, parameter.name));
        }
    }
}

/// Substitutes every `{name}` token, each name once for all its occurrences
fn resolve_path(template: &str, path_params: &ParamValues, issues: &mut Vec<String>) -> String {
    let mut resolved = template.to_string();
    let mut seen: Vec<&str> = Vec::new();

    for capture in path_token().captures_iter(template) {
        let Some(name) = capture.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        if name.is_empty() || seen.contains(&name) {
            continue;
        }
        seen.push(name);

        match path_params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(value) => {
                resolved = resolved.replace(
                    &format!("{{{}}}", name),
                    &urlencoding::encode(value),
                );
            }
            None => issues.push(format!("Path parameter \"{}\" is required.", name)),
        }
    }

    if path_token().is_match(&resolved) {
        issues.push(String::from(
            "Path parameter substitution is incomplete. Fill all template values before sending.",
        ));
    }

    resolved
}

/// Absolute URLs parse as-is; relative ones need an origin to resolve against
fn parse_base_url(base_url: &str, current_origin: Option<&str>) -> Option<Url> {
    if base_url.is_empty() {
        return None;
    }

    Url::parse(base_url).ok().or_else(|| {
        let origin = Url::parse(current_origin?).ok()?;
        origin.join(base_url).ok()
    })
}

fn build_final_url(mut url: Url, resolved_path: &str, query: &QueryPairs) -> String {
    let base_path = match url.path() {
        "/" => String::new(),
        path => path.trim_end_matches('/').to_string(),
    };
    let operation_path = if resolved_path.starts_with('/') {
        resolved_path.to_string()
    } else {
        format!("/{}", resolved_path)
    };

    let full_path = format!("{}{}", base_path, operation_path);
    url.set_path(if full_path.is_empty() { "/" } else { &full_path });

    if query.0.is_empty() {
        url.set_query(None);
    } else {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.0.iter())
            .finish();
        url.set_query(Some(&encoded));
    }

    url.to_string()
}

fn add_header_parameters(headers: &mut HeaderRecord, header_params: &ParamValues) {
    for (key, value) in header_params {
        if value.trim().is_empty() {
            continue;
        }

        // Content-Type and Cookie are managed from the body and cookie helpers
        let normalized = key.trim().to_lowercase();
        if normalized == "content-type" || normalized == "cookie" {
            continue;
        }

        set_header(headers, key, value.trim());
    }
}

fn add_cookie_header(headers: &mut HeaderRecord, cookie_params: &ParamValues) {
    let pairs: Vec<String> = cookie_params
        .iter()
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect();

    if !pairs.is_empty() {
        set_header(headers, "Cookie", &pairs.join("; "));
    }
}

fn apply_auth(
    auth: &AuthSelection,
    headers: &mut HeaderRecord,
    query: &mut QueryPairs,
    issues: &mut Vec<String>,
) {
    match auth {
        AuthSelection::None => {}
        AuthSelection::Bearer { token } => {
            let token = token.trim();
            if token.is_empty() {
                issues.push(String::from(
                    "Bearer token is required for the selected auth mode.",
                ));
                return;
            }
            set_header(headers, "Authorization", &format!("Bearer {}", token));
        }
        AuthSelection::Basic { username, password } => {
            if username.trim().is_empty() && password.trim().is_empty() {
                issues.push(String::from("Username or password is required for Basic auth."));
                return;
            }
            let credentials = format!("{}:{}", username, password);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            set_header(headers, "Authorization", &format!("Basic {}", encoded));
        }
        AuthSelection::ApiKey {
            name,
            value,
            placement,
        } => {
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                issues.push(String::from(
                    "API key name is missing for the selected auth mode.",
                ));
                return;
            }
            if value.is_empty() {
                issues.push(String::from(
                    "API key value is required for the selected auth mode.",
                ));
                return;
            }
            match placement {
                Some(ApiKeyPlacement::Header) => set_header(headers, name, value),
                Some(ApiKeyPlacement::Query) => query.set(name, value),
                None => issues.push(String::from(
                    "API key auth must target either header or query.",
                )),
            }
        }
    }
}

fn encode_request_body(
    body_text: &str,
    normalized_content_type: &str,
    issues: &mut Vec<String>,
) -> (RequestPayload, CurlBody) {
    let raw = |text: &str| {
        (
            RequestPayload::Text(text.to_string()),
            CurlBody::Raw {
                value: text.to_string(),
            },
        )
    };

    if normalized_content_type == "application/json" || normalized_content_type.ends_with("+json") {
        return match serde_json::from_str::<serde_json::Value>(body_text) {
            Ok(parsed) => raw(&parsed.to_string()),
            Err(err) => {
                issues.push(format!("Request body must be valid JSON: {}", err));
                raw(body_text)
            }
        };
    }

    if normalized_content_type == "application/x-www-form-urlencoded" {
        let Some(fields) = parse_form_like_input(body_text) else {
            issues.push(String::from(
                "Form URL-encoded request body must be a JSON object, query string, or key/value lines.",
            ));
            return raw(body_text);
        };
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .finish();
        return raw(&encoded);
    }

    if normalized_content_type == "multipart/form-data" {
        let Some(fields) = parse_form_like_input(body_text) else {
            issues.push(String::from(
                "Multipart request body must be a JSON object or key/value lines.",
            ));
            return raw(body_text);
        };
        let entries: Vec<FormEntry> = fields
            .into_iter()
            .map(|(name, value)| FormEntry { name, value })
            .collect();
        return (
            RequestPayload::Multipart(entries.clone()),
            CurlBody::Multipart { entries },
        );
    }

    raw(body_text)
}

/// Header names are case-insensitive; the record keeps them lower-cased
fn set_header(headers: &mut HeaderRecord, name: &str, value: &str) {
    headers.insert(name.trim().to_lowercase(), value.to_string());
}

fn is_blank(value: Option<&String>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
