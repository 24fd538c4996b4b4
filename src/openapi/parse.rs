//! OpenAPI document parsing and structural validation
//!
//! Raw text is tried as JSON and YAML in an order picked by a heuristic (or
//! the caller's preference). A strategy that parses but fails validation ends
//! the attempt; only syntax errors fall through to the next strategy.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::OpenApiParseError;

/// Serialization format a document was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    pub fn as_str(&self) -> &str {
        match self {
            SpecFormat::Json => "json",
            SpecFormat::Yaml => "yaml",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// File name or URL, carried into errors
    pub source_label: Option<String>,
    /// Overrides the content-sniffing heuristic when set
    pub preferred_format: Option<SpecFormat>,
}

impl ParseOptions {
    /// Options for a spec loaded from `label`, preferring YAML for `.yaml`/`.yml`
    pub fn for_source(label: &str) -> Self {
        ParseOptions {
            source_label: Some(label.to_string()),
            preferred_format: should_prefer_yaml(label).then_some(SpecFormat::Yaml),
        }
    }
}

/// A parsed server entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerEntry {
    pub url: String,
    pub description: Option<String>,
}

/// A validated OpenAPI 3.x document.
///
/// The tree is kept as plain JSON values so `$ref` pointers can be walked
/// segment by segment. Key order follows the source text.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenApiDocument {
    root: Value,
}

impl OpenApiDocument {
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn openapi_version(&self) -> &str {
        self.root["openapi"].as_str().unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.root["info"]["title"].as_str().unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.root["info"]["version"].as_str().unwrap_or_default()
    }

    pub fn description(&self) -> Option<&str> {
        self.root["info"]["description"].as_str()
    }

    /// Path items in declaration order
    pub fn paths(&self) -> impl Iterator<Item = (&String, &Map<String, Value>)> {
        self.root["paths"]
            .as_object()
            .into_iter()
            .flat_map(|paths| paths.iter())
            .filter_map(|(path, item)| item.as_object().map(|item| (path, item)))
    }

    pub fn path_item(&self, path: &str) -> Option<&Map<String, Value>> {
        self.root["paths"].get(path).and_then(Value::as_object)
    }

    pub fn servers(&self) -> Vec<ServerEntry> {
        parse_servers(&self.root["servers"])
    }

    /// URL of the first declared server, used to pre-fill the base URL
    pub fn first_server_url(&self) -> Option<String> {
        self.servers().into_iter().next().map(|s| s.url)
    }
}

/// Reads the `servers` array of a document, path item or operation
pub fn parse_servers(value: &Value) -> Vec<ServerEntry> {
    value
        .as_array()
        .map(|servers| {
            servers
                .iter()
                .filter_map(|server| {
                    let url = server.get("url")?.as_str()?.to_string();
                    Some(ServerEntry {
                        url,
                        description: server
                            .get("description")
                            .and_then(|d| d.as_str())
                            .map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug)]
pub struct ParsedSpec {
    pub document: OpenApiDocument,
    pub format: SpecFormat,
}

/// Outcome of one parse strategy
enum Attempt {
    Parsed(OpenApiDocument),
    SyntaxError(OpenApiParseError),
    Invalid(OpenApiParseError),
}

/// Parse raw spec text into a validated document
pub fn parse_open_api_document(
    raw: &str,
    options: &ParseOptions,
) -> Result<ParsedSpec, OpenApiParseError> {
    let label = options.source_label.as_deref();
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(OpenApiParseError::validation(
            "Spec is empty. Provide JSON or YAML OpenAPI content.",
            label,
        ));
    }

    let json_first = match options.preferred_format {
        Some(format) => format == SpecFormat::Json,
        None => trimmed.starts_with('{') || trimmed.starts_with('['),
    };
    let strategies = if json_first {
        [SpecFormat::Json, SpecFormat::Yaml]
    } else {
        [SpecFormat::Yaml, SpecFormat::Json]
    };

    let mut syntax_errors = Vec::new();
    for format in strategies {
        match attempt(raw, format, label) {
            Attempt::Parsed(document) => {
                tracing::debug!(format = format.as_str(), "Spec parsed");
                return Ok(ParsedSpec { document, format });
            }
            Attempt::Invalid(err) => return Err(err),
            Attempt::SyntaxError(err) => {
                tracing::debug!(format = format.as_str(), error = %err, "Parse strategy failed");
                syntax_errors.push(err);
            }
        }
    }

    Err(syntax_errors.into_iter().next().unwrap_or_else(|| {
        OpenApiParseError::parse(
            format!(
                "Unable to parse spec from {} as JSON or YAML.",
                label.unwrap_or("input")
            ),
            label,
            None,
        )
    }))
}

/// Renders an error with its location, if known
pub fn format_open_api_error(err: &OpenApiParseError) -> String {
    err.to_string()
}

/// Labels ending in `.yaml` or `.yml` are tried as YAML first
pub fn should_prefer_yaml(source_label: &str) -> bool {
    let normalized = source_label.to_lowercase();
    normalized.ends_with(".yaml") || normalized.ends_with(".yml")
}

fn attempt(raw: &str, format: SpecFormat, label: Option<&str>) -> Attempt {
    let parsed = match format {
        SpecFormat::Json => parse_json(raw, label),
        SpecFormat::Yaml => parse_yaml(raw, label),
    };
    match parsed {
        Ok(value) => match validate_document(value, label) {
            Ok(document) => Attempt::Parsed(document),
            Err(err) => Attempt::Invalid(err),
        },
        Err(err) => Attempt::SyntaxError(err),
    }
}

fn parse_json(raw: &str, label: Option<&str>) -> Result<Value, OpenApiParseError> {
    serde_json::from_str::<Value>(raw).map_err(|err| {
        // serde_json reports line 0 when it has no position
        let location = (err.line() > 0).then(|| (err.line(), err.column().max(1)));
        let full = err.to_string();
        let message = strip_location(&full);
        OpenApiParseError::parse(format!("Invalid JSON: {}", message), label, location)
    })
}

fn parse_yaml(raw: &str, label: Option<&str>) -> Result<Value, OpenApiParseError> {
    match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(value) => Ok(yaml_to_json(value)),
        Err(err) => {
            let location = err.location().map(|loc| (loc.line(), loc.column()));
            let full = err.to_string();
            let message = strip_location(&full);
            Err(OpenApiParseError::parse(
                format!("Invalid YAML: {}", message),
                label,
                location,
            ))
        }
    }
}

/// Both parsers append " at line L column C"; the location is reported separately
fn strip_location(message: &str) -> &str {
    match message.rfind(" at line ") {
        Some(idx) => &message[..idx],
        None => message,
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Response codes and similar keys are often unquoted numbers in YAML
fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => String::from("null"),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn validate_document(value: Value, label: Option<&str>) -> Result<OpenApiDocument, OpenApiParseError> {
    let invalid = |message: String| OpenApiParseError::validation(message, label);

    let root = value
        .as_object()
        .ok_or_else(|| invalid("OpenAPI root must be an object.".into()))?;

    let version = root
        .get("openapi")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("Missing required `openapi` version string.".into()))?;
    if !version.starts_with("3.") {
        return Err(invalid(format!(
            "Unsupported OpenAPI version \"{}\". Only OpenAPI 3.x is supported.",
            version
        )));
    }

    let info = root
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Missing required `info` object.".into()))?;
    if !is_non_blank(info.get("title")) {
        return Err(invalid("`info.title` must be a non-empty string.".into()));
    }
    if !is_non_blank(info.get("version")) {
        return Err(invalid("`info.version` must be a non-empty string.".into()));
    }

    let paths = root
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Missing required `paths` object.".into()))?;
    for (path, item) in paths {
        if !path.starts_with('/') {
            return Err(invalid(format!("Path key \"{}\" must start with \"/\".", path)));
        }
        if !item.is_object() {
            return Err(invalid(format!("Path item for \"{}\" must be an object.", path)));
        }
    }

    Ok(OpenApiDocument { root: value })
}

fn is_non_blank(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}
