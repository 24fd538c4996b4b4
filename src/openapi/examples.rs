//! Representative example values synthesized from schemas

use serde_json::{Map, Value};

use crate::constants::MAX_SAMPLE_DEPTH;
use crate::openapi::parse::OpenApiDocument;
use crate::openapi::schema::{
    additional_properties_schema, required_names, resolve_schema, schema_type_label, SchemaObject,
    SeenRefs,
};
use crate::request::normalize_content_type;

/// Explicit `example`, or the first entry of `examples`
pub fn pick_open_api_example(value: &Value) -> Option<&Value> {
    value.as_object().and_then(pick_declared_example)
}

fn pick_declared_example(object: &Map<String, Value>) -> Option<&Value> {
    if let Some(example) = object.get("example") {
        return Some(example);
    }
    object.get("examples").and_then(pick_from_examples_field)
}

/// Example declared on a media type object, falling back to its schema's
pub fn pick_media_type_example(media_type: &Value) -> Option<&Value> {
    media_type.as_object()?;
    pick_open_api_example(media_type)
        .or_else(|| media_type.get("schema").and_then(pick_open_api_example))
}

/// Example for `schema`, starting a fresh descent
pub fn generate_schema_example(schema: &Value, document: &OpenApiDocument) -> Value {
    build_schema_example(schema, document, 0, &SeenRefs::new())
}

/// Derives an example value, returning `null` past the depth cap or for
/// anything that does not resolve to a schema
pub fn build_schema_example(
    node: &Value,
    document: &OpenApiDocument,
    depth: usize,
    seen: &SeenRefs,
) -> Value {
    if depth > MAX_SAMPLE_DEPTH {
        return Value::Null;
    }

    let resolved = resolve_schema(node, document, seen);
    let Some(schema) = resolved.schema else {
        return Value::Null;
    };

    let mut seen = seen.clone();
    if let Some(ref_path) = resolved.ref_path {
        seen.insert(ref_path);
    }

    if let Some(explicit) = pick_declared_example(schema) {
        return explicit.clone();
    }

    if let Some(first) = schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }

    if let Some(default) = schema.get("default") {
        return default.clone();
    }

    let first_member = |field: &str| {
        schema
            .get(field)
            .and_then(Value::as_array)
            .and_then(|members| members.first())
            .map(|member| build_schema_example(member, document, depth + 1, &seen))
            .unwrap_or(Value::Null)
    };

    match schema_type_label(schema).as_str() {
        "object" => sample_object(schema, document, depth, &seen),
        "array" => {
            let item = schema
                .get("items")
                .map(|items| build_schema_example(items, document, depth + 1, &seen))
                .unwrap_or(Value::Null);
            Value::Array(vec![item])
        }
        "integer" | "number" => Value::from(0),
        "boolean" => Value::Bool(true),
        "string" => Value::String(sample_string(schema.get("format")).to_string()),
        "oneOf" => first_member("oneOf"),
        "anyOf" => first_member("anyOf"),
        "allOf" => first_member("allOf"),
        _ => Value::Null,
    }
}

fn sample_object(
    schema: &SchemaObject,
    document: &OpenApiDocument,
    depth: usize,
    seen: &SeenRefs,
) -> Value {
    let mut sample = Map::new();

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        let required = required_names(schema);
        for (name, property) in properties {
            if !required.is_empty() && !required.contains(name.as_str()) {
                continue;
            }
            sample.insert(
                name.clone(),
                build_schema_example(property, document, depth + 1, seen),
            );
        }
    }

    if sample.is_empty() {
        if let Some(additional) = additional_properties_schema(schema) {
            sample.insert(
                String::from("additionalProp"),
                build_schema_example(additional, document, depth + 1, seen),
            );
        }
    }

    Value::Object(sample)
}

fn sample_string(format: Option<&Value>) -> &'static str {
    match format.and_then(Value::as_str) {
        Some("date") => "2024-01-01",
        Some("date-time") => "2024-01-01T00:00:00Z",
        Some("uuid") => "00000000-0000-4000-8000-000000000000",
        Some("email") => "user@example.com",
        Some("uri") | Some("url") => "https://example.com",
        Some("byte") | Some("binary") => "<binary>",
        _ => "string",
    }
}

fn pick_from_examples_field(examples: &Value) -> Option<&Value> {
    match examples {
        Value::Array(entries) => entries.first(),
        Value::Object(named) => named.values().next().map(|entry| match entry.get("value") {
            Some(value) if entry.is_object() => value,
            _ => entry,
        }),
        _ => None,
    }
}

/// Renders an example as editable body text for the given content type
pub fn stringify_example(value: Option<&Value>, content_type: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    match normalize_content_type(content_type).as_str() {
        "application/json" => {
            if let Value::String(text) = value {
                return serde_json::from_str::<Value>(text)
                    .ok()
                    .and_then(|parsed| serde_json::to_string_pretty(&parsed).ok())
                    .unwrap_or_else(|| text.clone());
            }
            return pretty(value);
        }
        "application/x-www-form-urlencoded" => {
            if let Some(record) = as_form_record(value) {
                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (key, entry) in &record {
                    serializer.append_pair(key, &form_value_string(entry));
                }
                return serializer.finish();
            }
        }
        "multipart/form-data" => {
            if let Some(record) = as_form_record(value) {
                return record
                    .iter()
                    .map(|(key, entry)| format!("{}: {}", key, form_value_string(entry)))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
        _ => {}
    }

    match value {
        Value::String(text) => text.clone(),
        other => pretty(other),
    }
}

/// Text form of a scalar as it appears in a form field
pub fn form_value_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(form_value_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => String::from("[object Object]"),
    }
}

fn as_form_record(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(record) => Some(record.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(record)) => Some(record),
            _ => None,
        },
        _ => None,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::parse::{parse_open_api_document, ParseOptions};
    use serde_json::json;

    fn document(schemas: Value) -> OpenApiDocument {
        let raw = json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {},
            "components": {"schemas": schemas},
        });
        parse_open_api_document(&raw.to_string(), &ParseOptions::default())
            .unwrap()
            .document
    }

    fn nested_all_of(levels: usize) -> Value {
        let mut node = json!({"type": "string"});
        for _ in 0..levels {
            node = json!({"allOf": [node]});
        }
        node
    }

    #[test]
    fn test_depth_cap_returns_null() {
        let doc = document(json!({}));
        assert_eq!(generate_schema_example(&nested_all_of(7), &doc), Value::Null);
        assert_eq!(generate_schema_example(&nested_all_of(6), &doc), json!("string"));
    }

    #[test]
    fn test_object_prefers_required_subset() {
        let doc = document(json!({
            "Pet": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"}
                }
            }
        }));
        let example = generate_schema_example(&json!({"$ref": "#/components/schemas/Pet"}), &doc);
        assert_eq!(example, json!({"name": "string"}));
    }

    #[test]
    fn test_all_properties_when_none_required() {
        let doc = document(json!({}));
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "format": "uuid"},
                "tags": {"type": "array", "items": {"type": "string", "format": "email"}},
                "active": {"type": "boolean"},
                "score": {"type": "number"}
            }
        });
        let example = generate_schema_example(&schema, &doc);
        assert_eq!(
            example,
            json!({
                "id": "00000000-0000-4000-8000-000000000000",
                "tags": ["user@example.com"],
                "active": true,
                "score": 0
            })
        );
    }

    #[test]
    fn test_explicit_example_then_enum_then_default() {
        let doc = document(json!({}));
        let schema = json!({"type": "string", "example": "fido", "enum": ["a"], "default": "b"});
        assert_eq!(generate_schema_example(&schema, &doc), json!("fido"));

        let schema = json!({"type": "string", "enum": ["available", "sold"], "default": "b"});
        assert_eq!(generate_schema_example(&schema, &doc), json!("available"));

        let schema = json!({"type": "integer", "default": 10});
        assert_eq!(generate_schema_example(&schema, &doc), json!(10));

        let schema = json!({"type": "string", "examples": {"first": {"value": "x"}}});
        assert_eq!(generate_schema_example(&schema, &doc), json!("x"));
    }

    #[test]
    fn test_additional_properties_fallback() {
        let doc = document(json!({}));
        let schema = json!({"type": "object", "additionalProperties": {"type": "integer"}});
        assert_eq!(generate_schema_example(&schema, &doc), json!({"additionalProp": 0}));

        let schema = json!({"type": "object", "additionalProperties": true});
        assert_eq!(generate_schema_example(&schema, &doc), json!({}));
    }

    #[test]
    fn test_recursive_schema_terminates() {
        let doc = document(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "value": {"type": "string"},
                    "next": {"$ref": "#/components/schemas/Node"}
                }
            }
        }));
        let example = generate_schema_example(&json!({"$ref": "#/components/schemas/Node"}), &doc);
        assert_eq!(example, json!({"value": "string", "next": null}));
    }

    #[test]
    fn test_missing_ref_is_null() {
        let doc = document(json!({}));
        let example = generate_schema_example(&json!({"$ref": "#/components/schemas/Gone"}), &doc);
        assert_eq!(example, Value::Null);
    }

    #[test]
    fn test_media_type_example_falls_back_to_schema() {
        let media = json!({"schema": {"example": {"id": 1}}});
        assert_eq!(pick_media_type_example(&media), Some(&json!({"id": 1})));
        let media = json!({"examples": {"one": {"value": [1, 2]}}});
        assert_eq!(pick_media_type_example(&media), Some(&json!([1, 2])));
    }

    #[test]
    fn test_stringify_per_content_type() {
        let value = json!({"name": "Ann Lee", "age": 3});
        assert_eq!(
            stringify_example(Some(&value), Some("application/json")),
            "{\n  \"name\": \"Ann Lee\",\n  \"age\": 3\n}"
        );
        assert_eq!(
            stringify_example(Some(&value), Some("application/x-www-form-urlencoded")),
            "name=Ann+Lee&age=3"
        );
        assert_eq!(
            stringify_example(Some(&value), Some("multipart/form-data; boundary=x")),
            "name: Ann Lee\nage: 3"
        );
        assert_eq!(stringify_example(Some(&json!("plain")), Some("text/plain")), "plain");
        assert_eq!(stringify_example(None, Some("application/json")), "");
    }
}
