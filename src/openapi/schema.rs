//! `$ref` resolution and schema inspection helpers
//!
//! Only local JSON pointers (`#/a/b`) resolve. Cycle detection works on
//! pointer strings: each descent receives its own copy of the visited set so
//! sibling branches never see each other's refs.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::openapi::parse::OpenApiDocument;

/// Ref pointers already followed on the current descent
pub type SeenRefs = BTreeSet<String>;

/// A schema object as stored in the document tree
pub type SchemaObject = Map<String, Value>;

/// Outcome of resolving a possibly-ref schema node
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedSchema<'a> {
    pub schema: Option<&'a SchemaObject>,
    /// Last ref followed to reach `schema`, if any
    pub ref_path: Option<String>,
    pub missing_ref: bool,
    pub circular_ref: bool,
}

/// Returns the pointer when `value` is a `{ "$ref": "..." }` node
pub fn as_ref_pointer(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}

/// Follows a local JSON pointer through nested objects
pub fn resolve_ref<'a>(pointer: &str, document: &'a OpenApiDocument) -> Option<&'a Value> {
    let path = pointer.strip_prefix("#/")?;

    let mut cursor = document.root();
    for segment in path.split('/') {
        let key = segment.replace("~1", "/").replace("~0", "~");
        cursor = cursor.as_object()?.get(&key)?;
    }
    Some(cursor)
}

/// Follows at most one `$ref`; non-ref values come back unchanged
pub fn dereference<'a>(value: &'a Value, document: &'a OpenApiDocument) -> Option<&'a Value> {
    match as_ref_pointer(value) {
        Some(pointer) => resolve_ref(pointer, document),
        None => Some(value),
    }
}

/// Resolves `value` to a concrete schema object, following chained refs
pub fn resolve_schema<'a>(
    value: &'a Value,
    document: &'a OpenApiDocument,
    seen: &SeenRefs,
) -> ResolvedSchema<'a> {
    if let Some(pointer) = as_ref_pointer(value) {
        if seen.contains(pointer) {
            return ResolvedSchema {
                ref_path: Some(pointer.to_string()),
                circular_ref: true,
                ..Default::default()
            };
        }

        // A target that is present but falsy counts as missing here
        let Some(target) = resolve_ref(pointer, document).filter(|t| !is_falsy(t)) else {
            return ResolvedSchema {
                ref_path: Some(pointer.to_string()),
                missing_ref: true,
                ..Default::default()
            };
        };

        let mut next_seen = seen.clone();
        next_seen.insert(pointer.to_string());
        let resolved = resolve_schema(target, document, &next_seen);
        return ResolvedSchema {
            ref_path: resolved.ref_path.or_else(|| Some(pointer.to_string())),
            ..resolved
        };
    }

    ResolvedSchema {
        schema: value.as_object(),
        ..Default::default()
    }
}

/// Where a child node hangs off its parent schema
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildSource {
    Property,
    Items,
    AllOf,
    AnyOf,
    OneOf,
    AdditionalProperties,
}

/// One child of a schema, for tree display
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaChild<'a> {
    pub key: String,
    pub label: String,
    pub schema: &'a Value,
    pub required: bool,
    pub source: ChildSource,
}

/// Children in display order: properties, items, composition members, then
/// a schema-valued `additionalProperties`
pub fn schema_children(schema: &SchemaObject) -> Vec<SchemaChild<'_>> {
    let mut children = Vec::new();
    let required = required_names(schema);

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in properties {
            children.push(SchemaChild {
                key: format!("property:{}", name),
                label: name.clone(),
                schema: value,
                required: required.contains(name.as_str()),
                source: ChildSource::Property,
            });
        }
    }

    if let Some(items) = schema.get("items") {
        children.push(SchemaChild {
            key: String::from("items"),
            label: String::from("items"),
            schema: items,
            required: false,
            source: ChildSource::Items,
        });
    }

    for (field, source) in [
        ("allOf", ChildSource::AllOf),
        ("anyOf", ChildSource::AnyOf),
        ("oneOf", ChildSource::OneOf),
    ] {
        if let Some(members) = schema.get(field).and_then(Value::as_array) {
            for (index, member) in members.iter().enumerate() {
                children.push(SchemaChild {
                    key: format!("{}:{}", field, index),
                    label: format!("{}[{}]", field, index),
                    schema: member,
                    required: false,
                    source,
                });
            }
        }
    }

    if let Some(additional) = additional_properties_schema(schema) {
        children.push(SchemaChild {
            key: String::from("additionalProperties"),
            label: String::from("additionalProperties"),
            schema: additional,
            required: false,
            source: ChildSource::AdditionalProperties,
        });
    }

    children
}

/// Declared or inferred type name
pub fn schema_type_label(schema: &SchemaObject) -> String {
    match schema.get("type") {
        Some(Value::String(name)) => return name.clone(),
        Some(Value::Array(names)) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            if !names.is_empty() {
                return names.join(" | ");
            }
        }
        _ => {}
    }

    if schema.get("properties").map(Value::is_object).unwrap_or(false) {
        return String::from("object");
    }
    if schema.contains_key("items") {
        return String::from("array");
    }
    for field in ["oneOf", "anyOf", "allOf"] {
        if schema
            .get(field)
            .and_then(Value::as_array)
            .map(|members| !members.is_empty())
            .unwrap_or(false)
        {
            return String::from(field);
        }
    }

    String::from("unknown")
}

/// Names listed under `required`, ignoring non-string entries
pub fn required_names(schema: &SchemaObject) -> BTreeSet<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// `additionalProperties` when it holds a schema rather than `true`/`false`
pub fn additional_properties_schema(schema: &SchemaObject) -> Option<&Value> {
    match schema.get("additionalProperties") {
        None | Some(Value::Bool(_)) | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

/// Falsy in the JavaScript sense: null, false, 0 or ""
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
