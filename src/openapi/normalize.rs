//! Flattens the path/operation tree into a tag-grouped endpoint catalog

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::UNTAGGED;
use crate::models::HttpMethod;
use crate::openapi::parse::OpenApiDocument;
use crate::openapi::schema::is_falsy;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpecMetadata {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// One (method, path, tag) entry in the catalog
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointNavItem {
    /// Unique within the catalog, shared by every tag entry of one operation
    pub id: String,
    pub operation_id: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Group this entry is listed under
    pub tag: String,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

impl EndpointNavItem {
    /// Returns display title for the endpoint
    pub fn display_title(&self) -> String {
        self.summary
            .clone()
            .or_else(|| self.operation_id.clone())
            .unwrap_or_else(|| format!("{} {}", self.method, self.path))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndpointTagGroup {
    pub tag: String,
    pub endpoints: Vec<EndpointNavItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedOpenApi {
    pub metadata: SpecMetadata,
    /// One entry per operation, sorted
    pub endpoints: Vec<EndpointNavItem>,
    pub endpoint_by_id: BTreeMap<String, EndpointNavItem>,
    pub endpoint_groups: Vec<EndpointTagGroup>,
}

impl NormalizedOpenApi {
    pub fn operation_count(&self) -> usize {
        self.endpoint_by_id.len()
    }
}

pub fn normalize_open_api_document(document: &OpenApiDocument) -> NormalizedOpenApi {
    let metadata = SpecMetadata {
        title: document.title().to_string(),
        version: document.version().to_string(),
        description: document.description().map(String::from),
    };

    let mut endpoint_by_id: BTreeMap<String, EndpointNavItem> = BTreeMap::new();
    let mut grouped: Vec<(String, Vec<EndpointNavItem>)> = Vec::new();
    let mut used_ids = HashSet::new();

    for (path, path_item) in document.paths() {
        for method in HttpMethod::ALL {
            let Some(operation) = path_item.get(method.as_lower()).and_then(Value::as_object)
            else {
                continue;
            };

            let operation_id = operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from);
            let candidate = operation_id
                .clone()
                .unwrap_or_else(|| format!("{} {}", method, path));
            let id = unique_id(&candidate, &mut used_ids);
            let tags = normalize_tags(operation);

            for tag in &tags {
                let endpoint = EndpointNavItem {
                    id: id.clone(),
                    operation_id: operation_id.clone(),
                    method,
                    path: path.clone(),
                    summary: non_blank(operation.get("summary")),
                    description: non_blank(operation.get("description")),
                    tag: tag.clone(),
                    tags: tags.clone(),
                    deprecated: operation.get("deprecated").is_some_and(|v| !is_falsy(v)),
                };

                endpoint_by_id
                    .entry(id.clone())
                    .or_insert_with(|| endpoint.clone());

                match grouped.iter_mut().find(|(name, _)| name == tag) {
                    Some((_, endpoints)) => endpoints.push(endpoint),
                    None => grouped.push((tag.clone(), vec![endpoint])),
                }
            }
        }
    }

    grouped.sort_by(|a, b| compare_tags(&a.0, &b.0));
    let endpoint_groups = grouped
        .into_iter()
        .map(|(tag, mut endpoints)| {
            endpoints.sort_by(compare_endpoints);
            EndpointTagGroup { tag, endpoints }
        })
        .collect();

    let mut endpoints: Vec<EndpointNavItem> = endpoint_by_id.values().cloned().collect();
    endpoints.sort_by(compare_endpoints);

    tracing::debug!(
        operations = endpoint_by_id.len(),
        "Normalized endpoint catalog"
    );

    NormalizedOpenApi {
        metadata,
        endpoints,
        endpoint_by_id,
        endpoint_groups,
    }
}

fn normalize_tags(operation: &Map<String, Value>) -> Vec<String> {
    let tags: Vec<String> = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    if tags.is_empty() {
        vec![String::from(UNTAGGED)]
    } else {
        tags
    }
}

/// Appends " (2)", " (3)", ... until the id is unused
fn unique_id(candidate: &str, used: &mut HashSet<String>) -> String {
    let base = candidate.trim();
    if used.insert(base.to_string()) {
        return base.to_string();
    }

    let mut suffix = 2;
    loop {
        let next = format!("{} ({})", base, suffix);
        if used.insert(next.clone()) {
            return next;
        }
        suffix += 1;
    }
}

fn compare_tags(a: &str, b: &str) -> Ordering {
    match (a == UNTAGGED, b == UNTAGGED) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_text(a, b),
    }
}

fn compare_endpoints(a: &EndpointNavItem, b: &EndpointNavItem) -> Ordering {
    compare_text(&a.path, &b.path)
        .then_with(|| a.method.rank().cmp(&b.method.rank()))
        .then_with(|| compare_text(&a.id, &b.id))
}

/// Case-insensitive first, byte order as the tie-break
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}
