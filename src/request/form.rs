//! Interpretation of free-form body text as form fields

use serde_json::Value;

use crate::openapi::examples::form_value_string;

/// Reads body text as form fields. Accepted shapes, tried in order:
/// a JSON object, a single-line query string, or `key=value` / `key: value`
/// lines. Returns `None` when the text fits none of them.
pub fn parse_form_like_input(text: &str) -> Option<Vec<(String, String)>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        // Valid JSON that is not an object is not a form
        let record = parsed.as_object()?;
        let mut fields = Vec::new();
        for (key, value) in record {
            upsert(&mut fields, key.clone(), form_value_string(value));
        }
        return Some(fields);
    }

    if !trimmed.contains('\n') && trimmed.contains('=') {
        let mut fields = Vec::new();
        for (key, value) in url::form_urlencoded::parse(trimmed.as_bytes()) {
            upsert(&mut fields, key.into_owned(), value.into_owned());
        }
        if !fields.is_empty() {
            return Some(fields);
        }
    }

    let mut fields = Vec::new();
    for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let separator = if line.contains('=') { '=' } else { ':' };
        let Some((key, value)) = line.split_once(separator) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        upsert(&mut fields, key.to_string(), value.trim().to_string());
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Later values win but keep the position of the first occurrence
fn upsert(fields: &mut Vec<(String, String)>, key: String, value: String) {
    match fields.iter_mut().find(|(existing, _)| *existing == key) {
        Some(entry) => entry.1 = value,
        None => fields.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(fields: &[(&str, &str)]) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_json_object() {
        let fields = parse_form_like_input(r#"{"name": "Ann", "age": 30, "tags": ["a", "b"]}"#);
        assert_eq!(
            fields,
            Some(pairs(&[("name", "Ann"), ("age", "30"), ("tags", "a,b")]))
        );
    }

    #[test]
    fn test_json_non_object_rejected() {
        assert_eq!(parse_form_like_input("[1, 2]"), None);
        assert_eq!(parse_form_like_input("42"), None);
    }

    #[test]
    fn test_query_string() {
        let fields = parse_form_like_input("name=Ann+Lee&role=admin&name=Bo");
        assert_eq!(fields, Some(pairs(&[("name", "Bo"), ("role", "admin")])));
    }

    #[test]
    fn test_key_value_lines() {
        let fields = parse_form_like_input("name=Ann\nrole=admin");
        assert_eq!(fields, Some(pairs(&[("name", "Ann"), ("role", "admin")])));

        let fields = parse_form_like_input("name: Ann\n\n  role : admin  ");
        assert_eq!(fields, Some(pairs(&[("name", "Ann"), ("role", "admin")])));
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse_form_like_input("just some words"), None);
        assert_eq!(parse_form_like_input(":nokey"), None);
    }

    #[test]
    fn test_blank_is_empty_form() {
        assert_eq!(parse_form_like_input("  \n "), Some(Vec::new()));
    }
}
