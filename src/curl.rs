use crate::models::{BuiltRequest, CurlBody};

/// Format a built request as a single-line cURL command
pub fn build_curl_command(request: &BuiltRequest) -> String {
    let mut parts = vec![
        "curl".to_string(),
        "-X".to_string(),
        shell_quote(&request.method.to_uppercase()),
        shell_quote(&request.url),
    ];

    // Sorted by name so the same request always renders the same command
    let mut headers: Vec<(&String, &String)> = request.headers.iter().collect();
    headers.sort_by(|a, b| {
        a.0.to_lowercase()
            .cmp(&b.0.to_lowercase())
            .then_with(|| a.0.cmp(b.0))
    });
    for (name, value) in headers {
        parts.push("-H".to_string());
        parts.push(shell_quote(&format!("{}: {}", name, value)));
    }

    match &request.curl_body {
        Some(CurlBody::Raw { value }) => {
            parts.push("--data-raw".to_string());
            parts.push(shell_quote(value));
        }
        Some(CurlBody::Multipart { entries }) => {
            for entry in entries {
                parts.push("-F".to_string());
                parts.push(shell_quote(&format!("{}={}", entry.name, entry.value)));
            }
        }
        None => {}
    }

    parts.join(" ")
}

/// Single-quote for POSIX shells; embedded quotes become `'"'"'`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormEntry, HeaderRecord, RequestPayload};

    fn request(headers: &[(&str, &str)], curl_body: Option<CurlBody>) -> BuiltRequest {
        BuiltRequest {
            method: "post".to_string(),
            url: "https://api.example.com/pets?q=1".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HeaderRecord>(),
            body: None,
            curl_body,
        }
    }

    #[test]
    fn test_headers_sorted_alphabetically() {
        let curl = build_curl_command(&request(&[("Z", "1"), ("A", "2")], None));
        assert_eq!(
            curl,
            "curl -X 'POST' 'https://api.example.com/pets?q=1' -H 'A: 2' -H 'Z: 1'"
        );
    }

    #[test]
    fn test_raw_body_quotes_escaped() {
        let mut req = request(
            &[("content-type", "application/json")],
            Some(CurlBody::Raw {
                value: r#"{"name":"O'Brien"}"#.to_string(),
            }),
        );
        req.body = Some(RequestPayload::Text(r#"{"name":"O'Brien"}"#.to_string()));
        let curl = build_curl_command(&req);
        assert!(curl.ends_with(r#"--data-raw '{"name":"O'"'"'Brien"}'"#), "{}", curl);
    }

    #[test]
    fn test_multipart_fields() {
        let req = request(
            &[],
            Some(CurlBody::Multipart {
                entries: vec![FormEntry::new("name", "Ann"), FormEntry::new("role", "admin")],
            }),
        );
        assert_eq!(
            build_curl_command(&req),
            "curl -X 'POST' 'https://api.example.com/pets?q=1' -F 'name=Ann' -F 'role=admin'"
        );
    }
}
