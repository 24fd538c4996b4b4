//! Per-operation details that feed the request builder: parameters, request
//! body media types, supported auth schemes and server overrides.

use serde_json::{Map, Value};

use crate::models::{
    ApiKeyPlacement, AuthOption, AuthOptionKind, HttpMethod, ParamLocation, TryItParameter,
};
use crate::openapi::examples::{
    form_value_string, generate_schema_example, pick_media_type_example, pick_open_api_example,
    stringify_example,
};
use crate::openapi::parse::{parse_servers, OpenApiDocument};
use crate::openapi::schema::dereference;

/// Request body declared by an operation
#[derive(Clone, Debug, PartialEq)]
pub struct RequestBodyInfo {
    pub required: bool,
    pub description: Option<String>,
    /// Media types in declaration order
    pub media_types: Vec<String>,
    /// `application/json` when declared, otherwise the first media type
    pub default_content_type: Option<String>,
    /// Example body text for the default content type
    pub example_text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperationDetails {
    pub method: HttpMethod,
    pub path: String,
    pub parameters: Vec<TryItParameter>,
    pub request_body: Option<RequestBodyInfo>,
    pub auth_options: Vec<AuthOption>,
    /// Operation or path-level server, overriding the document's
    pub server_url: Option<String>,
}

/// Collects everything needed to fill in a request for one operation
pub fn operation_details(
    document: &OpenApiDocument,
    path: &str,
    method: HttpMethod,
) -> Option<OperationDetails> {
    let path_item = document.path_item(path)?;
    let operation = path_item.get(method.as_lower())?.as_object()?;

    let server_url = parse_servers(operation.get("servers").unwrap_or(&Value::Null))
        .into_iter()
        .chain(parse_servers(path_item.get("servers").unwrap_or(&Value::Null)))
        .next()
        .map(|server| server.url);

    Some(OperationDetails {
        method,
        path: path.to_string(),
        parameters: merge_parameters(document, path_item, operation),
        request_body: operation
            .get("requestBody")
            .and_then(|body| request_body_info(document, body)),
        auth_options: auth_options(document, operation),
        server_url,
    })
}

/// Operation parameters override path-level ones with the same name and location
fn merge_parameters(
    document: &OpenApiDocument,
    path_item: &Map<String, Value>,
    operation: &Map<String, Value>,
) -> Vec<TryItParameter> {
    let mut merged: Vec<TryItParameter> = Vec::new();

    for source in [operation.get("parameters"), path_item.get("parameters")] {
        let Some(list) = source.and_then(Value::as_array) else {
            continue;
        };
        for raw in list {
            let Some(parameter) =
                dereference(raw, document).and_then(|p| parse_parameter(document, p))
            else {
                continue;
            };
            let duplicate = merged
                .iter()
                .any(|p| p.name == parameter.name && p.location == parameter.location);
            if !duplicate {
                merged.push(parameter);
            }
        }
    }

    merged
}

fn parse_parameter(document: &OpenApiDocument, param: &Value) -> Option<TryItParameter> {
    let name = param.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let location = ParamLocation::parse(param.get("in")?.as_str()?)?;

    // Path parameters are always required, whatever the document says
    let required = location == ParamLocation::Path
        || param.get("required").and_then(Value::as_bool).unwrap_or(false);

    let example = pick_open_api_example(param)
        .cloned()
        .or_else(|| {
            let schema = param.get("schema")?;
            let sample = generate_schema_example(schema, document);
            (!sample.is_null()).then_some(sample)
        })
        .map(|value| form_value_string(&value));

    let mut parameter = TryItParameter::new(name, location, required);
    parameter.description = param
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);
    parameter.example = example;
    Some(parameter)
}

fn request_body_info(document: &OpenApiDocument, body: &Value) -> Option<RequestBodyInfo> {
    let body = dereference(body, document)?;
    let content = body.get("content")?.as_object()?;

    let media_types: Vec<String> = content.keys().cloned().collect();
    let default_content_type = if content.contains_key("application/json") {
        Some(String::from("application/json"))
    } else {
        media_types.first().cloned()
    };

    let example_text = default_content_type
        .as_deref()
        .and_then(|content_type| {
            let media = content.get(content_type)?;
            let example = pick_media_type_example(media).cloned().or_else(|| {
                media
                    .get("schema")
                    .map(|schema| generate_schema_example(schema, document))
            });
            Some(stringify_example(example.as_ref(), Some(content_type)))
        })
        .unwrap_or_default();

    Some(RequestBodyInfo {
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        media_types,
        default_content_type,
        example_text,
    })
}

/// Schemes named by the operation's `security` (or the document's), in order.
/// Schemes the request builder cannot apply are skipped.
fn auth_options(document: &OpenApiDocument, operation: &Map<String, Value>) -> Vec<AuthOption> {
    let requirements = operation
        .get("security")
        .or_else(|| document.root().get("security"))
        .and_then(Value::as_array);
    let schemes = document.root()["components"]["securitySchemes"].as_object();

    let (Some(requirements), Some(schemes)) = (requirements, schemes) else {
        return Vec::new();
    };

    let mut options: Vec<AuthOption> = Vec::new();
    for requirement in requirements.iter().filter_map(Value::as_object) {
        for scheme_name in requirement.keys() {
            if options.iter().any(|o| &o.id == scheme_name) {
                continue;
            }
            let Some(scheme) = schemes
                .get(scheme_name)
                .and_then(|s| dereference(s, document))
            else {
                continue;
            };
            if let Some(option) = auth_option(scheme_name, scheme) {
                options.push(option);
            }
        }
    }
    options
}

fn auth_option(id: &str, scheme: &Value) -> Option<AuthOption> {
    let scheme_type = scheme.get("type")?.as_str()?;
    let description = scheme
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);

    let (label, kind) = match scheme_type {
        "http" => {
            let http_scheme = scheme.get("scheme")?.as_str()?.to_lowercase();
            match http_scheme.as_str() {
                "bearer" => (format!("{} (Bearer)", id), AuthOptionKind::Bearer),
                "basic" => (format!("{} (Basic)", id), AuthOptionKind::Basic),
                _ => return None,
            }
        }
        "apiKey" => {
            let name = scheme.get("name")?.as_str()?.to_string();
            let placement = match scheme.get("in")?.as_str()? {
                "header" => ApiKeyPlacement::Header,
                "query" => ApiKeyPlacement::Query,
                _ => return None,
            };
            (
                format!("{} (API key)", id),
                AuthOptionKind::ApiKey { name, placement },
            )
        }
        _ => return None,
    };

    Some(AuthOption {
        id: id.to_string(),
        label,
        description,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::parse::{parse_open_api_document, ParseOptions};

    const SPEC: &str = r##"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
servers:
  - url: https://api.example.com/v1
security:
  - token: []
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        schema: { type: integer }
      - name: X-Trace
        in: header
        required: true
        schema: { type: string }
    put:
      servers:
        - url: https://write.example.com
      security:
        - basicAuth: []
        - apiKey: []
        - oauth: []
      parameters:
        - $ref: '#/components/parameters/Verbose'
        - name: X-Trace
          in: header
          required: false
      requestBody:
        $ref: '#/components/requestBodies/PetBody'
    get:
      responses:
        200: { description: OK }
components:
  parameters:
    Verbose:
      name: verbose
      in: query
      example: true
  requestBodies:
    PetBody:
      required: true
      content:
        application/xml:
          schema: { type: string }
        application/json:
          schema:
            $ref: '#/components/schemas/Pet'
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: { type: string }
        id: { type: integer }
  securitySchemes:
    token:
      type: http
      scheme: bearer
    basicAuth:
      type: http
      scheme: basic
    apiKey:
      type: apiKey
      in: header
      name: X-API-Key
    oauth:
      type: oauth2
      flows: {}
"##;

    fn details(method: HttpMethod) -> OperationDetails {
        let parsed = parse_open_api_document(SPEC, &ParseOptions::default()).unwrap();
        operation_details(&parsed.document, "/pets/{petId}", method).unwrap()
    }

    #[test]
    fn test_parameters_merged_with_operation_precedence() {
        let put = details(HttpMethod::PUT);
        let names: Vec<&str> = put.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["verbose", "X-Trace", "petId"]);

        let trace = &put.parameters[1];
        assert!(!trace.required);

        let pet_id = &put.parameters[2];
        assert_eq!(pet_id.location, ParamLocation::Path);
        assert!(pet_id.required);
        assert_eq!(pet_id.example.as_deref(), Some("0"));

        assert_eq!(put.parameters[0].example.as_deref(), Some("true"));
    }

    #[test]
    fn test_request_body_prefers_json() {
        let put = details(HttpMethod::PUT);
        let body = put.request_body.unwrap();
        assert!(body.required);
        assert_eq!(body.media_types, vec!["application/xml", "application/json"]);
        assert_eq!(body.default_content_type.as_deref(), Some("application/json"));
        assert_eq!(body.example_text, "{\n  \"name\": \"string\"\n}");
    }

    #[test]
    fn test_auth_options_skip_unsupported_schemes() {
        let put = details(HttpMethod::PUT);
        let ids: Vec<&str> = put.auth_options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["basicAuth", "apiKey"]);
        assert_eq!(
            put.auth_options[1].kind,
            AuthOptionKind::ApiKey {
                name: "X-API-Key".into(),
                placement: ApiKeyPlacement::Header
            }
        );
    }

    #[test]
    fn test_root_security_and_servers_inherited() {
        let get = details(HttpMethod::GET);
        assert_eq!(get.auth_options.len(), 1);
        assert_eq!(get.auth_options[0].kind, AuthOptionKind::Bearer);
        assert!(get.server_url.is_none());
        assert!(get.request_body.is_none());
        assert_eq!(
            details(HttpMethod::PUT).server_url.as_deref(),
            Some("https://write.example.com")
        );
    }

    #[test]
    fn test_unknown_operation_is_none() {
        let parsed = parse_open_api_document(SPEC, &ParseOptions::default()).unwrap();
        assert!(operation_details(&parsed.document, "/pets/{petId}", HttpMethod::DELETE).is_none());
        assert!(operation_details(&parsed.document, "/nope", HttpMethod::GET).is_none());
    }
}
