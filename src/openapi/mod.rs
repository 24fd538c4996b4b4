//! OpenAPI document handling: parsing, `$ref` resolution, example synthesis
//! and the endpoint catalog

pub mod examples;
pub mod normalize;
pub mod operation;
pub mod parse;
pub mod schema;

pub use examples::{generate_schema_example, stringify_example};
pub use normalize::{
    normalize_open_api_document, EndpointNavItem, EndpointTagGroup, NormalizedOpenApi,
    SpecMetadata,
};
pub use operation::{operation_details, OperationDetails, RequestBodyInfo};
pub use parse::{
    format_open_api_error, parse_open_api_document, OpenApiDocument, ParseOptions, ParsedSpec,
    SpecFormat,
};
pub use schema::{resolve_schema, ResolvedSchema, SeenRefs};
