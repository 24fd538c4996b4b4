//! Turning endpoint definitions and user input into executable requests

pub mod builder;
pub mod form;

pub use builder::{build_try_it_request, BuildRequestInput};
pub use form::parse_form_like_input;

/// Media type without parameters, lower-cased. Empty when absent.
pub fn normalize_content_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default()
}
