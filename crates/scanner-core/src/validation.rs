//! # Validation
//!
//! Input rules applied before anything reaches the server or the queue.
//!
//! ## Server URL Normalization
//! ```text
//! "  example.com:8000 "  ──trim──►  "example.com:8000"
//!                        ──scheme─► "http://example.com:8000"
//!                        ──slash──► "http://example.com:8000/"
//! ```
//! Normalization is idempotent: a normalized URL comes back unchanged.

use crate::error::ValidationError;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Normalizes a user-entered server address.
///
/// Trims whitespace, prefixes `http://` unless the address already starts
/// with `http://` or `https://`, and guarantees a trailing `/`.
///
/// ```rust
/// use scanner_core::validation::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://inv.local:8000"), "https://inv.local:8000/");
/// assert_eq!(normalize_base_url("http://a/"), "http://a/");
/// ```
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Validates and normalizes a server address.
///
/// ## Errors
/// - [`ValidationError::Required`] when the address is blank
/// - [`ValidationError::InvalidFormat`] when it contains whitespace after trimming
pub fn validate_server_url(raw: &str) -> ValidationResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "server_url".into(),
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "server_url".into(),
            reason: "must not contain spaces".into(),
        });
    }
    Ok(normalize_base_url(trimmed))
}

/// Validates a scanned box code and returns it trimmed.
///
/// Only blank input is rejected. Embedded control characters such as the
/// GS1 group separator (`\x1d`) are part of the code and kept.
pub fn validate_box_code(raw: &str) -> ValidationResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "box_number".into(),
        });
    }
    Ok(code.to_string())
}
