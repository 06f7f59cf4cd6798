//! # Domain Errors
//!
//! Error types for the scanner domain model.
//!
//! ## Error Hierarchy
//! ```text
//! CoreError
//! ├── Validation(ValidationError)  - bad box codes, empty server URLs
//! └── UnknownFilter                - unrecognized record filter name
//! ```

use thiserror::Error;

/// Top-level domain error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown record filter: '{0}' (expected all, found or not_found)")]
    UnknownFilter(String),
}

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} has an invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result alias for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
