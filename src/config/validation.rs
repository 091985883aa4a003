//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of merged adapter properties (serde handles syntactic)
//! - Check the values a client build cannot do without (base url, token endpoint)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdapterProperties → Result<(), Vec<ValidationError>>
//! - Runs at the rebuild boundary, after the common entry has been merged in

use std::fmt;

use url::Url;

use crate::config::schema::{is_blank, AdapterProperties, Auth};

/// A single semantic problem with an adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate merged properties. TLS material is checked when the bundle is built.
pub fn validate_properties(properties: &AdapterProperties) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match properties.url.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationError::new("url", "url is required")),
        Some(raw) => {
            if let Err(e) = Url::parse(raw) {
                errors.push(ValidationError::new("url", format!("'{raw}' is not an absolute url: {e}")));
            }
        }
    }

    match &properties.auth {
        Auth::Basic(basic) if basic.username.trim().is_empty() => {
            errors.push(ValidationError::new("auth.username", "basic auth requires a username"));
        }
        Auth::Bearer(bearer) => {
            if is_blank(&bearer.url) {
                errors.push(ValidationError::new("auth.url", "bearer auth requires a token url"));
            }
            if bearer.ttl_millis == 0 {
                errors.push(ValidationError::new("auth.ttl_millis", "bearer token ttl must be positive"));
            }
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
