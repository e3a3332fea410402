//! Content identity
//!
//! `type` and `version` come straight from the RPC payload and end up as
//! path segments, so both pass an allow-list before any path is built.

use crate::error::{ContentGateError, Result};
use serde::{Deserialize, Serialize};

/// Content type used when a request omits `type`
pub const DEFAULT_TYPE: &str = "core";

/// Version used when a request omits `version`
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Longest accepted segment
pub const MAX_SEGMENT_LEN: usize = 128;

/// Resolved and validated content identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    /// Content category, e.g. `core`
    #[serde(rename = "type")]
    pub kind: String,
    /// Version label, e.g. `1.0.0`
    pub version: String,
}

impl ContentKey {
    /// Resolve a key from optional request fields.
    ///
    /// Missing or empty fields take the supplied defaults; the results are
    /// then validated as path segments.
    pub fn resolve(
        kind: Option<&str>,
        version: Option<&str>,
        default_kind: &str,
        default_version: &str,
    ) -> Result<Self> {
        let kind = non_empty(kind).unwrap_or(default_kind);
        let version = non_empty(version).unwrap_or(default_version);

        validate_segment("type", kind)?;
        validate_segment("version", version)?;

        Ok(Self {
            kind: kind.to_string(),
            version: version.to_string(),
        })
    }

    /// Resolve with the built-in defaults (`core` / `1.0.0`)
    pub fn with_defaults(kind: Option<&str>, version: Option<&str>) -> Result<Self> {
        Self::resolve(kind, version, DEFAULT_TYPE, DEFAULT_VERSION)
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.version)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Check that a value is safe to use as a single path segment
pub fn validate_segment(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ContentGateError::invalid_segment(field, value, "must not be empty"));
    }

    if value.len() > MAX_SEGMENT_LEN {
        return Err(ContentGateError::invalid_segment(
            field,
            value,
            "exceeds 128 characters",
        ));
    }

    if !value.chars().all(is_segment_char) {
        return Err(ContentGateError::invalid_segment(
            field,
            value,
            "only ASCII letters, digits, '.', '-', '_' and '+' are allowed",
        ));
    }

    if value.starts_with('.') || value.contains("..") {
        return Err(ContentGateError::invalid_segment(
            field,
            value,
            "leading dots and '..' are not allowed",
        ));
    }

    Ok(())
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')
}
