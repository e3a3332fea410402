//! RPC Data Models
//!
//! Wire types for the content RPC and the HTTP front end.

use crate::error::ContentGateError;
use crate::storage::AuditSummary;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Content request payload.
///
/// Absent, `null` and empty fields are all treated as missing. Keys match
/// case-insensitively (`"Type"` sets `type`), a repeated key keeps its last
/// non-null value, and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentRequest {
    /// Content category
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Version label
    pub version: Option<String>,
    /// Digest the client already holds (lowercase hex SHA-256)
    pub hash: Option<String>,
}

impl<'de> Deserialize<'de> for ContentRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ContentRequestVisitor)
    }
}

struct ContentRequestVisitor;

impl<'de> Visitor<'de> for ContentRequestVisitor {
    type Value = ContentRequest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a content request object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut request = ContentRequest::default();

        // entries are visited in document order, so later keys overwrite earlier ones
        while let Some(key) = map.next_key::<String>()? {
            let slot = if key.eq_ignore_ascii_case("type") {
                &mut request.kind
            } else if key.eq_ignore_ascii_case("version") {
                &mut request.version
            } else if key.eq_ignore_ascii_case("hash") {
                &mut request.hash
            } else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };

            let value = map
                .next_value::<Option<String>>()
                .map_err(|e| <A::Error as de::Error>::custom(format!("field `{}`: {}", key, e)))?;

            // null leaves an earlier value in place
            if value.is_some() {
                *slot = value;
            }
        }

        Ok(request)
    }
}

impl ContentRequest {
    /// Request for an explicit type and version
    pub fn new(kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            version: Some(version.into()),
            hash: None,
        }
    }

    /// Attach the digest the client holds
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Expected digest, if the client sent a non-empty one
    pub fn expected_hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|h| !h.is_empty())
    }
}

/// Content response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    /// Resolved content category
    #[serde(rename = "type")]
    pub kind: String,
    /// Resolved version label
    pub version: String,
    /// SHA-256 of the bytes read, lowercase hex
    pub hash: String,
    /// Full content, or empty when withheld
    pub content: String,
}

/// Error body returned by the HTTP front end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl From<&ContentGateError> for ApiError {
    fn from(err: &ContentGateError) -> Self {
        Self {
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Page of audit records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    /// Records, newest first
    pub items: Vec<AuditSummary>,
    /// Total records in the table
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields_optional() {
        let request: ContentRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, ContentRequest::default());

        let request: ContentRequest =
            serde_json::from_str(r#"{"type":null,"version":"2.0.0","extra":1}"#).unwrap();
        assert!(request.kind.is_none());
        assert_eq!(request.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_request_keys_case_insensitive() {
        let request: ContentRequest =
            serde_json::from_str(r#"{"Type":"maps","VERSION":"2.0.0","Hash":"abc"}"#).unwrap();
        assert_eq!(request, ContentRequest::new("maps", "2.0.0").with_hash("abc"));
    }

    #[test]
    fn test_request_repeated_key_last_wins() {
        let request: ContentRequest =
            serde_json::from_str(r#"{"type":"core","Type":"maps","type":null}"#).unwrap();
        assert_eq!(request.kind.as_deref(), Some("maps"));
    }

    #[test]
    fn test_request_rejects_non_object_and_non_string() {
        assert!(serde_json::from_str::<ContentRequest>("[1,2]").is_err());
        assert!(serde_json::from_str::<ContentRequest>(r#""core""#).is_err());
        assert!(serde_json::from_str::<ContentRequest>(r#"{"version":1}"#).is_err());
    }

    #[test]
    fn test_empty_hash_is_not_expected() {
        let request = ContentRequest::new("core", "1.0.0").with_hash("");
        assert!(request.expected_hash().is_none());

        let request = ContentRequest::new("core", "1.0.0").with_hash("abc");
        assert_eq!(request.expected_hash(), Some("abc"));
    }

    #[test]
    fn test_response_field_names() {
        let response = ContentResponse {
            kind: "core".into(),
            version: "1.0.0".into(),
            hash: "h".into(),
            content: String::new(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"type":"core","version":"1.0.0","hash":"h","content":""}"#);
    }

    #[test]
    fn test_api_error_from_error() {
        let err = ContentGateError::RpcNotFound("nope".into());
        let body = ApiError::from(&err);
        assert_eq!(body.code, "RPC_NOT_FOUND");
        assert!(body.message.contains("nope"));
    }
}
