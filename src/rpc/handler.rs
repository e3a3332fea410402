//! Content Verification Handler
//!
//! One invocation is a straight pipeline: decode, resolve the key, read the
//! file, hash it, decide disclosure, append the audit record, encode. Any
//! failure ends the invocation; the response is only produced after the
//! audit record has been committed.

use crate::config::HandlerConfig;
use crate::content::{ContentKey, ContentLibrary};
use crate::error::{ContentGateError, Result};
use crate::hash::hash_bytes;
use crate::rpc::models::{ContentRequest, ContentResponse};
use crate::rpc::registry::RpcFunction;
use crate::storage::{AuditSink, NewAuditRecord};
use std::sync::Arc;

/// Serves content files and records every successful read
pub struct ContentVerificationHandler {
    config: HandlerConfig,
    library: ContentLibrary,
    sink: Arc<dyn AuditSink>,
}

impl ContentVerificationHandler {
    /// Create a handler over the configured content directory
    pub fn new(config: HandlerConfig, sink: Arc<dyn AuditSink>) -> Self {
        let library = config.library();
        Self {
            config,
            library,
            sink,
        }
    }

    /// Content library this handler reads from
    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    /// Wire-level entry point: JSON payload in, JSON response out
    pub fn handle_payload(&self, payload: &str) -> Result<String> {
        // `null` decodes to an all-defaults request
        let request = serde_json::from_str::<Option<ContentRequest>>(payload)
            .map_err(|e| ContentGateError::Decode(e.to_string()))?
            .unwrap_or_default();

        let response = self.handle(&request)?;

        serde_json::to_string(&response).map_err(|e| ContentGateError::Encode(e.to_string()))
    }

    /// Typed entry point
    pub fn handle(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let key = ContentKey::resolve(
            request.kind.as_deref(),
            request.version.as_deref(),
            &self.config.default_type,
            &self.config.default_version,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected content request");
            e
        })?;

        let span = tracing::debug_span!("content_rpc", kind = %key.kind, version = %key.version);
        let _guard = span.enter();

        let content = match self.library.read(&key) {
            Ok(content) => content,
            Err(e @ ContentGateError::NotFound(_)) => {
                tracing::info!("file does not exist");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read content file");
                return Err(e);
            }
        };

        let digest = hash_bytes(&content);

        let disclose = match request.expected_hash() {
            Some(expected) => digest.matches(expected),
            None => true,
        };

        let record = NewAuditRecord {
            kind: &key.kind,
            version: &key.version,
            hash: &digest.hash,
            content: &content,
        };

        let id = self.sink.append(&record).map_err(|e| {
            tracing::error!(error = %e, "Failed to record content read");
            match e {
                ContentGateError::Persistence(_) => e,
                other => ContentGateError::Persistence(other.to_string()),
            }
        })?;

        if disclose {
            tracing::debug!(audit_id = id, size = digest.size, "Content served");
        } else {
            tracing::info!(audit_id = id, "Client digest differs, content withheld");
        }

        let content = if disclose {
            String::from_utf8_lossy(&content).into_owned()
        } else {
            String::new()
        };

        Ok(ContentResponse {
            kind: key.kind,
            version: key.version,
            hash: digest.hash,
            content,
        })
    }
}

impl RpcFunction for ContentVerificationHandler {
    fn call(&self, payload: &str) -> Result<String> {
        self.handle_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AuditStore, ProvisionMode};
    use proptest::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const KEY_VALUE: &[u8] = b"{\"key\":\"value\"}";
    const KEY_VALUE_SHA256: &str =
        "e43abcf3375244839c012f9633f95862d232a95b00d5bc7348b3098b9fed7f32";

    struct Fixture {
        dir: TempDir,
        store: AuditStore,
        handler: ContentVerificationHandler,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = AuditStore::memory().unwrap();
        store.provision(ProvisionMode::Preserve).unwrap();
        let handler = ContentVerificationHandler::new(
            HandlerConfig::with_base_dir(dir.path()),
            Arc::new(store.clone()),
        );
        Fixture { dir, store, handler }
    }

    fn write_content(root: &Path, kind: &str, version: &str, body: &[u8]) {
        let dir = root.join(kind);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{version}.json")), body).unwrap();
    }

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&self, _record: &NewAuditRecord<'_>) -> Result<i64> {
            Err(ContentGateError::Persistence("database is locked".to_string()))
        }
    }

    #[test]
    fn test_serves_content_and_records_it() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let out = fx
            .handler
            .handle_payload(r#"{"type":"core","version":"1.0.0"}"#)
            .unwrap();

        let expected = serde_json::json!({
            "type": "core",
            "version": "1.0.0",
            "hash": KEY_VALUE_SHA256,
            "content": "{\"key\":\"value\"}",
        });
        let actual: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(actual, expected);

        let rows = fx.store.recent(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "core");
        assert_eq!(rows[0].version, "1.0.0");
        assert_eq!(rows[0].hash, KEY_VALUE_SHA256);
        assert_eq!(rows[0].content, KEY_VALUE);
    }

    #[test]
    fn test_empty_payload_object_uses_defaults() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        for payload in ["{}", "null", r#"{"type":"","version":""}"#] {
            let out = fx.handler.handle_payload(payload).unwrap();
            let response: ContentResponse = serde_json::from_str(&out).unwrap();
            assert_eq!(response.kind, "core");
            assert_eq!(response.version, "1.0.0");
            assert_eq!(response.content, "{\"key\":\"value\"}");
        }
        assert_eq!(fx.store.count().unwrap(), 3);
    }

    #[test]
    fn test_payload_keys_match_case_insensitively() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", b"core");
        write_content(fx.dir.path(), "maps", "2.0.0", b"maps");

        let out = fx
            .handler
            .handle_payload(r#"{"Type":"maps","Version":"2.0.0"}"#)
            .unwrap();
        let response: ContentResponse = serde_json::from_str(&out).unwrap();
        assert_eq!(response.kind, "maps");
        assert_eq!(response.version, "2.0.0");
        assert_eq!(response.content, "maps");

        let rows = fx.store.recent(1).unwrap();
        assert_eq!((rows[0].kind.as_str(), rows[0].version.as_str()), ("maps", "2.0.0"));
    }

    #[test]
    fn test_payload_repeated_key_last_wins() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", b"core");
        write_content(fx.dir.path(), "maps", "2.0.0", b"maps");

        let out = fx
            .handler
            .handle_payload(r#"{"type":"core","type":"maps","version":"2.0.0"}"#)
            .unwrap();
        let response: ContentResponse = serde_json::from_str(&out).unwrap();
        assert_eq!(response.kind, "maps");
        assert_eq!(response.content, "maps");
        assert_eq!(fx.store.count_for("maps", "2.0.0").unwrap(), 1);
    }

    #[test]
    fn test_wrong_hash_withholds_content() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let request = ContentRequest::new("core", "1.0.0").with_hash("deadbeef");
        let response = fx.handler.handle(&request).unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.hash, KEY_VALUE_SHA256);

        // the audit row still stores the real content
        let rows = fx.store.recent(1).unwrap();
        assert_eq!(rows[0].content, KEY_VALUE);
        assert_eq!(rows[0].hash, KEY_VALUE_SHA256);
    }

    #[test]
    fn test_matching_hash_discloses_content() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let request = ContentRequest::new("core", "1.0.0").with_hash(KEY_VALUE_SHA256);
        let response = fx.handler.handle(&request).unwrap();
        assert_eq!(response.content, "{\"key\":\"value\"}");
        assert_eq!(response.hash, KEY_VALUE_SHA256);
    }

    #[test]
    fn test_uppercase_hash_does_not_match() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let request =
            ContentRequest::new("core", "1.0.0").with_hash(KEY_VALUE_SHA256.to_uppercase());
        let response = fx.handler.handle(&request).unwrap();
        assert_eq!(response.content, "");
    }

    #[test]
    fn test_empty_hash_discloses_content() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let out = fx
            .handler
            .handle_payload(r#"{"type":"core","version":"1.0.0","hash":""}"#)
            .unwrap();
        let response: ContentResponse = serde_json::from_str(&out).unwrap();
        assert_eq!(response.content, "{\"key\":\"value\"}");
    }

    #[test]
    fn test_missing_file_is_not_found_without_record() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let err = fx
            .handler
            .handle_payload(r#"{"type":"core","version":"9.9.9"}"#)
            .unwrap_err();

        assert!(matches!(err, ContentGateError::NotFound(_)));
        assert_eq!(fx.store.count().unwrap(), 0);
    }

    #[test]
    fn test_unreadable_path_is_io_error_without_record() {
        let fx = fixture();
        fs::create_dir_all(fx.dir.path().join("core").join("1.0.0.json")).unwrap();

        let err = fx.handler.handle_payload("{}").unwrap_err();
        assert_eq!(err.kind(), "IO_ERROR");
        assert_eq!(fx.store.count().unwrap(), 0);
    }

    #[test]
    fn test_decode_error_has_no_side_effects() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        for payload in ["", "not json", r#"{"type":5}"#, "[1,2]"] {
            let err = fx.handler.handle_payload(payload).unwrap_err();
            assert!(matches!(err, ContentGateError::Decode(_)), "{payload:?}");
        }
        assert_eq!(fx.store.count().unwrap(), 0);
    }

    #[test]
    fn test_traversal_rejected_before_read() {
        let fx = fixture();
        fs::write(fx.dir.path().join("secret.json"), b"top secret").unwrap();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        for payload in [
            r#"{"type":"..","version":"secret"}"#,
            r#"{"type":"core","version":"../../secret"}"#,
            r#"{"type":"core/../..","version":"secret"}"#,
        ] {
            let err = fx.handler.handle_payload(payload).unwrap_err();
            assert_eq!(err.kind(), "INVALID_ARGUMENT", "{payload}");
        }
        assert_eq!(fx.store.count().unwrap(), 0);
    }

    #[test]
    fn test_persistence_failure_withholds_response() {
        let dir = TempDir::new().unwrap();
        write_content(dir.path(), "core", "1.0.0", KEY_VALUE);

        let handler = ContentVerificationHandler::new(
            HandlerConfig::with_base_dir(dir.path()),
            Arc::new(FailingSink),
        );

        let err = handler.handle_payload("{}").unwrap_err();
        assert!(matches!(err, ContentGateError::Persistence(_)));
    }

    #[test]
    fn test_unprovisioned_store_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        write_content(dir.path(), "core", "1.0.0", KEY_VALUE);

        let handler = ContentVerificationHandler::new(
            HandlerConfig::with_base_dir(dir.path()),
            Arc::new(AuditStore::memory().unwrap()),
        );

        let err = handler.handle_payload("{}").unwrap_err();
        assert_eq!(err.kind(), "PERSISTENCE_ERROR");
    }

    #[test]
    fn test_one_record_per_call() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);
        write_content(fx.dir.path(), "maps", "2.0.0", b"[]");

        fx.handler.handle(&ContentRequest::new("core", "1.0.0")).unwrap();
        fx.handler
            .handle(&ContentRequest::new("core", "1.0.0").with_hash("wrong"))
            .unwrap();
        fx.handler.handle(&ContentRequest::new("maps", "2.0.0")).unwrap();

        assert_eq!(fx.store.count().unwrap(), 3);
        assert_eq!(fx.store.count_for("core", "1.0.0").unwrap(), 2);
        assert_eq!(fx.store.count_for("maps", "2.0.0").unwrap(), 1);
    }

    #[test]
    fn test_custom_defaults() {
        let dir = TempDir::new().unwrap();
        write_content(dir.path(), "items", "0.1.0", b"[1]");
        let store = AuditStore::memory().unwrap();
        store.provision(ProvisionMode::Preserve).unwrap();

        let config = HandlerConfig {
            default_type: "items".to_string(),
            default_version: "0.1.0".to_string(),
            ..HandlerConfig::with_base_dir(dir.path())
        };
        let handler = ContentVerificationHandler::new(config, Arc::new(store));

        let response = handler.handle(&ContentRequest::default()).unwrap();
        assert_eq!(response.kind, "items");
        assert_eq!(response.content, "[1]");
    }

    #[test]
    fn test_registered_as_rpc_function() {
        let fx = fixture();
        write_content(fx.dir.path(), "core", "1.0.0", KEY_VALUE);

        let function: &dyn RpcFunction = &fx.handler;
        let out = function.call("{}").unwrap();
        assert!(out.contains(KEY_VALUE_SHA256));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_hash_is_true_digest(body in proptest::collection::vec(any::<u8>(), 0..512), sent in "[0-9a-f]{0,64}") {
            let fx = fixture();
            write_content(fx.dir.path(), "core", "1.0.0", &body);

            let request = ContentRequest::new("core", "1.0.0").with_hash(sent.clone());
            let response = fx.handler.handle(&request).unwrap();
            let truth = hash_bytes(&body).hash;

            prop_assert_eq!(&response.hash, &truth);
            if sent.is_empty() || sent == truth {
                prop_assert_eq!(response.content, String::from_utf8_lossy(&body).into_owned());
            } else {
                prop_assert_eq!(response.content, "");
            }
            prop_assert_eq!(fx.store.recent(1).unwrap()[0].content.clone(), body);
        }
    }
}
