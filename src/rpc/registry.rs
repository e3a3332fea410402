//! RPC registration
//!
//! Maps RPC ids to functions taking a UTF-8 payload and returning a UTF-8
//! payload. Ids are matched case-insensitively.

use crate::error::{ContentGateError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A callable remote procedure
pub trait RpcFunction: Send + Sync {
    /// Invoke with a raw payload
    fn call(&self, payload: &str) -> Result<String>;
}

impl<F> RpcFunction for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn call(&self, payload: &str) -> Result<String> {
        self(payload)
    }
}

/// Registered RPC functions by id
#[derive(Default, Clone)]
pub struct RpcRegistry {
    functions: BTreeMap<String, Arc<dyn RpcFunction>>,
}

impl RpcRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under `id`. Each id can be registered once.
    pub fn register(&mut self, id: &str, function: Arc<dyn RpcFunction>) -> Result<()> {
        let id = normalize(id);

        if id.is_empty() {
            return Err(ContentGateError::DuplicateRpc("<empty>".to_string()));
        }

        if self.functions.contains_key(&id) {
            return Err(ContentGateError::DuplicateRpc(id));
        }

        tracing::info!(rpc_id = %id, "Registered RPC function");
        self.functions.insert(id, function);
        Ok(())
    }

    /// Invoke the function registered under `id`
    pub fn invoke(&self, id: &str, payload: &str) -> Result<String> {
        let id = normalize(id);
        let function = self
            .functions
            .get(&id)
            .ok_or_else(|| ContentGateError::RpcNotFound(id.clone()))?;

        function.call(payload)
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.functions.contains_key(&normalize(id))
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn normalize(id: &str) -> String {
    id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Arc<dyn RpcFunction> {
        Arc::new(|payload: &str| -> Result<String> { Ok(payload.to_string()) })
    }

    #[test]
    fn test_register_and_invoke() {
        let mut registry = RpcRegistry::new();
        registry.register("echo", echo()).unwrap();

        assert_eq!(registry.invoke("echo", "{\"a\":1}").unwrap(), "{\"a\":1}");
        assert_eq!(registry.invoke("ECHO", "x").unwrap(), "x");
        assert!(registry.contains("Echo"));
        assert_eq!(registry.ids(), vec!["echo"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = RpcRegistry::new();
        registry.register("my_rpc_function", echo()).unwrap();

        let err = registry.register("MY_RPC_FUNCTION", echo()).unwrap_err();
        assert!(matches!(err, ContentGateError::DuplicateRpc(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut registry = RpcRegistry::new();
        assert!(registry.register("  ", echo()).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_id() {
        let registry = RpcRegistry::new();
        let err = registry.invoke("missing", "{}").unwrap_err();
        assert!(matches!(err, ContentGateError::RpcNotFound(ref id) if id == "missing"));
    }

    #[test]
    fn test_errors_propagate() {
        let mut registry = RpcRegistry::new();
        registry
            .register(
                "fails",
                Arc::new(|_: &str| -> Result<String> {
                    Err(ContentGateError::Decode("bad".to_string()))
                }),
            )
            .unwrap();

        let err = registry.invoke("fails", "").unwrap_err();
        assert_eq!(err.kind(), "DECODE_ERROR");
    }
}
