//! Module start-up
//!
//! Runs once per process: opens the audit store, provisions the `files`
//! table, builds the content handler and registers it.

use crate::config::{DatabaseLocation, ModuleConfig};
use crate::error::Result;
use crate::rpc::handler::ContentVerificationHandler;
use crate::rpc::registry::RpcRegistry;
use crate::storage::AuditStore;
use std::sync::Arc;

/// Initialized module: the registry to dispatch through and the audit store
/// backing the content handler
pub struct Module {
    /// Registered RPC functions
    pub registry: RpcRegistry,
    /// Audit store shared with the handler
    pub store: AuditStore,
}

/// Provision storage and register the content handler
pub fn init_module(config: &ModuleConfig) -> Result<Module> {
    tracing::debug!("Initializing module...");

    let store = match &config.database {
        DatabaseLocation::File(path) => {
            tracing::debug!(path = %path.display(), "Opening audit database");
            AuditStore::open(path)?
        }
        DatabaseLocation::Memory => AuditStore::memory()?,
    };

    store.provision(config.provision)?;

    let handler = ContentVerificationHandler::new(config.handler.clone(), Arc::new(store.clone()));

    let mut registry = RpcRegistry::new();
    registry.register(&config.rpc_id, Arc::new(handler))?;

    tracing::info!(
        rpc_id = %config.rpc_id,
        data_dir = %config.handler.base_dir.display(),
        "Module initialized"
    );

    Ok(Module { registry, store })
}
