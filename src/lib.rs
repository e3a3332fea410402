//! # ContentGate - Content Verification RPC
//!
//! ContentGate serves versioned content files to game clients. A client
//! names a content `type` and `version`, and may send the SHA-256 digest of
//! the copy it already holds. The server reads
//! `<base-dir>/<type>/<version>.json`, always answers with the true digest,
//! and includes the content only when the client sent no digest or the
//! matching one. Every successful read is appended to the `files` audit
//! table before the response is returned.
//!
//! ## Features
//!
//! - **Digest-gated disclosure**: content is withheld from clients holding a stale digest
//! - **Audit trail**: append-only SQLite `files` table, one row per successful read
//! - **Path safety**: `type` and `version` pass an allow-list before any path is built
//! - **RPC registry**: handlers published by id, invoked in-process or over HTTP
//! - **Explicit provisioning**: the audit table is only reset when asked to
//!
//! ## Quick Start
//!
//! ```no_run
//! use contentgate::config::{DatabaseLocation, HandlerConfig, ModuleConfig};
//! use contentgate::rpc::init_module;
//!
//! let config = ModuleConfig {
//!     handler: HandlerConfig::with_base_dir("/nakama/data"),
//!     database: DatabaseLocation::Memory,
//!     ..Default::default()
//! };
//!
//! let module = init_module(&config).unwrap();
//! let response = module
//!     .registry
//!     .invoke("my_rpc_function", r#"{"type":"core","version":"1.0.0"}"#)
//!     .unwrap();
//!
//! println!("{}", response);
//! ```
//!
//! ## Typed Usage
//!
//! ```no_run
//! use contentgate::config::HandlerConfig;
//! use contentgate::rpc::{ContentRequest, ContentVerificationHandler};
//! use contentgate::storage::{AuditStore, ProvisionMode};
//! use std::sync::Arc;
//!
//! let store = AuditStore::memory().unwrap();
//! store.provision(ProvisionMode::Preserve).unwrap();
//!
//! let handler = ContentVerificationHandler::new(
//!     HandlerConfig::with_base_dir("/nakama/data"),
//!     Arc::new(store.clone()),
//! );
//!
//! let request = ContentRequest::new("core", "1.0.0").with_hash("e3b0c442...");
//! let response = handler.handle(&request).unwrap();
//!
//! println!("digest {} ({} audit rows)", response.hash, store.count().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod content;
pub mod error;
pub mod hash;
pub mod rpc;
pub mod storage;

// Re-export commonly used types
pub use config::{HandlerConfig, ModuleConfig};
pub use error::{ContentGateError, Result};
pub use rpc::{ContentRequest, ContentResponse, ContentVerificationHandler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use contentgate::prelude::*;
    //! ```

    pub use crate::config::{DatabaseLocation, HandlerConfig, ModuleConfig, ServerConfig};
    pub use crate::content::{ContentKey, ContentLibrary};
    pub use crate::error::{ContentGateError, Result};
    pub use crate::hash::{hash_bytes, hash_file, HashResult};
    pub use crate::rpc::{
        init_module, ApiServer, ContentRequest, ContentResponse, ContentVerificationHandler,
        RpcFunction, RpcRegistry,
    };
    pub use crate::storage::{AuditSink, AuditStore, ProvisionMode};
}
