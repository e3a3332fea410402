//! Configuration settings for ContentGate
//!
//! Defines the CLI arguments, environment overrides and runtime
//! configuration for the handler, the audit store and the HTTP front end.

use crate::content::{ContentLibrary, DEFAULT_BASE_DIR, DEFAULT_EXTENSION, DEFAULT_TYPE, DEFAULT_VERSION};
use crate::storage::ProvisionMode;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RPC id the content handler is registered under
pub const DEFAULT_RPC_ID: &str = "my_rpc_function";

/// Default audit database file
pub const DEFAULT_DATABASE: &str = "contentgate.db";

/// ContentGate - content verification RPC with an audit trail
#[derive(Parser, Debug, Clone)]
#[command(name = "contentgate")]
#[command(author = "ContentGate Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve versioned content files gated by their SHA-256 digest")]
#[command(long_about = r#"
ContentGate serves versioned content files to game clients.

A client names a content type and version and may send the SHA-256 digest
it already holds. The server always answers with the true digest, and only
includes the content when the client sent no digest or the right one.
Every successful read is appended to the `files` audit table.

Examples:
  contentgate serve --port 7350                      # HTTP front end
  contentgate invoke '{"type":"core","version":"1.0.0"}'
  contentgate provision --reset                      # wipe audit history
  contentgate history --limit 5
  contentgate digest /nakama/data/core/1.0.0.json
"#)]
pub struct CliArgs {
    /// Root directory of content files (<dir>/<type>/<version>.json)
    #[arg(long, env = "CONTENTGATE_DATA_DIR", default_value = DEFAULT_BASE_DIR, value_name = "DIR")]
    pub data_dir: PathBuf,

    /// SQLite database holding the audit table
    #[arg(long, env = "CONTENTGATE_DATABASE", default_value = DEFAULT_DATABASE, value_name = "PATH")]
    pub database: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP front end
    #[command(name = "serve")]
    Serve {
        /// Listen port
        #[arg(short, long, env = "CONTENTGATE_PORT", default_value = "7350")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// RPC id to register the content handler under
        #[arg(long, default_value = DEFAULT_RPC_ID)]
        rpc_id: String,
        /// Drop and recreate the audit table on start (discards history)
        #[arg(long)]
        reset_table: bool,
        /// Maximum request body size in bytes
        #[arg(long, default_value = "1048576", value_name = "BYTES")]
        max_body_size: usize,
    },

    /// Invoke the content handler once and print the response
    #[command(name = "invoke")]
    Invoke {
        /// JSON payload (read from stdin when omitted)
        payload: Option<String>,
        /// RPC id to invoke
        #[arg(long, default_value = DEFAULT_RPC_ID)]
        rpc_id: String,
    },

    /// Create the audit table
    #[command(name = "provision")]
    Provision {
        /// Drop the table first (discards history)
        #[arg(long)]
        reset: bool,
    },

    /// Show recent audit records
    #[command(name = "history")]
    History {
        /// Number of records
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only this content type
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
        /// Only this version
        #[arg(long)]
        version: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the SHA-256 digest a client would send for a file
    #[command(name = "digest")]
    Digest {
        /// File to hash
        file: PathBuf,
    },

    /// List available versions of a content type
    #[command(name = "list")]
    List {
        /// Content type
        #[arg(value_name = "TYPE", default_value = DEFAULT_TYPE)]
        kind: String,
    },
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Content handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Root of the content directory
    pub base_dir: PathBuf,
    /// Type used when the request omits one
    pub default_type: String,
    /// Version used when the request omits one
    pub default_version: String,
    /// Content file extension
    pub extension: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            default_type: DEFAULT_TYPE.to_string(),
            default_version: DEFAULT_VERSION.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl HandlerConfig {
    /// Handler config rooted at `base_dir`, everything else default
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Content library described by this config
    pub fn library(&self) -> ContentLibrary {
        ContentLibrary::with_extension(&self.base_dir, &self.extension)
    }
}

/// Where the audit table lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseLocation {
    /// SQLite file
    File(PathBuf),
    /// Private in-memory database
    Memory,
}

/// Module initialization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Content handler settings
    pub handler: HandlerConfig,
    /// Audit database
    pub database: DatabaseLocation,
    /// Audit table provisioning
    pub provision: ProvisionMode,
    /// RPC id of the content handler
    pub rpc_id: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            handler: HandlerConfig::default(),
            database: DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE)),
            provision: ProvisionMode::Preserve,
            rpc_id: DEFAULT_RPC_ID.to_string(),
        }
    }
}

impl ModuleConfig {
    /// Build module config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Self {
        let mut config = Self {
            handler: HandlerConfig::with_base_dir(&args.data_dir),
            database: DatabaseLocation::File(args.database.clone()),
            ..Default::default()
        };

        match &args.command {
            Commands::Serve { rpc_id, reset_table, .. } => {
                config.rpc_id = rpc_id.clone();
                if *reset_table {
                    config.provision = ProvisionMode::Reset;
                }
            }
            Commands::Invoke { rpc_id, .. } => {
                config.rpc_id = rpc_id.clone();
            }
            Commands::Provision { reset: true } => {
                config.provision = ProvisionMode::Reset;
            }
            _ => {}
        }

        config
    }
}

/// HTTP front end configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Port
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7350,
            max_body_size: 1024 * 1024, // 1 MB
        }
    }
}

impl ServerConfig {
    /// Socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
