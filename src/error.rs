//! Error types for ContentGate
//!
//! This module defines the error taxonomy surfaced by the content
//! verification RPC and its collaborators. Every failure reaches the caller
//! as a value; nothing is retried or downgraded.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ContentGate operations
#[derive(Error, Debug)]
pub enum ContentGateError {
    /// Request payload is not valid JSON for the request schema
    #[error("Invalid request payload: {0}")]
    Decode(String),

    /// A `type` or `version` segment failed validation
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidSegment {
        /// Request field name
        field: &'static str,
        /// Rejected value
        value: String,
        /// Rule that was violated
        reason: &'static str,
    },

    /// Content file does not exist
    #[error("file does not exist: {0}")]
    NotFound(PathBuf),

    /// Content file exists but could not be read
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Audit store failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Response could not be serialized
    #[error("Failed to encode response: {0}")]
    Encode(String),

    /// No RPC registered under the requested id
    #[error("RPC function not found: {0}")]
    RpcNotFound(String),

    /// RPC id is empty or already registered
    #[error("RPC function already registered or invalid id: {0}")]
    DuplicateRpc(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Listener bind or accept failure
    #[error("Connection error on '{addr}': {message}")]
    ConnectionError {
        /// Address being bound
        addr: String,
        /// Failure description
        message: String,
    },
}

impl ContentGateError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a segment validation error
    pub fn invalid_segment(
        field: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidSegment {
            field,
            value: value.into(),
            reason,
        }
    }

    /// Create a connection error
    pub fn connection(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            addr: addr.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Stable error code reported to RPC callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidSegment { .. } => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Io { .. } => "IO_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::RpcNotFound(_) => "RPC_NOT_FOUND",
            Self::DuplicateRpc(_) => "DUPLICATE_RPC",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConnectionError { .. } => "CONNECTION_ERROR",
        }
    }

    /// HTTP status used when the error crosses the HTTP front end
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Decode(_) | Self::InvalidSegment { .. } => 400,
            Self::NotFound(_) | Self::RpcNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Check if the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for ContentGate operations
pub type Result<T> = std::result::Result<T, ContentGateError>;

impl From<std::io::Error> for ContentGateError {
    fn from(err: std::io::Error) -> Self {
        ContentGateError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<rusqlite::Error> for ContentGateError {
    fn from(err: rusqlite::Error) -> Self {
        ContentGateError::Persistence(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error, keeping absence distinct
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContentGateError::NotFound(path.into())
            } else {
                ContentGateError::io(path, e)
            }
        })
    }
}
