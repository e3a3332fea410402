//! Configuration module for ContentGate
//!
//! Provides configuration management including CLI arguments,
//! environment overrides and runtime settings.

mod settings;

pub use settings::*;
