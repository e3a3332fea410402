//! Content file lookup
//!
//! Resolves `(type, version)` pairs into validated keys and reads the
//! matching files from the content directory.

mod key;
mod library;

pub use key::*;
pub use library::*;
