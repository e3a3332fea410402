//! Hash computation and digest comparison
//!
//! Content files are identified by their SHA-256 digest, encoded as
//! lowercase hex. Streaming support keeps large files off the heap when
//! only the digest is needed.

mod integrity;

pub use integrity::*;
