//! Audit storage
//!
//! Every successful content read is appended to the `files` table. The
//! table is provisioned once at start-up; resetting it is an explicit
//! choice, never a side effect of starting the process.

mod audit;
mod schema;

pub use audit::*;
pub use schema::*;
