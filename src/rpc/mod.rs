//! Content verification RPC
//!
//! The content handler, the registry it is published through, module
//! start-up, and a blocking HTTP front end.
//!
//! ## HTTP Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/v2/rpc/{id}` | POST | Invoke a registered RPC, body is the payload |
//! | `/api/files` | GET | Recent audit records (`?limit=`) |
//! | `/health` | GET | Liveness check |

mod handler;
mod models;
mod module;
mod registry;
mod server;

pub use handler::*;
pub use models::*;
pub use module::*;
pub use registry::*;
pub use server::*;
