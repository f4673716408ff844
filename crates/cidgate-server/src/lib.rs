//! HTTP server for cidgate.
//!
//! Exposes the gatekeeper's add, remove, list and health operations behind
//! HTTP Basic authentication, with per-request logging.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{CredentialTable, Credentials, Identity};
pub use config::{GatekeeperConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::GatekeeperServer;
pub use state::AppState;
