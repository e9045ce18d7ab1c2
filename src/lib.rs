//! School Registry Library
//!
//! Student and teacher accounts over a JSON document store, with bcrypt
//! credentials, bearer tokens, admin maintenance routes and credential mail.

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod mail;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::{Config, RegistryError};
pub use db::DatabaseManager;
pub use mail::{build_mailer, Mailer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for the library
pub type Result<T> = anyhow::Result<T>;
