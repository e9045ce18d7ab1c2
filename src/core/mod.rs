//! Cross-cutting application infrastructure
//!
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{AuthError, ErrorResponse, RegistryError, Result};
pub use logging::Logger;
