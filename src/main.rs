//! School Registry - HTTP service entry point

use school_registry::core::config::DEFAULT_JWT_SECRET;
use school_registry::{api, core, db, mail};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting School Registry v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );

    if config.security.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Using the default JWT secret; set security.jwt_secret before deploying");
    }
    if config.security.admin_api_key.is_empty() {
        warn!("No admin API key configured; admin routes are disabled");
    }

    info!(path = ?config.database.path, "Opening database");
    let db = Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size as u32,
        Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Database initialized successfully");

    let mailer = mail::build_mailer(&config.mail)?;
    info!(enabled = config.mail.enabled, "Mail relay configured");

    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(config, db, mailer);

    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}
