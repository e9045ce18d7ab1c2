//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Request timeouts
//! - Security headers, trace IDs and CORS

use crate::api::handlers::AppState;
use crate::api::middleware::{security_headers_middleware, trace_id_middleware, SecurityHeadersConfig};
use crate::api::routes::build_api_routes;
use crate::auth::{AuthGateway, PasswordHasher, TokenIssuer};
use crate::core::config::ServerConfig;
use crate::core::error::ErrorResponse;
use crate::core::Config;
use crate::db::manager::DatabaseManager;
use crate::db::repository::{StudentRepository, TeacherRepository};
use crate::db::store::DocumentStore;
use crate::mail::Mailer;
use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    BoxError, Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server over an opened database and a mailer
    pub fn new(config: Config, db: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> Self {
        let server_config = config.server.clone();
        let router = Self::build_router(config, db, mailer);

        Self {
            router,
            config: server_config,
        }
    }

    /// Wire repositories, the auth gateway and the mailer into shared state
    pub fn build_state(config: Config, db: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> AppState {
        let store = DocumentStore::new(db);
        let students = StudentRepository::new(store.clone());
        let teachers = TeacherRepository::new(store);

        let gateway = AuthGateway::new(
            students.clone(),
            teachers.clone(),
            PasswordHasher::new(config.security.bcrypt_cost),
            TokenIssuer::new(&config.security.jwt_secret, config.security.token_ttl()),
        );

        AppState {
            students: Arc::new(students),
            teachers: Arc::new(teachers),
            gateway: Arc::new(gateway),
            mailer,
            config: Arc::new(config),
        }
    }

    /// Build the Axum router with all routes and middleware
    pub fn build_router(config: Config, db: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> Router {
        let security_headers_config = SecurityHeadersConfig::from(&config.security);
        let cors = Self::build_cors_layer(&config.security.allowed_origins);
        let request_timeout = Duration::from_secs(config.server.request_timeout);

        let state = Self::build_state(config, db, mailer);

        build_api_routes(state).layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(move |mut req: Request, next: Next| {
                    let config = security_headers_config.clone();
                    async move {
                        req.extensions_mut().insert(config);
                        security_headers_middleware(req, next).await
                    }
                }))
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(request_timeout)),
        )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        let cors = CorsLayer::new();

        if allowed_origins.iter().any(|origin| origin == "*") {
            cors.allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            cors.allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            request_timeout = self.config.request_timeout,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

async fn handle_timeout(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ErrorResponse::new(
                "Timeout".to_string(),
                "Request timed out".to_string(),
            )),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "InternalError".to_string(),
                "Internal server error".to_string(),
            )),
        )
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}
