use crate::core::config::SecurityConfig;
use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Security headers middleware
///
/// Adds to every response:
/// - X-Content-Type-Options: nosniff
/// - X-Frame-Options: DENY
/// - Content-Security-Policy denying all content, as the API serves only JSON
/// - Cache-Control: no-store, since bodies may carry tokens or profiles
/// - Strict-Transport-Security when enabled
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let security_config = request
        .extensions()
        .get::<SecurityHeadersConfig>()
        .cloned();

    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    parts
        .headers
        .insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    parts
        .headers
        .insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    parts.headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    parts
        .headers
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    if let Some(config) = security_config {
        if config.enable_hsts {
            let hsts_value = format!("max-age={}; includeSubDomains", config.hsts_max_age);
            parts.headers.insert(
                "Strict-Transport-Security",
                HeaderValue::from_str(&hsts_value)
                    .unwrap_or_else(|_| HeaderValue::from_static("max-age=31536000; includeSubDomains")),
            );
        }
    }

    Response::from_parts(parts, body)
}

/// Configuration for security headers
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    pub enable_hsts: bool,
    pub hsts_max_age: u64,
}

impl From<&SecurityConfig> for SecurityHeadersConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            enable_hsts: config.enable_hsts,
            hsts_max_age: config.hsts_max_age,
        }
    }
}
