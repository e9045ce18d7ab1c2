use crate::auth::middleware::bearer_token;
use crate::core::error::{AuthError, RegistryError};
use axum::{extract::Request, middleware::Next, response::Response};

/// Gate for the admin routes
///
/// The caller must present `Authorization: Bearer <admin key>`. With no key
/// configured the admin API is disabled and every call is refused.
pub async fn admin_key_middleware(request: Request, next: Next) -> Result<Response, RegistryError> {
    let admin_key = request
        .extensions()
        .get::<AdminKey>()
        .ok_or_else(|| RegistryError::ConfigError("Admin key not configured on router".to_string()))?;

    if !admin_key.enabled() {
        return Err(RegistryError::PermissionDenied(
            "Admin API is disabled".to_string(),
        ));
    }

    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;

    if !admin_key.matches(token) {
        tracing::warn!("Rejected admin call with wrong key");
        return Err(RegistryError::PermissionDenied(
            "Invalid admin key".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Extension type for storing the admin key in request extensions
#[derive(Clone)]
pub struct AdminKey {
    key: String,
}

impl AdminKey {
    pub fn new(key: String) -> Self {
        Self { key }
    }

    pub fn enabled(&self) -> bool {
        !self.key.is_empty()
    }

    /// Compare without short-circuiting on the first differing byte
    fn matches(&self, candidate: &str) -> bool {
        let expected = self.key.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminKey")
            .field("enabled", &self.enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    fn app(key: &str) -> Router {
        let admin_key = AdminKey::new(key.to_string());
        Router::new()
            .route("/admin", get(|| async { "admin" }))
            .layer(middleware::from_fn(move |mut req: Request, next: Next| {
                let admin_key = admin_key.clone();
                async move {
                    req.extensions_mut().insert(admin_key);
                    admin_key_middleware(req, next).await
                }
            }))
    }

    async fn call(app: Router, authorization: Option<&str>) -> StatusCode {
        let mut builder = axum::http::Request::builder().uri("/admin");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_valid_admin_key() {
        assert_eq!(call(app("admin-secret"), Some("Bearer admin-secret")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_admin_key() {
        assert_eq!(
            call(app("admin-secret"), Some("Bearer admin-secreT")).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(call(app("admin-secret"), Some("Bearer short")).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_admin_key() {
        assert_eq!(call(app("admin-secret"), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(app("admin-secret"), Some("Basic dGVzdDp0ZXN0")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_admin_disabled_without_key() {
        assert_eq!(call(app(""), Some("Bearer anything")).await, StatusCode::FORBIDDEN);
    }
}
