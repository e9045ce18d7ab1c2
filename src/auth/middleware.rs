//! Authentication middleware

use crate::api::handlers::AppState;
use crate::core::error::{AuthError, RegistryError, Result};
use crate::db::models::{Account, Role, Student, Teacher};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The account behind the bearer token of the current request
#[derive(Clone, Debug)]
pub struct CurrentAccount(pub Account);

impl CurrentAccount {
    pub fn account(&self) -> &Account {
        &self.0
    }

    pub fn require_teacher(&self) -> Result<&Teacher> {
        match &self.0 {
            Account::Teacher(teacher) => Ok(teacher),
            Account::Student(_) => Err(RegistryError::PermissionDenied(
                "Teacher role required".to_string(),
            )),
        }
    }

    pub fn require_student(&self) -> Result<&Student> {
        match &self.0 {
            Account::Student(student) => Ok(student),
            Account::Teacher(_) => Err(RegistryError::PermissionDenied(
                "Student role required".to_string(),
            )),
        }
    }

    pub fn role(&self) -> Role {
        self.0.role()
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Authentication middleware
///
/// Verifies the bearer token, re-reads the account it names and stores it
/// in the request extensions for [`CurrentAccount`].
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match state.gateway.authenticate(&token).await {
        Ok(account) => {
            tracing::debug!(username = %account.username(), role = %account.role(), "Request authenticated");
            request.extensions_mut().insert(CurrentAccount(account));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = RegistryError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or(RegistryError::Auth(AuthError::MissingToken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dGVzdDp0ZXN0")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
