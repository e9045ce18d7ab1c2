//! JWT token generation and validation

use crate::core::error::{AuthError, RegistryError, Result};
use crate::db::models::Role;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the account
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Signs and verifies HS256 bearer tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Issue a token with the configured lifetime
    pub fn issue(&self, subject: &str, role: Role) -> Result<IssuedToken> {
        self.issue_with_ttl(subject, role, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject: &str, role: Role, ttl: chrono::Duration) -> Result<IssuedToken> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RegistryError::CredentialError(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Validate a token and extract its claims
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret-at-least-16-chars";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::minutes(30))
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = issuer();
        let issued = issuer.issue("alice", Role::Student).unwrap();
        assert_eq!(issued.expires_in, 1800);

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let issued = issuer
            .issue_with_ttl("alice", Role::Student, Duration::seconds(-10))
            .unwrap();

        assert_eq!(issuer.verify(&issued.token), Err(AuthError::Expired));
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let issuer = issuer();
        let issued = issuer
            .issue_with_ttl("alice", Role::Teacher, Duration::seconds(1))
            .unwrap();
        assert!(issuer.verify(&issued.token).is_ok());

        std::thread::sleep(std::time::Duration::from_millis(2100));
        assert_eq!(issuer.verify(&issued.token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = issuer().issue("alice", Role::Student).unwrap();
        let other = TokenIssuer::new("another-secret-entirely", Duration::minutes(30));

        assert_eq!(other.verify(&issued.token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_malformed_token() {
        assert_eq!(issuer().verify("not.a.jwt"), Err(AuthError::Malformed));
        assert_eq!(issuer().verify(""), Err(AuthError::Malformed));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = issuer();
        let issued = issuer.issue("alice", Role::Student).unwrap();
        let forged = issuer.issue("mallory", Role::Teacher).unwrap();

        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged_parts: Vec<&str> = forged.token.split('.').collect();
        parts[1] = forged_parts[1];

        assert_eq!(issuer.verify(&parts.join(".")), Err(AuthError::InvalidSignature));
    }
}
