//! Authentication request/response models

use crate::core::error::{RegistryError, Result};
use crate::db::models::Role;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref USERNAME: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").expect("username pattern is valid");
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid");
}

pub fn validate_username(username: &str) -> Result<()> {
    if USERNAME.is_match(username) {
        Ok(())
    } else {
        Err(RegistryError::ValidationError(
            "Username must be 1-64 letters, digits, '.', '_' or '-'".to_string(),
        ))
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(RegistryError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )))
    }
}

/// Student self-registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: Option<String>,
    pub age: Option<u32>,
    pub year: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        if self.password.is_empty() {
            return Err(RegistryError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }
        validate_email(&self.email)
    }
}

/// Login request, accepted as JSON or as an OAuth2 password form
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub role: Role,
}

/// Changes to the caller's own profile
///
/// Student accounts may set `full_name`, `email`, `age` and `year`; teacher
/// accounts `name`, `email` and `subject`. Either may set `password`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub year: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub password: Option<String>,
}

/// Generic message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, password: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            full_name: None,
            age: None,
            year: None,
        }
    }

    #[test]
    fn test_register_validation() {
        assert!(register("alice", "secret123", "alice@example.com").validate().is_ok());
        assert!(register("", "secret123", "alice@example.com").validate().is_err());
        assert!(register("al ice", "secret123", "alice@example.com").validate().is_err());
        assert!(register("alice", "", "alice@example.com").validate().is_err());
        assert!(register("alice", "secret123", "not-an-email").validate().is_err());
    }

    #[test]
    fn test_login_role_optional() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"a","password":"b"}"#).unwrap();
        assert!(req.role.is_none());

        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"a","password":"b","role":"teacher"}"#).unwrap();
        assert_eq!(req.role, Some(Role::Teacher));
    }

    #[test]
    fn test_profile_update_rejects_unknown_fields() {
        let result = serde_json::from_str::<UpdateProfileRequest>(r#"{"username":"new"}"#);
        assert!(result.is_err());
    }
}
