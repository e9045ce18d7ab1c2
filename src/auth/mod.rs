//! Authentication module
//!
//! This module provides authentication functionality including:
//! - Student registration and login
//! - JWT token generation and validation
//! - Password hashing and verification
//! - Authentication middleware

pub mod gateway;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use gateway::{AuthGateway, LoginOutcome};
pub use handlers::{add_address, get_my_profile, login, register, update_my_profile};
pub use jwt::{Claims, IssuedToken, TokenIssuer};
pub use middleware::{authenticate, CurrentAccount};
pub use password::PasswordHasher;
