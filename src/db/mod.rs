//! Database module
//!
//! This module provides database management functionality including:
//! - Database connection pool management
//! - A JSON document collection layer
//! - Repository implementations for accounts
//! - Database migrations

pub mod manager;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod store;

pub use manager::DatabaseManager;
pub use models::{Account, Address, Credential, Role, Student, Teacher};
pub use repository::{
    Repository, StudentChanges, StudentRepository, TeacherChanges, TeacherRepository,
};
pub use store::{DocumentStore, Filter, Update, UpdateResult};
