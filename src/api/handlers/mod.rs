pub mod admin;
pub mod students;
pub mod system;
pub mod teachers;

pub use admin::*;
pub use students::*;
pub use system::*;
pub use teachers::*;

use crate::auth::AuthGateway;
use crate::core::config::Config;
use crate::db::repository::{StudentRepository, TeacherRepository};
use crate::mail::Mailer;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub students: Arc<StudentRepository>,
    pub teachers: Arc<TeacherRepository>,
    pub gateway: Arc<AuthGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}
