use crate::auth::models::{validate_email, validate_username};
use crate::core::error::{RegistryError, Result};
use crate::db::models::Role;
use serde::{Deserialize, Serialize};

/// Admin request to create a student with a generated password
#[derive(Debug, Deserialize)]
pub struct AddStudentRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub age: Option<u32>,
    pub year: Option<String>,
    pub teacher_id: Option<String>,
}

impl AddStudentRequest {
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)
    }
}

/// Admin request to create a teacher with a generated password
#[derive(Debug, Deserialize)]
pub struct AddTeacherRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub subject: String,
}

impl AddTeacherRequest {
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        if self.name.trim().is_empty() || self.subject.trim().is_empty() {
            return Err(RegistryError::ValidationError(
                "name and subject are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedAccountResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkAssignRequest {
    pub student_usernames: Vec<String>,
    pub teacher_email: String,
}

#[derive(Debug, Serialize)]
pub struct BulkAssignResponse {
    pub matched: u64,
    pub modified: u64,
    pub message: String,
}

/// Admin partial update of a student; the username is immutable
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminUpdateStudentRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub year: Option<String>,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub students: u64,
    pub teachers: u64,
    pub unassigned_students: u64,
}
