use super::AppState;
use crate::api::models::{
    AddStudentRequest, AddTeacherRequest, AdminUpdateStudentRequest, ApiJson, BulkAssignRequest,
    BulkAssignResponse, CreatedAccountResponse, StatsResponse,
};
use crate::auth::models::{validate_email, MessageResponse};
use crate::core::error::{RegistryError, Result};
use crate::db::models::{Credential, Role, Student, Teacher};
use crate::db::repository::{Repository, StudentChanges};
use crate::mail::credentials_message;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rand::distributions::Alphanumeric;
use rand::Rng;

const GENERATED_PASSWORD_LEN: usize = 12;

/// Random alphanumeric password for admin-created accounts
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Mail the generated credentials; the account is already stored either way
async fn send_credentials(
    state: &AppState,
    to: &str,
    display_name: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    let (subject, body) = credentials_message(display_name, username, password);
    state.mailer.send(to, &subject, &body).await.map_err(|e| {
        tracing::warn!(
            username = %username,
            error = %e,
            "Account stored but credentials email failed"
        );
        match e {
            RegistryError::DependencyError(_) => e,
            other => RegistryError::DependencyError(other.to_string()),
        }
    })
}

/// Handler for POST /admin/add_student
pub async fn add_student(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddStudentRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!(username = %req.username, "Admin adding student");
    req.validate()?;

    if state.students.username_exists(&req.username).await? {
        return Err(RegistryError::Conflict("Username already exists".to_string()));
    }
    if let Some(teacher_id) = &req.teacher_id {
        if state.teachers.find_by_id(teacher_id).await?.is_none() {
            return Err(RegistryError::NotFound("Teacher not found".to_string()));
        }
    }

    let password = generate_password();
    let digest = state.gateway.hash_password(&password).await?;
    let student = state
        .students
        .create(&Student {
            id: String::new(),
            username: req.username,
            credential: Credential::Hashed(digest),
            full_name: req.full_name,
            email: req.email,
            age: req.age,
            year: req.year,
            teacher_id: req.teacher_id,
            addresses: Vec::new(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        })
        .await?;

    let display_name = student.full_name.as_deref().unwrap_or(&student.username);
    send_credentials(&state, &student.email, display_name, &student.username, &password).await?;

    tracing::info!(id = %student.id, username = %student.username, "Student added");
    Ok((
        StatusCode::CREATED,
        Json(CreatedAccountResponse {
            id: student.id,
            username: student.username,
            role: Role::Student,
            message: "Student added; credentials sent by email".to_string(),
        }),
    ))
}

/// Handler for POST /admin/add_teacher
pub async fn add_teacher(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddTeacherRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!(username = %req.username, "Admin adding teacher");
    req.validate()?;

    if state.teachers.username_exists(&req.username).await? {
        return Err(RegistryError::Conflict("Username already exists".to_string()));
    }
    if state.teachers.email_exists(&req.email).await? {
        return Err(RegistryError::Conflict(
            "Teacher with this email already exists".to_string(),
        ));
    }

    let password = generate_password();
    let digest = state.gateway.hash_password(&password).await?;
    let teacher = state
        .teachers
        .create(&Teacher {
            id: String::new(),
            username: req.username,
            credential: Credential::Hashed(digest),
            name: req.name,
            email: req.email,
            subject: req.subject,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        })
        .await?;

    send_credentials(&state, &teacher.email, &teacher.name, &teacher.username, &password).await?;

    tracing::info!(id = %teacher.id, username = %teacher.username, "Teacher added");
    Ok((
        StatusCode::CREATED,
        Json(CreatedAccountResponse {
            id: teacher.id,
            username: teacher.username,
            role: Role::Teacher,
            message: "Teacher added; credentials sent by email".to_string(),
        }),
    ))
}

/// Handler for POST /admin/assign_teacher_bulk
pub async fn assign_teacher_bulk(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BulkAssignRequest>,
) -> Result<Json<BulkAssignResponse>> {
    if req.student_usernames.is_empty() {
        return Err(RegistryError::ValidationError(
            "student_usernames cannot be empty".to_string(),
        ));
    }

    let teacher = state
        .teachers
        .find_by_email(&req.teacher_email)
        .await?
        .ok_or_else(|| RegistryError::NotFound("Teacher not found".to_string()))?;

    let result = state
        .students
        .assign_teacher(&req.student_usernames, &teacher.id)
        .await?;

    if result.matched == 0 {
        return Err(RegistryError::NotFound(
            "No students found with provided usernames".to_string(),
        ));
    }

    tracing::info!(
        teacher = %teacher.username,
        matched = result.matched,
        modified = result.modified,
        "Bulk teacher assignment"
    );

    Ok(Json(BulkAssignResponse {
        matched: result.matched,
        modified: result.modified,
        message: format!("Teacher {} assigned to {} students", teacher.name, result.modified),
    }))
}

/// Handler for PATCH /admin/students/:username
pub async fn update_student(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ApiJson(req): ApiJson<AdminUpdateStudentRequest>,
) -> Result<Json<Student>> {
    if let Some(email) = &req.email {
        validate_email(email)?;
    }
    if let Some(teacher_id) = &req.teacher_id {
        if state.teachers.find_by_id(teacher_id).await?.is_none() {
            return Err(RegistryError::NotFound("Teacher not found".to_string()));
        }
    }

    let changes = StudentChanges {
        full_name: req.full_name,
        email: req.email,
        age: req.age,
        year: req.year,
        teacher_id: req.teacher_id,
        password_hash: None,
    };
    let result = state.students.update_profile(&username, &changes).await?;
    if result.matched == 0 {
        return Err(RegistryError::NotFound(format!("Student {} not found", username)));
    }

    tracing::info!(username = %username, modified = result.modified, "Admin updated student");

    state
        .students
        .find_by_username(&username)
        .await?
        .map(Json)
        .ok_or_else(|| RegistryError::NotFound(format!("Student {} not found", username)))
}

/// Handler for DELETE /admin/students/:username
pub async fn delete_student(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.students.delete_by_username(&username).await? {
        return Err(RegistryError::NotFound(format!("Student {} not found", username)));
    }

    tracing::info!(username = %username, "Student deleted");
    Ok(Json(MessageResponse::new(format!("Student {} deleted", username))))
}

/// Handler for DELETE /admin/teachers/:username
///
/// Students assigned to the teacher are left unassigned.
pub async fn delete_teacher(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>> {
    let teacher = state
        .teachers
        .find_by_username(&username)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("Teacher {} not found", username)))?;

    state.teachers.delete(&teacher.id).await?;
    let cleared = state.students.unassign_teacher(&teacher.id).await?;

    tracing::info!(
        username = %username,
        unassigned_students = cleared.modified,
        "Teacher deleted"
    );
    Ok(Json(MessageResponse::new(format!("Teacher {} deleted", username))))
}

/// Handler for GET /admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    Ok(Json(StatsResponse {
        students: state.students.count().await?,
        teachers: state.teachers.count().await?,
        unassigned_students: state.students.count_unassigned().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_passwords() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.len(), GENERATED_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
