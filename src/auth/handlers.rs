//! Authentication and profile API handlers

use crate::api::handlers::AppState;
use crate::api::models::ApiJson;
use crate::auth::middleware::CurrentAccount;
use crate::auth::models::{
    validate_email, LoginRequest, MessageResponse, RegisterRequest, TokenResponse,
    UpdateProfileRequest,
};
use crate::core::error::{RegistryError, Result};
use crate::db::models::{Account, Address, Credential, Student};
use crate::db::repository::{Repository, StudentChanges, TeacherChanges};
use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};

/// Handler for POST /register - Student self-registration
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!(username = %req.username, "Student registration attempt");
    req.validate()?;

    if state.students.username_exists(&req.username).await? {
        tracing::warn!(username = %req.username, "Registration for existing username");
        return Err(RegistryError::Conflict("Username already exists".to_string()));
    }

    let digest = state.gateway.hash_password(&req.password).await?;
    let student = Student {
        id: String::new(),
        username: req.username,
        credential: Credential::Hashed(digest),
        full_name: req.full_name,
        email: req.email,
        age: req.age,
        year: req.year,
        teacher_id: None,
        addresses: Vec::new(),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
    };
    let created = state.students.create(&student).await?;

    tracing::info!(id = %created.id, username = %created.username, "Student registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Student registered successfully")),
    ))
}

/// Login credentials from a JSON body or an urlencoded form
pub struct LoginPayload(pub LoginRequest);

#[async_trait]
impl<S> FromRequest<S> for LoginPayload
where
    S: Send + Sync,
{
    type Rejection = RegistryError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(login) = Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| RegistryError::ValidationError(e.body_text()))?;
            Ok(LoginPayload(login))
        } else {
            let ApiJson(login) = ApiJson::<LoginRequest>::from_request(req, state).await?;
            Ok(LoginPayload(login))
        }
    }
}

/// Handler for POST /login
pub async fn login(
    State(state): State<AppState>,
    LoginPayload(req): LoginPayload,
) -> Result<Json<TokenResponse>> {
    tracing::info!(username = %req.username, "Login attempt");

    let outcome = state
        .gateway
        .login(&req.username, &req.password, req.role)
        .await?;

    Ok(Json(TokenResponse {
        access_token: outcome.token.token,
        token_type: "bearer".to_string(),
        expires_in: outcome.token.expires_in,
        role: outcome.account.role(),
    }))
}

/// Handler for GET /my_profile
pub async fn get_my_profile(current: CurrentAccount) -> Json<Account> {
    tracing::info!(username = %current.account().username(), "Getting own profile");
    Json(current.0)
}

fn reject_fields(fields: &[(&str, bool)], role: &str) -> Result<()> {
    let present: Vec<&str> = fields
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| *name)
        .collect();
    if present.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::ValidationError(format!(
            "Fields not valid for a {} profile: {}",
            role,
            present.join(", ")
        )))
    }
}

/// Handler for PATCH /my_profile
pub async fn update_my_profile(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<Account>> {
    let account = current.account();
    tracing::info!(username = %account.username(), "Updating own profile");

    if let Some(email) = &req.email {
        validate_email(email)?;
    }

    let result = match account {
        Account::Student(student) => {
            reject_fields(
                &[("name", req.name.is_some()), ("subject", req.subject.is_some())],
                "student",
            )?;
            let mut changes = StudentChanges {
                full_name: req.full_name,
                email: req.email,
                age: req.age,
                year: req.year,
                teacher_id: None,
                password_hash: None,
            };
            // Hash first; a rejected password must leave the profile untouched
            if let Some(password) = &req.password {
                changes.password_hash = Some(state.gateway.digest_new_password(password).await?);
            }
            state.students.update_profile(&student.username, &changes).await?
        }
        Account::Teacher(teacher) => {
            reject_fields(
                &[
                    ("full_name", req.full_name.is_some()),
                    ("age", req.age.is_some()),
                    ("year", req.year.is_some()),
                ],
                "teacher",
            )?;
            if let Some(email) = &req.email {
                if let Some(other) = state.teachers.find_by_email(email).await? {
                    if other.id != teacher.id {
                        return Err(RegistryError::Conflict(
                            "Teacher with this email already exists".to_string(),
                        ));
                    }
                }
            }
            let mut changes = TeacherChanges {
                name: req.name,
                email: req.email,
                subject: req.subject,
                password_hash: None,
            };
            if let Some(password) = &req.password {
                changes.password_hash = Some(state.gateway.digest_new_password(password).await?);
            }
            state.teachers.update_profile(&teacher.username, &changes).await?
        }
    };

    if result.matched == 0 {
        return Err(RegistryError::NotFound("Account no longer exists".to_string()));
    }
    if req.password.is_some() {
        tracing::info!(username = %account.username(), "Password changed");
    }

    let updated = state
        .gateway
        .find_account(account.role(), account.username())
        .await?
        .ok_or_else(|| RegistryError::NotFound("Account no longer exists".to_string()))?;

    tracing::info!(username = %updated.username(), "Profile updated");
    Ok(Json(updated))
}

/// Handler for POST /my_profile/addresses
pub async fn add_address(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(address): ApiJson<Address>,
) -> Result<impl IntoResponse> {
    let student = current.require_student()?;

    if [&address.street, &address.city, &address.country]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(RegistryError::ValidationError(
            "street, city and country are required".to_string(),
        ));
    }

    let result = state.students.add_address(&student.username, &address).await?;
    if result.matched == 0 {
        return Err(RegistryError::NotFound("Student not found".to_string()));
    }

    let student = state
        .students
        .find_by_id(&student.id)
        .await?
        .ok_or_else(|| RegistryError::NotFound("Student not found".to_string()))?;

    let status = if result.modified > 0 {
        tracing::info!(username = %student.username, city = %address.city, "Address added");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(student.addresses)))
}
