use super::AppState;
use crate::api::models::TeacherSummary;
use crate::auth::CurrentAccount;
use crate::core::error::Result;
use crate::db::repository::Repository;
use axum::{extract::State, Json};

/// Handler for GET /teachers - any authenticated account
pub async fn list_teachers(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<Vec<TeacherSummary>>> {
    tracing::info!(username = %current.account().username(), "Listing teachers");

    let teachers = state.teachers.find_all().await?;
    Ok(Json(teachers.iter().map(TeacherSummary::from).collect()))
}
