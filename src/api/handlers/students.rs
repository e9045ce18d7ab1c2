use super::AppState;
use crate::api::models::{StudentWithTeacher, StudentsQuery, TeacherSummary, TeacherWithStudents};
use crate::auth::CurrentAccount;
use crate::core::error::{RegistryError, Result};
use crate::db::models::Student;
use crate::db::repository::Repository;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Handler for GET /students - teachers only
///
/// With `min_age` or `max_age` only students of known age inside the
/// inclusive range are returned, youngest first.
pub async fn list_students(
    State(state): State<AppState>,
    current: CurrentAccount,
    Query(query): Query<StudentsQuery>,
) -> Result<Json<Vec<Student>>> {
    let teacher = current.require_teacher()?;

    let students = match (query.min_age, query.max_age) {
        (None, None) => state.students.find_all().await?,
        (Some(min), Some(max)) if min > max => {
            return Err(RegistryError::ValidationError(
                "min_age cannot exceed max_age".to_string(),
            ))
        }
        (min, max) => state.students.find_by_age_range(min, max).await?,
    };

    tracing::info!(
        teacher = %teacher.username,
        count = students.len(),
        "Listed students"
    );
    Ok(Json(students))
}

/// Handler for GET /students/:username - teachers only
pub async fn get_student(
    State(state): State<AppState>,
    current: CurrentAccount,
    Path(username): Path<String>,
) -> Result<Json<Student>> {
    current.require_teacher()?;

    state
        .students
        .find_by_username(&username)
        .await?
        .map(Json)
        .ok_or_else(|| RegistryError::NotFound(format!("Student {} not found", username)))
}

/// Handler for GET /students_with_teachers - teachers only
pub async fn students_with_teachers(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<Vec<StudentWithTeacher>>> {
    current.require_teacher()?;

    let students = state.students.find_all().await?;
    let teacher_ids: Vec<String> = students
        .iter()
        .filter_map(|s| s.teacher_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let teachers: HashMap<String, TeacherSummary> = state
        .teachers
        .find_by_ids(&teacher_ids)
        .await?
        .iter()
        .map(|t| (t.id.clone(), TeacherSummary::from(t)))
        .collect();

    let result = students
        .into_iter()
        .map(|student| {
            let teacher = student
                .teacher_id
                .as_ref()
                .and_then(|id| teachers.get(id))
                .cloned();
            StudentWithTeacher { student, teacher }
        })
        .collect();

    Ok(Json(result))
}

/// Handler for GET /students_by_teacher/:teacher_id - teachers only
pub async fn students_by_teacher(
    State(state): State<AppState>,
    current: CurrentAccount,
    Path(teacher_id): Path<String>,
) -> Result<Json<TeacherWithStudents>> {
    current.require_teacher()?;

    if Uuid::parse_str(&teacher_id).is_err() {
        return Err(RegistryError::ValidationError(
            "Invalid teacher ID format".to_string(),
        ));
    }

    let teacher = state
        .teachers
        .find_by_id(&teacher_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound("Teacher not found".to_string()))?;

    let assigned_students = state.students.find_by_teacher(&teacher.id).await?;

    Ok(Json(TeacherWithStudents {
        teacher: TeacherSummary::from(&teacher),
        assigned_students,
    }))
}
