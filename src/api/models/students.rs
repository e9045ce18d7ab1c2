use crate::db::models::{Student, Teacher};
use serde::{Deserialize, Serialize};

/// Query parameters for GET /students
#[derive(Debug, Default, Deserialize)]
pub struct StudentsQuery {
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
}

/// Public view of a teacher
#[derive(Debug, Clone, Serialize)]
pub struct TeacherSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub subject: String,
}

impl From<&Teacher> for TeacherSummary {
    fn from(teacher: &Teacher) -> Self {
        Self {
            id: teacher.id.clone(),
            username: teacher.username.clone(),
            name: teacher.name.clone(),
            email: teacher.email.clone(),
            subject: teacher.subject.clone(),
        }
    }
}

/// A student with the assigned teacher resolved, if any
#[derive(Debug, Serialize)]
pub struct StudentWithTeacher {
    #[serde(flatten)]
    pub student: Student,
    pub teacher: Option<TeacherSummary>,
}

#[derive(Debug, Serialize)]
pub struct TeacherWithStudents {
    pub teacher: TeacherSummary,
    pub assigned_students: Vec<Student>,
}
