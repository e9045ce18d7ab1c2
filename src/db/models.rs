//! Database models
//!
//! Typed records for the `students` and `teachers` collections. Stored
//! documents are decoded into these at the repository boundary.

use crate::core::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STUDENTS: &str = "students";
pub const TEACHERS: &str = "teachers";

/// Account role, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    /// Collection holding accounts of this role
    pub fn collection(&self) -> &'static str {
        match self {
            Role::Student => STUDENTS,
            Role::Teacher => TEACHERS,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(RegistryError::ValidationError(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}

/// How an account's password is currently stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Hashed(String),
    /// Plaintext written by older deployments, replaced on first login
    LegacyPlaintext(String),
    Missing,
}

impl Credential {
    fn from_fields(hashed_password: Option<String>, password: Option<String>) -> Self {
        match (hashed_password, password) {
            (Some(hash), _) => Credential::Hashed(hash),
            (None, Some(plain)) => Credential::LegacyPlaintext(plain),
            (None, None) => Credential::Missing,
        }
    }

    fn into_fields(self) -> (Option<String>, Option<String>) {
        match self {
            Credential::Hashed(hash) => (Some(hash), None),
            Credential::LegacyPlaintext(plain) => (None, Some(plain)),
            Credential::Missing => (None, None),
        }
    }
}

/// Postal address attached to a student, compared as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

/// Student account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: String,
    pub username: String,
    #[serde(skip)]
    pub credential: Credential,
    pub full_name: Option<String>,
    pub email: String,
    pub age: Option<u32>,
    pub year: Option<String>,
    pub teacher_id: Option<String>,
    pub addresses: Vec<Address>,
    pub created_at: Option<String>,
}

/// Teacher account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Teacher {
    pub id: String,
    pub username: String,
    #[serde(skip)]
    pub credential: Credential,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub created_at: Option<String>,
}

/// An authenticated principal of either role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Account {
    Student(Student),
    Teacher(Teacher),
}

impl Account {
    pub fn role(&self) -> Role {
        match self {
            Account::Student(_) => Role::Student,
            Account::Teacher(_) => Role::Teacher,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Account::Student(s) => &s.id,
            Account::Teacher(t) => &t.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Account::Student(s) => &s.username,
            Account::Teacher(t) => &t.username,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Account::Student(s) => &s.email,
            Account::Teacher(t) => &t.email,
        }
    }

    pub fn credential(&self) -> &Credential {
        match self {
            Account::Student(s) => &s.credential,
            Account::Teacher(t) => &t.credential,
        }
    }

    pub fn set_credential(&mut self, credential: Credential) {
        match self {
            Account::Student(s) => s.credential = credential,
            Account::Teacher(t) => t.credential = credential,
        }
    }
}

/// Stored shape of a student document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StudentDocument {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl StudentDocument {
    pub fn into_student(self, id: String) -> Student {
        Student {
            id,
            username: self.username,
            credential: Credential::from_fields(self.hashed_password, self.password),
            full_name: self.full_name,
            email: self.email,
            age: self.age,
            year: self.year,
            teacher_id: self.teacher_id,
            addresses: self.addresses,
            created_at: self.created_at,
        }
    }
}

impl From<&Student> for StudentDocument {
    fn from(student: &Student) -> Self {
        let (hashed_password, password) = student.credential.clone().into_fields();
        Self {
            username: student.username.clone(),
            hashed_password,
            password,
            full_name: student.full_name.clone(),
            email: student.email.clone(),
            age: student.age,
            year: student.year.clone(),
            teacher_id: student.teacher_id.clone(),
            addresses: student.addresses.clone(),
            created_at: student.created_at.clone(),
        }
    }
}

/// Stored shape of a teacher document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TeacherDocument {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
    pub email: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TeacherDocument {
    pub fn into_teacher(self, id: String) -> Teacher {
        Teacher {
            id,
            username: self.username,
            credential: Credential::from_fields(self.hashed_password, self.password),
            name: self.name,
            email: self.email,
            subject: self.subject,
            created_at: self.created_at,
        }
    }
}

impl From<&Teacher> for TeacherDocument {
    fn from(teacher: &Teacher) -> Self {
        let (hashed_password, password) = teacher.credential.clone().into_fields();
        Self {
            username: teacher.username.clone(),
            hashed_password,
            password,
            name: teacher.name.clone(),
            email: teacher.email.clone(),
            subject: teacher.subject.clone(),
            created_at: teacher.created_at.clone(),
        }
    }
}
