//! Repository pattern implementation for data access layer
//!
//! Repositories own the mapping between typed accounts and the JSON
//! documents in the store. Uniqueness checks live here, not in the store.

use crate::core::error::{RegistryError, Result};
use crate::db::models::{
    Address, Student, StudentDocument, Teacher, TeacherDocument, STUDENTS, TEACHERS,
};
use crate::db::store::{Document, DocumentStore, Filter, StoredDocument, Update, UpdateResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Find all entities
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Persist a new entity, returning it with its assigned ID
    async fn create(&self, entity: &T) -> Result<T>;

    /// Delete an entity by its ID, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;
}

fn decode<D: DeserializeOwned>(collection: &str, doc: StoredDocument) -> Result<(String, D)> {
    let StoredDocument { id, body } = doc;
    serde_json::from_value(Value::Object(body))
        .map(|record| (id.clone(), record))
        .map_err(|e| RegistryError::InvalidDocument(format!("{}/{}: {}", collection, id, e)))
}

fn encode<D: Serialize>(record: &D) -> Result<Document> {
    match serde_json::to_value(record) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(_) => Err(RegistryError::InvalidDocument(
            "record did not encode to an object".to_string(),
        )),
        Err(e) => Err(RegistryError::InvalidDocument(e.to_string())),
    }
}

/// Update replacing a legacy plaintext password with its hash
fn password_update(hash: &str) -> Update {
    with_password(Update::new(), Some(hash))
}

fn with_password(update: Update, hash: Option<&str>) -> Update {
    match hash {
        Some(hash) => update.set("hashed_password", hash).unset("password"),
        None => update,
    }
}

/// Student profile fields that may be changed after creation
#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub year: Option<String>,
    pub teacher_id: Option<String>,
    /// New bcrypt digest, written together with the profile fields
    pub password_hash: Option<String>,
}

impl StudentChanges {
    fn to_update(&self) -> Update {
        let mut update = Update::new();
        if let Some(full_name) = &self.full_name {
            update = update.set("full_name", full_name.as_str());
        }
        if let Some(email) = &self.email {
            update = update.set("email", email.as_str());
        }
        if let Some(age) = self.age {
            update = update.set("age", age);
        }
        if let Some(year) = &self.year {
            update = update.set("year", year.as_str());
        }
        if let Some(teacher_id) = &self.teacher_id {
            update = update.set("teacher_id", teacher_id.as_str());
        }
        with_password(update, self.password_hash.as_deref())
    }
}

/// Teacher profile fields that may be changed after creation
#[derive(Debug, Clone, Default)]
pub struct TeacherChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub password_hash: Option<String>,
}

impl TeacherChanges {
    fn to_update(&self) -> Update {
        let mut update = Update::new();
        if let Some(name) = &self.name {
            update = update.set("name", name.as_str());
        }
        if let Some(email) = &self.email {
            update = update.set("email", email.as_str());
        }
        if let Some(subject) = &self.subject {
            update = update.set("subject", subject.as_str());
        }
        with_password(update, self.password_hash.as_deref())
    }
}

/// Repository for the `students` collection
#[derive(Clone)]
pub struct StudentRepository {
    store: DocumentStore,
}

impl StudentRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    fn to_student(doc: StoredDocument) -> Result<Student> {
        let (id, record) = decode::<StudentDocument>(STUDENTS, doc)?;
        Ok(record.into_student(id))
    }

    async fn find_many(&self, filter: &Filter, sort_field: Option<&str>) -> Result<Vec<Student>> {
        self.store
            .find_sorted(STUDENTS, filter, sort_field)
            .await?
            .into_iter()
            .map(Self::to_student)
            .collect()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Student>> {
        self.store
            .find_one(STUDENTS, &Filter::eq("username", username))
            .await?
            .map(Self::to_student)
            .transpose()
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .store
            .count(STUDENTS, &Filter::eq("username", username))
            .await?
            > 0)
    }

    /// Students whose age lies in the inclusive range, youngest first
    pub async fn find_by_age_range(
        &self,
        min_age: Option<u32>,
        max_age: Option<u32>,
    ) -> Result<Vec<Student>> {
        let filter = Filter::range("age", min_age.map(|a| json!(a)), max_age.map(|a| json!(a)));
        self.find_many(&filter, Some("age")).await
    }

    pub async fn find_by_teacher(&self, teacher_id: &str) -> Result<Vec<Student>> {
        self.find_many(&Filter::eq("teacher_id", teacher_id), None).await
    }

    /// Point every listed student at the given teacher
    pub async fn assign_teacher(&self, usernames: &[String], teacher_id: &str) -> Result<UpdateResult> {
        self.store
            .update_many(
                STUDENTS,
                &Filter::any_of("username", usernames.iter().cloned()),
                &Update::new().set("teacher_id", teacher_id),
            )
            .await
    }

    /// Clear the teacher reference on every student assigned to `teacher_id`
    pub async fn unassign_teacher(&self, teacher_id: &str) -> Result<UpdateResult> {
        self.store
            .update_many(
                STUDENTS,
                &Filter::eq("teacher_id", teacher_id),
                &Update::new().unset("teacher_id"),
            )
            .await
    }

    /// Students without an assigned teacher
    pub async fn count_unassigned(&self) -> Result<u64> {
        self.store
            .count(STUDENTS, &Filter::eq("teacher_id", Value::Null))
            .await
    }

    /// Add an address unless an identical one is already recorded
    pub async fn add_address(&self, username: &str, address: &Address) -> Result<UpdateResult> {
        let address = serde_json::to_value(address)
            .map_err(|e| RegistryError::InvalidDocument(e.to_string()))?;
        self.store
            .update_one(
                STUDENTS,
                &Filter::eq("username", username),
                &Update::new().add_to_set("addresses", address),
            )
            .await
    }

    /// Store a new password hash, dropping any legacy plaintext
    pub async fn set_password_hash(&self, username: &str, hash: &str) -> Result<UpdateResult> {
        self.store
            .update_one(STUDENTS, &Filter::eq("username", username), &password_update(hash))
            .await
    }

    pub async fn update_profile(&self, username: &str, changes: &StudentChanges) -> Result<UpdateResult> {
        let update = changes.to_update();
        if update.is_empty() {
            return Err(RegistryError::ValidationError("No fields to update".to_string()));
        }
        self.store
            .update_one(STUDENTS, &Filter::eq("username", username), &update)
            .await
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<bool> {
        Ok(self
            .store
            .delete_one(STUDENTS, &Filter::eq("username", username))
            .await?
            > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(STUDENTS, &Filter::All).await
    }
}

#[async_trait]
impl Repository<Student> for StudentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Student>> {
        self.store
            .find_one(STUDENTS, &Filter::id(id))
            .await?
            .map(Self::to_student)
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Student>> {
        self.find_many(&Filter::All, None).await
    }

    async fn create(&self, student: &Student) -> Result<Student> {
        let body = encode(&StudentDocument::from(student))?;
        let id = self.store.insert_one(STUDENTS, body).await?;
        tracing::debug!(id = %id, username = %student.username, "Student stored");
        Ok(Student {
            id,
            ..student.clone()
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete_one(STUDENTS, &Filter::id(id)).await? > 0)
    }
}

/// Repository for the `teachers` collection
#[derive(Clone)]
pub struct TeacherRepository {
    store: DocumentStore,
}

impl TeacherRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    fn to_teacher(doc: StoredDocument) -> Result<Teacher> {
        let (id, record) = decode::<TeacherDocument>(TEACHERS, doc)?;
        Ok(record.into_teacher(id))
    }

    async fn find_first(&self, filter: &Filter) -> Result<Option<Teacher>> {
        self.store
            .find_one(TEACHERS, filter)
            .await?
            .map(Self::to_teacher)
            .transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Teacher>> {
        self.find_first(&Filter::eq("username", username)).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        self.find_first(&Filter::eq("email", email)).await
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Teacher>> {
        self.store
            .find(TEACHERS, &Filter::any_of(crate::db::store::ID_FIELD, ids.iter().cloned()))
            .await?
            .into_iter()
            .map(Self::to_teacher)
            .collect()
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .store
            .count(TEACHERS, &Filter::eq("username", username))
            .await?
            > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.store.count(TEACHERS, &Filter::eq("email", email)).await? > 0)
    }

    /// Store a new password hash, dropping any legacy plaintext
    pub async fn set_password_hash(&self, username: &str, hash: &str) -> Result<UpdateResult> {
        self.store
            .update_one(TEACHERS, &Filter::eq("username", username), &password_update(hash))
            .await
    }

    pub async fn update_profile(&self, username: &str, changes: &TeacherChanges) -> Result<UpdateResult> {
        let update = changes.to_update();
        if update.is_empty() {
            return Err(RegistryError::ValidationError("No fields to update".to_string()));
        }
        self.store
            .update_one(TEACHERS, &Filter::eq("username", username), &update)
            .await
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<bool> {
        Ok(self
            .store
            .delete_one(TEACHERS, &Filter::eq("username", username))
            .await?
            > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(TEACHERS, &Filter::All).await
    }
}

#[async_trait]
impl Repository<Teacher> for TeacherRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Teacher>> {
        self.find_first(&Filter::id(id)).await
    }

    async fn find_all(&self) -> Result<Vec<Teacher>> {
        self.store
            .find(TEACHERS, &Filter::All)
            .await?
            .into_iter()
            .map(Self::to_teacher)
            .collect()
    }

    async fn create(&self, teacher: &Teacher) -> Result<Teacher> {
        let body = encode(&TeacherDocument::from(teacher))?;
        let id = self.store.insert_one(TEACHERS, body).await?;
        tracing::debug!(id = %id, username = %teacher.username, "Teacher stored");
        Ok(Teacher {
            id,
            ..teacher.clone()
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete_one(TEACHERS, &Filter::id(id)).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::manager::DatabaseManager;
    use crate::db::models::Credential;
    use std::sync::Arc;

    fn store() -> DocumentStore {
        DocumentStore::new(Arc::new(DatabaseManager::new_in_memory().unwrap()))
    }

    fn student(username: &str, age: Option<u32>) -> Student {
        Student {
            id: String::new(),
            username: username.to_string(),
            credential: Credential::Hashed("$2b$04$hash".to_string()),
            full_name: None,
            email: format!("{}@example.com", username),
            age,
            year: None,
            teacher_id: None,
            addresses: Vec::new(),
            created_at: None,
        }
    }

    fn teacher(username: &str, email: &str) -> Teacher {
        Teacher {
            id: String::new(),
            username: username.to_string(),
            credential: Credential::Hashed("$2b$04$hash".to_string()),
            name: "Mr Adewale".to_string(),
            email: email.to_string(),
            subject: "Physics".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_student() {
        let repo = StudentRepository::new(store());
        let created = repo.create(&student("ayo", Some(12))).await.unwrap();
        assert!(!created.id.is_empty());

        let by_name = repo.find_by_username("ayo").await.unwrap().unwrap();
        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_name, created);
        assert_eq!(by_id, created);
        assert!(repo.username_exists("ayo").await.unwrap());
        assert!(!repo.username_exists("tim").await.unwrap());
    }

    #[tokio::test]
    async fn test_age_range_sorted() {
        let repo = StudentRepository::new(store());
        for (name, age) in [("jasse", 67), ("ayo", 12), ("tim", 23), ("joshua", 45)] {
            repo.create(&student(name, Some(age))).await.unwrap();
        }
        repo.create(&student("ageless", None)).await.unwrap();

        let found = repo.find_by_age_range(Some(20), Some(90)).await.unwrap();
        let names: Vec<_> = found.iter().map(|s| s.username.as_str()).collect();
        assert_eq!(names, vec!["tim", "joshua", "jasse"]);
    }

    #[tokio::test]
    async fn test_assign_teacher_and_find_by_teacher() {
        let store = store();
        let students = StudentRepository::new(store.clone());
        let teachers = TeacherRepository::new(store);
        let t = teachers.create(&teacher("mr_a", "a@school.test")).await.unwrap();
        for name in ["a", "b", "c"] {
            students.create(&student(name, None)).await.unwrap();
        }

        let result = students
            .assign_teacher(&["a".to_string(), "c".to_string(), "ghost".to_string()], &t.id)
            .await
            .unwrap();
        assert_eq!(result.matched, 2);

        let assigned = students.find_by_teacher(&t.id).await.unwrap();
        assert_eq!(assigned.len(), 2);
        assert!(assigned.iter().all(|s| s.teacher_id.as_deref() == Some(t.id.as_str())));
        assert_eq!(students.count_unassigned().await.unwrap(), 1);

        let cleared = students.unassign_teacher(&t.id).await.unwrap();
        assert_eq!(cleared.modified, 2);
        assert_eq!(students.count_unassigned().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_legacy_password_migration() {
        let repo = StudentRepository::new(store());
        let mut legacy = student("old", None);
        legacy.credential = Credential::LegacyPlaintext("secret".to_string());
        repo.create(&legacy).await.unwrap();

        let result = repo.set_password_hash("old", "$2b$04$new").await.unwrap();
        assert_eq!(result.modified, 1);

        let migrated = repo.find_by_username("old").await.unwrap().unwrap();
        assert_eq!(migrated.credential, Credential::Hashed("$2b$04$new".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_document_is_reported() {
        let store = store();
        let mut body = Document::new();
        body.insert("username".to_string(), json!("broken"));
        store.insert_one(STUDENTS, body).await.unwrap();

        let repo = StudentRepository::new(store);
        let result = repo.find_by_username("broken").await;
        assert!(matches!(result, Err(RegistryError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_teacher_lookup_by_email_and_delete() {
        let repo = TeacherRepository::new(store());
        repo.create(&teacher("mrs_k", "k@school.test")).await.unwrap();

        assert!(repo.email_exists("k@school.test").await.unwrap());
        assert_eq!(
            repo.find_by_email("k@school.test").await.unwrap().unwrap().username,
            "mrs_k"
        );
        assert!(repo.delete_by_username("mrs_k").await.unwrap());
        assert!(!repo.delete_by_username("mrs_k").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_profile_update_rejected() {
        let repo = StudentRepository::new(store());
        repo.create(&student("ayo", None)).await.unwrap();

        let result = repo.update_profile("ayo", &StudentChanges::default()).await;
        assert!(matches!(result, Err(RegistryError::ValidationError(_))));

        let changes = StudentChanges {
            year: Some("SS2".to_string()),
            ..Default::default()
        };
        repo.update_profile("ayo", &changes).await.unwrap();
        let updated = repo.find_by_username("ayo").await.unwrap().unwrap();
        assert_eq!(updated.year.as_deref(), Some("SS2"));
    }

    #[tokio::test]
    async fn test_profile_update_carries_password_hash() {
        let repo = StudentRepository::new(store());
        repo.create(&student("ayo", None)).await.unwrap();

        let changes = StudentChanges {
            age: Some(14),
            password_hash: Some("$2b$04$fresh".to_string()),
            ..Default::default()
        };
        let result = repo.update_profile("ayo", &changes).await.unwrap();
        assert_eq!(result.modified, 1);

        let updated = repo.find_by_username("ayo").await.unwrap().unwrap();
        assert_eq!(updated.age, Some(14));
        assert_eq!(updated.credential, Credential::Hashed("$2b$04$fresh".to_string()));
    }
}
