//! JSON document collections on top of SQLite
//!
//! The credential store contract is document shaped: find by field,
//! insert one, update one/many, delete one, count. Documents are JSON
//! objects kept in the `documents` table and matched with `json_extract`.
//! Uniqueness is the caller's job; nothing here enforces it.

use crate::core::error::{RegistryError, Result};
use crate::db::manager::DatabaseManager;
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Body of a stored document
pub type Document = Map<String, Value>;

/// Pseudo-field addressing the document id rather than a body field
pub const ID_FIELD: &str = "_id";

lazy_static! {
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("field name pattern is valid");
}

/// A document together with its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: Document,
}

/// Query filter over document fields
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Inclusive bounds; a missing bound is open
    Range {
        field: String,
        min: Option<Value>,
        max: Option<Value>,
    },
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn id(id: &str) -> Self {
        Filter::Eq(ID_FIELD.to_string(), Value::String(id.to_string()))
    }

    pub fn any_of<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn range(field: &str, min: Option<Value>, max: Option<Value>) -> Self {
        Filter::Range {
            field: field.to_string(),
            min,
            max,
        }
    }

    fn write_sql(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> Result<()> {
        match self {
            Filter::All => sql.push_str("1 = 1"),
            Filter::Eq(field, value) => {
                push_field(field, sql, params)?;
                if value.is_null() {
                    sql.push_str(" IS NULL");
                } else {
                    sql.push_str(" = ?");
                    params.push(to_sql_value(value));
                }
            }
            Filter::In(field, values) => {
                if values.is_empty() {
                    sql.push_str("0 = 1");
                    return Ok(());
                }
                push_field(field, sql, params)?;
                sql.push_str(" IN (");
                sql.push_str(&vec!["?"; values.len()].join(", "));
                sql.push(')');
                params.extend(values.iter().map(to_sql_value));
            }
            Filter::Range { field, min, max } => {
                push_field(field, sql, params)?;
                sql.push_str(" IS NOT NULL");
                if let Some(min) = min {
                    sql.push_str(" AND ");
                    push_field(field, sql, params)?;
                    sql.push_str(" >= ?");
                    params.push(to_sql_value(min));
                }
                if let Some(max) = max {
                    sql.push_str(" AND ");
                    push_field(field, sql, params)?;
                    sql.push_str(" <= ?");
                    params.push(to_sql_value(max));
                }
            }
            Filter::And(filters) => {
                if filters.is_empty() {
                    sql.push_str("1 = 1");
                    return Ok(());
                }
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" AND ");
                    }
                    sql.push('(');
                    filter.write_sql(sql, params)?;
                    sql.push(')');
                }
            }
        }
        Ok(())
    }
}

fn push_field(field: &str, sql: &mut String, params: &mut Vec<SqlValue>) -> Result<()> {
    if field == ID_FIELD {
        sql.push_str("id");
        return Ok(());
    }
    validate_field(field)?;
    sql.push_str("json_extract(body, ?)");
    params.push(SqlValue::Text(format!("$.{}", field)));
    Ok(())
}

fn validate_field(field: &str) -> Result<()> {
    if FIELD_NAME.is_match(field) {
        Ok(())
    } else {
        Err(RegistryError::ValidationError(format!(
            "Invalid document field name: {:?}",
            field
        )))
    }
}

/// Map a JSON value to what `json_extract` yields for it
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Top-level field modifications applied to matching documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
    unset: Vec<String>,
    add_to_set: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    /// Append to an array field unless an equal element is already present
    pub fn add_to_set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.add_to_set.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.add_to_set.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for field in self
            .set
            .keys()
            .chain(self.unset.iter())
            .chain(self.add_to_set.iter().map(|(f, _)| f))
        {
            if field == ID_FIELD {
                return Err(RegistryError::ValidationError(
                    "Document id cannot be modified".to_string(),
                ));
            }
            validate_field(field)?;
            if field.contains('.') {
                return Err(RegistryError::ValidationError(format!(
                    "Nested update path {:?} is not supported",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Returns whether the document changed
    fn apply(&self, body: &mut Document) -> Result<bool> {
        let mut modified = false;

        for (field, value) in &self.set {
            if body.get(field) != Some(value) {
                body.insert(field.clone(), value.clone());
                modified = true;
            }
        }

        for field in &self.unset {
            modified |= body.remove(field).is_some();
        }

        for (field, value) in &self.add_to_set {
            let entry = body
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let items = entry.as_array_mut().ok_or_else(|| {
                RegistryError::ValidationError(format!("Field {:?} is not an array", field))
            })?;
            if !items.contains(value) {
                items.push(value.clone());
                modified = true;
            }
        }

        Ok(modified)
    }
}

/// Outcome of an update operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// Collection-oriented access to the `documents` table
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<DatabaseManager>,
}

impl DocumentStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Insert a document and return its new id; a `_id` key in the body is ignored
    pub async fn insert_one(&self, collection: &str, mut body: Document) -> Result<String> {
        body.remove(ID_FIELD);
        let id = Uuid::new_v4().to_string();
        let collection = collection.to_string();
        let encoded = Value::Object(body).to_string();
        let doc_id = id.clone();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO documents (id, collection, body) VALUES (?, ?, ?)",
                    rusqlite::params![&doc_id, &collection, &encoded],
                )?;
                Ok(())
            })
            .await?;

        tracing::debug!(id = %id, "Document inserted");
        Ok(id)
    }

    pub async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<StoredDocument>> {
        let (sql, params) = select_sql("id, body", collection, filter, None, Some(1))?;

        self.db
            .execute(move |conn| {
                let row = conn
                    .query_row(&sql, params_from_iter(params), read_row)
                    .optional()?;
                row.map(decode).transpose()
            })
            .await
    }

    /// All matching documents in insertion order
    pub async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>> {
        self.find_sorted(collection, filter, None).await
    }

    /// All matching documents, ascending by `sort_field` when given
    pub async fn find_sorted(
        &self,
        collection: &str,
        filter: &Filter,
        sort_field: Option<&str>,
    ) -> Result<Vec<StoredDocument>> {
        let (sql, params) = select_sql("id, body", collection, filter, sort_field, None)?;

        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params), read_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.into_iter().map(decode).collect()
            })
            .await
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let (sql, params) = select_sql("COUNT(*)", collection, filter, None, None)?;

        self.db
            .execute(move |conn| {
                let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
    }

    /// Update the first matching document; atomic per document
    pub async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, Some(1)).await
    }

    pub async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, None).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        limit: Option<u32>,
    ) -> Result<UpdateResult> {
        update.validate()?;
        let (sql, params) = select_sql("id, body", collection, filter, None, limit)?;
        let update = update.clone();

        self.db
            .transaction(move |tx| {
                let rows = {
                    let mut stmt = tx.prepare(&sql)?;
                    let rows = stmt
                        .query_map(params_from_iter(params), read_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                };

                let mut result = UpdateResult::default();
                for row in rows {
                    let mut doc = decode(row)?;
                    result.matched += 1;
                    if update.apply(&mut doc.body)? {
                        tx.execute(
                            "UPDATE documents SET body = ? WHERE id = ?",
                            rusqlite::params![Value::Object(doc.body).to_string(), &doc.id],
                        )?;
                        result.modified += 1;
                    }
                }
                Ok(result)
            })
            .await
    }

    /// Delete the first matching document, returning how many were removed (0 or 1)
    pub async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let (sql, params) = select_sql("id", collection, filter, None, Some(1))?;

        self.db
            .transaction(move |tx| {
                let id: Option<String> = tx
                    .query_row(&sql, params_from_iter(params), |row| row.get(0))
                    .optional()?;
                match id {
                    Some(id) => Ok(tx.execute("DELETE FROM documents WHERE id = ?", [&id])? as u64),
                    None => Ok(0),
                }
            })
            .await
    }
}

fn select_sql(
    columns: &str,
    collection: &str,
    filter: &Filter,
    sort_field: Option<&str>,
    limit: Option<u32>,
) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = format!("SELECT {} FROM documents WHERE collection = ? AND (", columns);
    let mut params = vec![SqlValue::Text(collection.to_string())];
    filter.write_sql(&mut sql, &mut params)?;
    sql.push(')');

    match sort_field {
        Some(field) => {
            sql.push_str(" ORDER BY ");
            push_field(field, &mut sql, &mut params)?;
            sql.push_str(", created_at, rowid");
        }
        None => sql.push_str(" ORDER BY created_at, rowid"),
    }

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok((sql, params))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode((id, body): (String, String)) -> Result<StoredDocument> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(body)) => Ok(StoredDocument { id, body }),
        Ok(_) => Err(RegistryError::InvalidDocument(format!(
            "document {} is not a JSON object",
            id
        ))),
        Err(e) => Err(RegistryError::InvalidDocument(format!(
            "document {}: {}",
            id, e
        ))),
    }
}
