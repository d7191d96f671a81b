use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::database::schema::Collection;
use crate::filter::FilterError;
use crate::query::QuerySpec;

/// A stored record as a JSON object. Keys are column names.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A value could not be converted to the column type (bad id, bad number).
    #[error("Cast to {kind} failed for value \"{value}\" at path \"{field}\"")]
    Cast { field: String, kind: &'static str, value: String },

    /// Unique constraint violation, named by constraint
    #[error("Duplicate key violates {0}")]
    Duplicate(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidColumn(column) => StoreError::UnknownField(column),
            FilterError::UnsupportedOperator(op) => StoreError::UnsupportedOperator(op),
            other => StoreError::Query(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam. Filters are JSON objects in the `{field: value | {$op: value}}`
/// shape; implementations cast them through the collection schema before use.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &Collection, spec: &QuerySpec) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: &Collection, filter: &Value) -> StoreResult<u64>;

    async fn insert(&self, collection: &Collection, document: Document) -> StoreResult<Document>;

    /// Apply `changes` to the record with `id`. `None` when no such record exists.
    async fn update(&self, collection: &Collection, id: &str, changes: Document) -> StoreResult<Option<Document>>;

    async fn delete_many(&self, collection: &Collection, filter: &Value) -> StoreResult<u64>;

    /// Records whose (longitude, latitude) lie within `radius` radians of the center.
    async fn find_near(&self, collection: &Collection, longitude: f64, latitude: f64, radius: f64) -> StoreResult<Vec<Document>>;

    async fn ping(&self) -> StoreResult<()>;

    async fn find_one(&self, collection: &Collection, filter: &Value) -> StoreResult<Option<Document>> {
        let spec = QuerySpec::filtered(filter.clone()).with_limit(1);
        Ok(self.find(collection, &spec).await?.into_iter().next())
    }

    async fn find_by_id(&self, collection: &Collection, id: &str) -> StoreResult<Option<Document>> {
        self.find_one(collection, &json!({ "id": id })).await
    }

    async fn delete_by_id(&self, collection: &Collection, id: &str) -> StoreResult<bool> {
        Ok(self.delete_many(collection, &json!({ "id": id })).await? > 0)
    }
}
