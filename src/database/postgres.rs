use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::database::manager::DatabaseManager;
use crate::database::schema::Collection;
use crate::database::store::{Document, DocumentStore, FieldError, StoreError, StoreResult};
use crate::filter::{Filter, FilterWhereOptions, SqlResult};
use crate::query::{Projection, QuerySpec};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// [`DocumentStore`] over the tables created by `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn filter(collection: &Collection, filter: &Value) -> StoreResult<Filter> {
        let cast = collection.cast_filter(filter)?;
        let mut builder = Filter::new(collection.name)?;
        builder.options(FilterWhereOptions::with_column_types(collection.column_types()));
        builder.where_clause(cast)?;
        Ok(builder)
    }

    /// Sort and projection names are checked against the collection before
    /// the SQL builder sees them.
    fn find_sql(collection: &Collection, spec: &QuerySpec) -> StoreResult<SqlResult> {
        let mut filter = Self::filter(collection, &spec.filter)?;
        collection.check_columns(spec.sort.iter().map(|s| s.column.as_str()))?;
        if let Projection::Fields(fields) = &spec.projection {
            collection.check_columns(fields.iter().map(String::as_str))?;
            filter.select(fields.clone())?;
        }
        let skip = spec.skip();
        filter.order(spec.sort.clone()).limit(spec.limit, (skip > 0).then_some(skip));
        Ok(filter.to_sql()?)
    }

    fn quoted_columns(document: &Document) -> String {
        document.keys().map(|k| format!("\"{}\"", k)).collect::<Vec<_>>().join(", ")
    }
}

fn bind_param<'q>(q: PgQuery<'q>, v: &'q Value) -> PgQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // jsonb
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

fn bind_all<'q>(mut q: PgQuery<'q>, params: &'q [Value]) -> PgQuery<'q> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

fn row_document(row: PgRow) -> StoreResult<Document> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Query(format!("expected a JSON object row, got {}", other))),
    }
}

/// Map Postgres error codes onto store failure shapes.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            // unique_violation
            Some("23505") => return StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string()),
            // invalid_text_representation, e.g. invalid input syntax for type uuid: "abc"
            Some("22P02") => {
                let message = db.message();
                let value = message.split('"').nth(1).unwrap_or(message).to_string();
                return StoreError::Cast { field: "id".to_string(), kind: "uuid", value };
            }
            // check_violation, not_null_violation
            Some("23514") | Some("23502") => {
                let field = db.constraint().unwrap_or("record").to_string();
                return StoreError::Validation(vec![FieldError::new(field, db.message())]);
            }
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}

const DISTANCE_SQL: &str = "2 * asin(least(1, sqrt(\
    power(sin(radians(t.\"latitude\" - $2) / 2), 2) + \
    cos(radians($2)) * cos(radians(t.\"latitude\")) * power(sin(radians(t.\"longitude\" - $1) / 2), 2))))";

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: &Collection, spec: &QuerySpec) -> StoreResult<Vec<Document>> {
        let sql = Self::find_sql(collection, spec)?;
        tracing::trace!(query = %sql.query, "find");
        let rows = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.into_iter().map(row_document).collect()
    }

    async fn count(&self, collection: &Collection, filter: &Value) -> StoreResult<u64> {
        let sql = Self::filter(collection, filter)?.to_count_sql()?;
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, collection: &Collection, document: Document) -> StoreResult<Document> {
        let document = collection.cast_document(document)?;
        let query = if document.is_empty() {
            format!("INSERT INTO \"{}\" AS t DEFAULT VALUES RETURNING row_to_json(t) AS row", collection.name)
        } else {
            let columns = Self::quoted_columns(&document);
            format!(
                "INSERT INTO \"{table}\" AS t ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", $1::jsonb) RETURNING row_to_json(t) AS row",
                table = collection.name,
                columns = columns,
            )
        };

        let payload = Value::Object(document);
        let mut q = sqlx::query(&query);
        if payload.as_object().map_or(false, |d| !d.is_empty()) {
            q = q.bind(&payload);
        }
        let row = q.fetch_one(&self.pool).await.map_err(classify)?;
        row_document(row)
    }

    async fn update(&self, collection: &Collection, id: &str, changes: Document) -> StoreResult<Option<Document>> {
        // cast first so a malformed id reports as a cast failure
        collection.cast_filter(&serde_json::json!({ "id": id }))?;
        let changes = collection.cast_document(changes)?;
        if changes.is_empty() {
            return self.find_by_id(collection, id).await;
        }

        let assignments = changes
            .keys()
            .map(|k| format!("\"{k}\" = r.\"{k}\"", k = k))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE \"{table}\" AS t SET {assignments} FROM jsonb_populate_record(NULL::\"{table}\", $1::jsonb) AS r WHERE t.\"id\" = $2::uuid RETURNING row_to_json(t) AS row",
            table = collection.name,
            assignments = assignments,
        );

        let payload = Value::Object(changes);
        let row = sqlx::query(&query)
            .bind(&payload)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.map(row_document).transpose()
    }

    async fn delete_many(&self, collection: &Collection, filter: &Value) -> StoreResult<u64> {
        let sql = Self::filter(collection, filter)?.to_delete_sql()?;
        let result = bind_all(sqlx::query(&sql.query), &sql.params)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn find_near(&self, collection: &Collection, longitude: f64, latitude: f64, radius: f64) -> StoreResult<Vec<Document>> {
        let query = format!(
            "SELECT row_to_json(t) AS row FROM \"{}\" t WHERE t.\"longitude\" IS NOT NULL AND t.\"latitude\" IS NOT NULL AND {} <= $3 ORDER BY t.\"created_at\" DESC",
            collection.name, DISTANCE_SQL
        );
        let rows = sqlx::query(&query)
            .bind(longitude)
            .bind(latitude)
            .bind(radius)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.into_iter().map(row_document).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await
    }
}
