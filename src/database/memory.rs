use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::schema::{format_timestamp, Collection};
use crate::database::store::{Document, DocumentStore, StoreError, StoreResult};
use crate::filter::{FilterOp, FilterWhere, FilterWhereInfo, SortDirection};
use crate::query::{Projection, QuerySpec};

/// Mean earth radius in miles, matching the radius conversion used by handlers.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Process-local store with the same filter semantics as the Postgres store.
/// Backs the integration tests and `--memory` development runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn conditions(collection: &Collection, filter: &Value) -> StoreResult<Vec<FilterWhereInfo>> {
        let cast = collection.cast_filter(filter)?;
        Ok(FilterWhere::parse(&cast)?)
    }

    fn check_unique(collection: &Collection, rows: &[Document], candidate: &Document, skip_id: Option<&str>) -> StoreResult<()> {
        for unique in collection.unique {
            let key: Vec<&Value> = unique.columns.iter().map(|c| candidate.get(*c).unwrap_or(&Value::Null)).collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }
            let clash = rows.iter().any(|row| {
                row.get("id").and_then(Value::as_str) != skip_id
                    && unique.columns.iter().zip(&key).all(|(c, v)| row.get(*c) == Some(*v))
            });
            if clash {
                return Err(StoreError::Duplicate(unique.name.to_string()));
            }
        }
        Ok(())
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal) || (a.is_null() && b.is_null())
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn matches(document: &Document, condition: &FilterWhereInfo) -> bool {
    let actual = document.get(&condition.column).unwrap_or(&Value::Null);
    let expected = &condition.data;
    let ordered = |want: fn(Ordering) -> bool| compare(actual, expected).map(want).unwrap_or(false);
    match condition.operator {
        FilterOp::Eq => equals(actual, expected),
        FilterOp::Ne => !equals(actual, expected),
        FilterOp::Gt => ordered(|o| o == Ordering::Greater),
        FilterOp::Gte => ordered(|o| o != Ordering::Less),
        FilterOp::Lt => ordered(|o| o == Ordering::Less),
        FilterOp::Lte => ordered(|o| o != Ordering::Greater),
        FilterOp::In => as_list(expected).into_iter().any(|v| equals(actual, v)),
        FilterOp::NIn => !as_list(expected).into_iter().any(|v| equals(actual, v)),
        FilterOp::Any => match actual {
            Value::Array(items) => as_list(expected).into_iter().any(|v| items.iter().any(|i| equals(i, v))),
            _ => false,
        },
    }
}

/// Nulls sort last in both directions, matching `NULLS LAST` in the SQL ordering.
fn sort_rows(rows: &mut [Document], spec: &QuerySpec) {
    rows.sort_by(|a, b| {
        for key in &spec.sort {
            let x = a.get(&key.column).unwrap_or(&Value::Null);
            let y = b.get(&key.column).unwrap_or(&Value::Null);
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = compare(x, y).unwrap_or(Ordering::Equal);
                    if key.sort == SortDirection::Desc { ord.reverse() } else { ord }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::All => document,
        Projection::Fields(fields) => document.into_iter().filter(|(k, _)| fields.contains(k)).collect(),
    }
}

/// Great-circle angle in radians between two (longitude, latitude) points.
pub fn angular_distance(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &Collection, spec: &QuerySpec) -> StoreResult<Vec<Document>> {
        let conditions = Self::conditions(collection, &spec.filter)?;
        collection.check_columns(spec.sort.iter().map(|s| s.column.as_str()))?;
        if let Projection::Fields(fields) = &spec.projection {
            collection.check_columns(fields.iter().map(String::as_str))?;
        }

        let tables = self.tables.read().await;
        let mut rows: Vec<Document> = tables
            .get(collection.name)
            .map(|rows| rows.iter().filter(|doc| conditions.iter().all(|c| matches(doc, c))).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        sort_rows(&mut rows, spec);
        let skip = spec.skip() as usize;
        let take = spec.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| project(doc, &spec.projection))
            .collect())
    }

    async fn count(&self, collection: &Collection, filter: &Value) -> StoreResult<u64> {
        let conditions = Self::conditions(collection, filter)?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(collection.name)
            .map(|rows| rows.iter().filter(|doc| conditions.iter().all(|c| matches(doc, c))).count())
            .unwrap_or(0) as u64)
    }

    async fn insert(&self, collection: &Collection, document: Document) -> StoreResult<Document> {
        let mut row = collection.cast_document(document)?;
        for field in collection.fields {
            if !row.contains_key(field.name) {
                let value = field.default.map(|d| d.to_value()).unwrap_or(Value::Null);
                row.insert(field.name.to_string(), value);
            }
        }
        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            row.insert("created_at".to_string(), Value::String(format_timestamp(Utc::now())));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(collection.name).or_default();
        Self::check_unique(collection, rows, &row, None)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, collection: &Collection, id: &str, changes: Document) -> StoreResult<Option<Document>> {
        let cast = collection.cast_filter(&json!({ "id": id }))?;
        let id = cast["id"]["$eq"].as_str().unwrap_or_default().to_string();
        let changes = collection.cast_document(changes)?;

        let mut tables = self.tables.write().await;
        let rows = tables.entry(collection.name).or_default();
        let Some(position) = rows.iter().position(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str())) else {
            return Ok(None);
        };

        let mut updated = rows[position].clone();
        for (key, value) in changes {
            updated.insert(key, value);
        }
        Self::check_unique(collection, rows, &updated, Some(&id))?;
        rows[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_many(&self, collection: &Collection, filter: &Value) -> StoreResult<u64> {
        let conditions = Self::conditions(collection, filter)?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(collection.name) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|doc| !conditions.iter().all(|c| matches(doc, c)));
        Ok((before - rows.len()) as u64)
    }

    async fn find_near(&self, collection: &Collection, longitude: f64, latitude: f64, radius: f64) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Document> = tables
            .get(collection.name)
            .map(|rows| {
                rows.iter()
                    .filter(|doc| {
                        match (doc.get("longitude").and_then(Value::as_f64), doc.get("latitude").and_then(Value::as_f64)) {
                            (Some(lng), Some(lat)) => angular_distance(longitude, latitude, lng, lat) <= radius,
                            _ => false,
                        }
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);
        sort_rows(&mut rows, &QuerySpec::filtered(Value::Null));
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::bootcamp::BOOTCAMPS;
    use crate::database::models::course::COURSES;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4().to_string();
        let bootcamp = store
            .insert(&BOOTCAMPS, doc(json!({"name": "Camp", "description": "d", "user": owner})))
            .await
            .unwrap();
        for (title, tuition) in [("a", 100), ("b", 5000), ("c", 12000)] {
            store
                .insert(
                    &COURSES,
                    doc(json!({
                        "title": title, "description": "d", "weeks": "4", "tuition": tuition,
                        "minimum_skill": "beginner", "bootcamp": bootcamp["id"], "user": owner,
                    })),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn insert_fills_ids_timestamps_and_defaults() {
        let store = MemoryStore::new();
        let row = store
            .insert(&BOOTCAMPS, doc(json!({"name": "X", "description": "d", "user": Uuid::new_v4().to_string()})))
            .await
            .unwrap();
        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(row["photo"], "no-photo.jpg");
        assert_eq!(row["housing"], false);
        assert_eq!(row["careers"], json!([]));
    }

    #[tokio::test]
    async fn filters_sort_and_paginate() {
        let store = seeded().await;
        let spec = QuerySpec {
            filter: json!({"tuition": {"$gte": "5000"}}),
            projection: Projection::fields(["title"]),
            sort: vec![crate::filter::FilterOrderInfo::desc("tuition")],
            page: 1,
            limit: Some(1),
            expand: vec![],
        };
        let rows = store.find(&COURSES, &spec).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "c");
        assert!(rows[0].get("tuition").is_none());
        assert_eq!(store.count(&COURSES, &spec.filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unique_groups_reject_duplicates() {
        let store = seeded().await;
        let err = store
            .insert(&BOOTCAMPS, doc(json!({"name": "Camp", "description": "d", "user": Uuid::new_v4().to_string()})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn update_and_delete_by_filter() {
        let store = seeded().await;
        let course = store.find_one(&COURSES, &json!({"title": "a"})).await.unwrap().unwrap();
        let id = course["id"].as_str().unwrap();
        let updated = store.update(&COURSES, id, doc(json!({"weeks": "6"}))).await.unwrap().unwrap();
        assert_eq!(updated["weeks"], "6");
        assert!(store.update(&COURSES, &Uuid::new_v4().to_string(), Document::new()).await.unwrap().is_none());

        let removed = store.delete_many(&COURSES, &json!({"bootcamp": course["bootcamp"]})).await.unwrap();
        assert_eq!(removed, 3);
    }

    #[tokio::test]
    async fn bad_ids_surface_as_cast_errors() {
        let store = MemoryStore::new();
        let err = store.find_by_id(&COURSES, "abc").await.unwrap_err();
        assert!(matches!(err, StoreError::Cast { .. }));
    }

    #[test]
    fn angular_distance_is_zero_at_the_center() {
        assert!(angular_distance(-71.1, 42.3, -71.1, 42.3).abs() < 1e-12);
        // Boston to New York is roughly 190 miles
        let miles = angular_distance(-71.06, 42.36, -74.0, 40.71) * EARTH_RADIUS_MILES;
        assert!((150.0..230.0).contains(&miles));
    }
}
