//! Derived bootcamp columns, recomputed after course and review writes.

use serde_json::{json, Value};

use crate::database::models::{BOOTCAMPS, COURSES, REVIEWS};
use crate::database::schema::Collection;
use crate::database::store::{Document, DocumentStore, StoreResult};
use crate::query::{Projection, QuerySpec};

async fn average(
    store: &dyn DocumentStore,
    collection: &Collection,
    bootcamp_id: &str,
    field: &str,
) -> StoreResult<Option<f64>> {
    let spec = QuerySpec::filtered(json!({ "bootcamp": bootcamp_id }))
        .with_projection(Projection::fields([field]));
    let values: Vec<f64> = store
        .find(collection, &spec)
        .await?
        .iter()
        .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// Mean course tuition rounded up to the next multiple of ten; null without courses.
pub async fn refresh_average_cost(store: &dyn DocumentStore, bootcamp_id: &str) -> StoreResult<Option<f64>> {
    let cost = average(store, &COURSES, bootcamp_id, "tuition")
        .await?
        .map(|avg| (avg / 10.0).ceil() * 10.0);
    let mut changes = Document::new();
    changes.insert("average_cost".into(), json!(cost));
    store.update(&BOOTCAMPS, bootcamp_id, changes).await?;
    Ok(cost)
}

/// Mean review rating; null without reviews.
pub async fn refresh_average_rating(store: &dyn DocumentStore, bootcamp_id: &str) -> StoreResult<Option<f64>> {
    let rating = average(store, &REVIEWS, bootcamp_id, "rating").await?;
    let mut changes = Document::new();
    changes.insert("average_rating".into(), json!(rating));
    store.update(&BOOTCAMPS, bootcamp_id, changes).await?;
    Ok(rating)
}
