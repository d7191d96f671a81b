use serde_json::{json, Value};

use crate::database::models::{BootcampInput, BOOTCAMPS, COURSES, REVIEWS};
use crate::database::store::{Document, DocumentStore, StoreResult};
use crate::error::{ApiError, AppResult};

use super::geocoder::{GeoLocation, GeocodeError, Geocoder};
use super::slug::slugify;

/// Location columns for a geocoded address.
pub fn location_document(location: &GeoLocation) -> Document {
    let mut doc = Document::new();
    doc.insert("location_type".into(), json!("Point"));
    doc.insert("longitude".into(), json!(location.longitude));
    doc.insert("latitude".into(), json!(location.latitude));
    doc.insert("formatted_address".into(), json!(location.formatted_address));
    doc.insert("street".into(), json!(location.street));
    doc.insert("city".into(), json!(location.city));
    doc.insert("state".into(), json!(location.state));
    doc.insert("zipcode".into(), json!(location.zipcode));
    doc.insert("country".into(), json!(location.country));
    doc
}

pub async fn locate(geocoder: &dyn Geocoder, address: &str) -> AppResult<GeoLocation> {
    match geocoder.geocode(address).await {
        Ok(location) => Ok(location),
        Err(GeocodeError::NotFound(_)) => {
            Err(ApiError::bad_request(format!("Could not find a location for '{}'", address)).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn derive(geocoder: &dyn Geocoder, input: BootcampInput) -> AppResult<Document> {
    let (address, mut doc) = input.into_document();
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert("slug".into(), Value::String(slug));
    }
    if let Some(address) = address.filter(|a| !a.trim().is_empty()) {
        let location = locate(geocoder, &address).await?;
        doc.extend(location_document(&location));
    }
    Ok(doc)
}

/// Validated columns for a new bootcamp, with slug and location filled in.
pub async fn prepare_new(geocoder: &dyn Geocoder, input: BootcampInput, owner: &str) -> AppResult<Document> {
    input.validate_new()?;
    let mut doc = derive(geocoder, input).await?;
    doc.insert("user".into(), Value::String(owner.to_string()));
    Ok(doc)
}

/// Validated changes. A new name re-derives the slug, a new address the location.
pub async fn prepare_changes(geocoder: &dyn Geocoder, input: BootcampInput) -> AppResult<Document> {
    input.validate_changes()?;
    derive(geocoder, input).await
}

/// Remove a bootcamp together with its courses and reviews.
pub async fn cascade_delete(store: &dyn DocumentStore, id: &str) -> StoreResult<bool> {
    let courses = store.delete_many(&COURSES, &json!({ "bootcamp": id })).await?;
    let reviews = store.delete_many(&REVIEWS, &json!({ "bootcamp": id })).await?;
    tracing::info!(bootcamp = id, courses, reviews, "removing bootcamp and its dependents");
    store.delete_by_id(&BOOTCAMPS, id).await
}
