// handlers/mod.rs - resource handlers mounted under /api/v1
//
// Public: health, register, login, forgot/reset password, listings and reads.
// Authenticated: everything that writes, gated by role and ownership.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod reviews;
pub mod users;

use serde_json::Value;

use crate::database::expand::{populate, Relation};
use crate::database::models::{BOOTCAMPS, COURSES};
use crate::database::schema::Collection;
use crate::database::store::{Document, DocumentStore};
use crate::error::{ApiError, AppResult};

/// Load one document or fail with 404 and `message`.
pub(crate) async fn load(
    store: &dyn DocumentStore,
    collection: &Collection,
    id: &str,
    message: impl FnOnce() -> String,
) -> AppResult<Document> {
    store
        .find_by_id(collection, id)
        .await?
        .ok_or_else(|| ApiError::not_found(message()).into())
}

/// Load one document with relations resolved, hidden columns removed.
pub(crate) async fn load_expanded(
    store: &dyn DocumentStore,
    collection: &Collection,
    id: &str,
    relations: &[Relation],
    message: impl FnOnce() -> String,
) -> AppResult<Document> {
    let doc = load(store, collection, id, message).await?;
    let doc = populate(store, relations, vec![doc]).await?.into_iter().next().unwrap_or_default();
    Ok(collection.redact(doc))
}

pub(crate) fn text<'a>(doc: &'a Document, key: &str) -> &'a str {
    doc.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Bootcamp name and description inlined into courses and reviews.
pub(crate) fn with_bootcamp() -> Relation {
    Relation::BelongsTo {
        field: "bootcamp",
        target: &BOOTCAMPS,
        select: Some(&["name", "description"]),
    }
}

/// A bootcamp's courses as a virtual `courses` list.
pub(crate) fn with_courses() -> Relation {
    Relation::HasMany {
        name: "courses",
        target: &COURSES,
        foreign_field: "bootcamp",
        select: None,
    }
}
