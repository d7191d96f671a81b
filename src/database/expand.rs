use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::schema::Collection;
use crate::database::store::{Document, DocumentStore, StoreResult};
use crate::query::{Projection, QuerySpec};

/// Related documents inlined into query results.
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// Replace the id in `field` with the referenced document.
    BelongsTo {
        field: &'static str,
        target: &'static Collection,
        select: Option<&'static [&'static str]>,
    },
    /// Attach every `target` document whose `foreign_field` points back, under `name`.
    HasMany {
        name: &'static str,
        target: &'static Collection,
        foreign_field: &'static str,
        select: Option<&'static [&'static str]>,
    },
}

fn projection(select: Option<&'static [&'static str]>, also: Option<&'static str>) -> Projection {
    match select {
        Some(fields) => Projection::fields(fields.iter().copied().chain(also)),
        None => Projection::All,
    }
}

fn id_of(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Resolve `relations` for a batch of documents with one store query per relation.
pub async fn populate(
    store: &dyn DocumentStore,
    relations: &[Relation],
    mut documents: Vec<Document>,
) -> StoreResult<Vec<Document>> {
    if documents.is_empty() {
        return Ok(documents);
    }

    for relation in relations {
        match *relation {
            Relation::BelongsTo { field, target, select } => {
                let mut ids: Vec<String> = documents.iter().filter_map(|d| id_of(d.get(field))).collect();
                ids.sort();
                ids.dedup();
                if ids.is_empty() {
                    continue;
                }

                let spec = QuerySpec::filtered(json!({ "id": { "$in": ids } }))
                    .with_projection(projection(select, None));
                let by_id: HashMap<String, Document> = store
                    .find(target, &spec)
                    .await?
                    .into_iter()
                    .filter_map(|doc| id_of(doc.get("id")).map(|id| (id, target.redact(doc))))
                    .collect();

                for doc in documents.iter_mut() {
                    if let Some(id) = id_of(doc.get(field)) {
                        let related = by_id.get(&id).cloned().map(Value::Object).unwrap_or(Value::Null);
                        doc.insert(field.to_string(), related);
                    }
                }
            }
            Relation::HasMany { name, target, foreign_field, select } => {
                let ids: Vec<String> = documents.iter().filter_map(|d| id_of(d.get("id"))).collect();
                let spec = QuerySpec::filtered(json!({ foreign_field: { "$in": ids } }))
                    .with_projection(projection(select, Some(foreign_field)));

                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                for child in store.find(target, &spec).await? {
                    if let Some(parent) = id_of(child.get(foreign_field)) {
                        grouped.entry(parent).or_default().push(Value::Object(target.redact(child)));
                    }
                }

                for doc in documents.iter_mut() {
                    let children = id_of(doc.get("id"))
                        .and_then(|id| grouped.remove(&id))
                        .unwrap_or_default();
                    doc.insert(name.to_string(), Value::Array(children));
                }
            }
        }
    }

    Ok(documents)
}
