use serde::Serialize;

use crate::config::QueryConfig;
use crate::database::expand::{populate, Relation};
use crate::database::schema::Collection;
use crate::database::store::{Document, DocumentStore, StoreResult};

use super::spec::QuerySpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    /// `next` iff items remain past this page, `prev` iff this is not the first page.
    pub fn compute(page: u64, limit: u64, returned: u64, total: u64) -> Self {
        let start = page.saturating_sub(1).saturating_mul(limit);
        Self {
            next: (start.saturating_add(returned) < total).then_some(PageLink { page: page.saturating_add(1), limit }),
            prev: (page > 1).then_some(PageLink { page: page - 1, limit }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Document>,
}

/// Run a listing query from raw URL parameters and wrap it in the page envelope.
///
/// The total used for `next` is counted with the same filter as the page.
pub async fn build_page(
    store: &dyn DocumentStore,
    collection: &Collection,
    pairs: &[(String, String)],
    expand: Vec<Relation>,
    config: &QueryConfig,
) -> StoreResult<PageResult> {
    let mut spec = QuerySpec::from_params(pairs, config)?;
    spec.expand = expand;

    if config.debug_logging {
        tracing::debug!(collection = collection.name, filter = %spec.filter, page = spec.page, limit = ?spec.limit, "listing");
    }

    let total = store.count(collection, &spec.filter).await?;
    let items = store.find(collection, &spec).await?;
    let items = populate(store, &spec.expand, items).await?;

    let limit = spec.limit.unwrap_or(total.max(1));
    let pagination = Pagination::compute(spec.page, limit, items.len() as u64, total);
    let data: Vec<Document> = items.into_iter().map(|doc| collection.redact(doc)).collect();

    Ok(PageResult {
        success: true,
        count: data.len(),
        pagination,
        data,
    })
}
