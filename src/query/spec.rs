use serde_json::Value;

use crate::config::QueryConfig;
use crate::database::expand::Relation;
use crate::database::store::StoreResult;
use crate::filter::{FilterOrder, FilterOrderInfo};

use super::params::{parse_params, rewrite_operators, split_control};

/// Which columns a query returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    /// Named columns; always includes `id`.
    Fields(Vec<String>),
}

impl Projection {
    pub fn fields(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut fields: Vec<String> = vec!["id".to_string()];
        for name in names {
            let name = name.into();
            if !name.is_empty() && !fields.contains(&name) {
                fields.push(name);
            }
        }
        Projection::Fields(fields)
    }
}

/// A structured listing request, built once per request and handed to the store.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub filter: Value,
    pub projection: Projection,
    pub sort: Vec<FilterOrderInfo>,
    pub page: u64,
    /// Page size; `None` returns every match.
    pub limit: Option<u64>,
    pub expand: Vec<Relation>,
}

impl QuerySpec {
    pub fn default_sort() -> Vec<FilterOrderInfo> {
        vec![FilterOrderInfo::desc("created_at")]
    }

    /// Every record matching `filter`, newest first.
    pub fn filtered(filter: Value) -> Self {
        Self {
            filter,
            projection: Projection::All,
            sort: Self::default_sort(),
            page: 1,
            limit: None,
            expand: vec![],
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn skip(&self) -> u64 {
        match self.limit {
            Some(limit) => self.page.saturating_sub(1).saturating_mul(limit),
            None => 0,
        }
    }

    /// Build from raw `(key, value)` query pairs.
    ///
    /// Missing, unparsable or non-positive `page`/`limit` fall back to 1 and the
    /// configured default; `limit` is capped at the configured maximum. `page`
    /// is clamped so the skip count fits a bigint `OFFSET`. Fails when a filter
    /// key names a `$` operator directly.
    pub fn from_params(pairs: &[(String, String)], config: &QueryConfig) -> StoreResult<Self> {
        let (filter, control) = split_control(parse_params(pairs));
        let filter = rewrite_operators(Value::Object(filter))?;

        let projection = match control.select.as_deref() {
            Some(select) if !select.trim().is_empty() => {
                Projection::fields(select.split(',').map(|s| s.trim().to_string()))
            }
            _ => Projection::All,
        };

        let sort = match control.sort.as_deref() {
            Some(sort) => {
                let parsed = FilterOrder::parse_order_string(sort);
                if parsed.is_empty() { Self::default_sort() } else { parsed }
            }
            None => Self::default_sort(),
        };

        let page = positive(control.page.as_deref()).unwrap_or(1);
        let mut limit = positive(control.limit.as_deref()).unwrap_or(config.default_limit.max(1));
        if let Some(max) = config.max_limit {
            if limit > max {
                if config.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                }
                limit = max;
            }
        }

        let limit = limit.max(1);
        let page = page.min(i64::MAX as u64 / limit);

        Ok(Self {
            filter,
            projection,
            sort,
            page,
            limit: Some(limit),
            expand: vec![],
        })
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n as u64)
}
