use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,

    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,

    #[serde(rename = "$any")] Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

/// Column name to Postgres type, used to cast bound parameters (`$1::uuid`).
/// When non-empty, columns outside the map are rejected.
#[derive(Debug, Clone, Default)]
pub struct FilterWhereOptions {
    pub column_types: HashMap<String, &'static str>,
}

impl FilterWhereOptions {
    pub fn with_column_types(column_types: HashMap<String, &'static str>) -> Self {
        Self { column_types }
    }

    pub fn cast_for(&self, column: &str) -> String {
        match self.column_types.get(column) {
            Some(sql_type) => format!("::{}", sql_type),
            None => String::new(),
        }
    }

    /// Element cast for array columns (`text[]` -> `::text`)
    pub fn element_cast_for(&self, column: &str) -> String {
        match self.column_types.get(column) {
            Some(sql_type) => format!("::{}", sql_type.trim_end_matches("[]")),
            None => String::new(),
        }
    }

    pub fn knows(&self, column: &str) -> bool {
        self.column_types.is_empty() || self.column_types.contains_key(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), sort: SortDirection::Asc }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), sort: SortDirection::Desc }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
