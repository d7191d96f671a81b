use super::types::{FilterOrderInfo, FilterWhereOptions, SortDirection};
use super::error::FilterError;

pub struct FilterOrder;

impl FilterOrder {
    /// Comma separated keys. A leading `-` or a trailing `desc` sorts descending.
    pub fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let (col, mut sort) = match col.strip_prefix('-') {
                    Some(rest) => (rest, SortDirection::Desc),
                    None => (col, SortDirection::Asc),
                };
                if col.is_empty() { continue; }
                if let Some(dir) = it.next() {
                    if dir.eq_ignore_ascii_case("desc") { sort = SortDirection::Desc; }
                }
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo], options: &FilterWhereOptions) -> Result<String, FilterError> {
        if infos.is_empty() { return Ok(String::new()); }
        let mut parts = Vec::with_capacity(infos.len());
        for info in infos {
            if !options.knows(&info.column) {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
            parts.push(format!("\"{}\" {} NULLS LAST", info.column, info.sort.to_sql()));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
