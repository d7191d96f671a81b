use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, FilterWhereOptions, SqlResult};

/// SELECT builder over a single table. Rows come back as one JSON column named
/// `row`, either the whole record (`row_to_json`) or the selected columns.
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u64>,
    offset: Option<u64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            options: FilterWhereOptions::default(),
        })
    }

    pub fn options(&mut self, options: FilterWhereOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        Self::validate_select_columns(&columns)?;
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> &mut Self {
        self.order_data = order;
        self
    }

    pub fn limit(&mut self, limit: Option<u64>, offset: Option<u64>) -> &mut Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause()?;
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data, &self.options)?;
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {} AS row", select_clause),
            format!("FROM \"{}\" t", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0, &self.options)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" t WHERE {}", self.table_name, where_result.query);
        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_result.query);
        Ok(SqlResult { query, params: where_result.params })
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())); }
        if !Self::is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn validate_select_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if column.is_empty() { return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string())); }
            if !Self::is_identifier(column) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
            }
        }
        Ok(())
    }

    fn build_select_clause(&self) -> Result<String, FilterError> {
        if self.select_columns.is_empty() {
            return Ok("row_to_json(t)".to_string());
        }
        let mut pairs = Vec::with_capacity(self.select_columns.len());
        for column in &self.select_columns {
            if !self.options.knows(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
            pairs.push(format!("'{}', t.\"{}\"", column, column));
        }
        Ok(format!("json_build_object({})", pairs.join(", ")))
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
