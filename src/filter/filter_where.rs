use serde_json::Value;

use super::types::{FilterOp, FilterWhereInfo, FilterWhereOptions};
use super::error::FilterError;

pub struct FilterWhere<'a> {
    param_values: Vec<Value>,
    param_index: usize,
    options: &'a FilterWhereOptions,
}

impl<'a> FilterWhere<'a> {
    pub fn new(starting_param_index: usize, options: &'a FilterWhereOptions) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            options,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize, options: &FilterWhereOptions) -> Result<(String, Vec<Value>), FilterError> {
        let conditions = Self::parse(where_data)?;
        let mut filter_where = FilterWhere::new(starting_param_index, options);
        filter_where.build(&conditions)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Flatten `{field: value | {$op: value}}` into one condition per operator.
    /// Bare scalars mean equality, bare arrays mean membership.
    pub fn parse(where_data: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut conditions = Vec::new();
        for (field, value) in obj {
            if field.starts_with('$') {
                return Err(FilterError::UnsupportedOperator(field.clone()));
            }
            match value {
                Value::Object(ops) => {
                    for (op_key, op_val) in ops {
                        let operator = Self::map_operator(op_key)?;
                        conditions.push(FilterWhereInfo { column: field.clone(), operator, data: op_val.clone() });
                    }
                }
                Value::Array(_) => {
                    conditions.push(FilterWhereInfo { column: field.clone(), operator: FilterOp::In, data: value.clone() });
                }
                _ => {
                    conditions.push(FilterWhereInfo { column: field.clone(), operator: FilterOp::Eq, data: value.clone() });
                }
            }
        }
        Ok(conditions)
    }

    pub fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$any" => FilterOp::Any,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build(&mut self, conditions: &[FilterWhereInfo]) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = vec![];
        for condition in conditions {
            if !self.options.knows(&condition.column) {
                return Err(FilterError::InvalidColumn(condition.column.clone()));
            }
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = condition.column.as_str();
        let quoted_column = format!("\"{}\"", column);
        let data = &condition.data;
        match condition.operator {
            FilterOp::Eq => {
                if data.is_null() { Ok(format!("{} IS NULL", quoted_column)) }
                else { Ok(format!("{} = {}", quoted_column, self.param(column, data.clone()))) }
            }
            FilterOp::Ne => {
                if data.is_null() { Ok(format!("{} IS NOT NULL", quoted_column)) }
                else { Ok(format!("{} IS DISTINCT FROM {}", quoted_column, self.param(column, data.clone()))) }
            }
            FilterOp::Gt => Ok(format!("{} > {}", quoted_column, self.scalar(column, data)?)),
            FilterOp::Gte => Ok(format!("{} >= {}", quoted_column, self.scalar(column, data)?)),
            FilterOp::Lt => Ok(format!("{} < {}", quoted_column, self.scalar(column, data)?)),
            FilterOp::Lte => Ok(format!("{} <= {}", quoted_column, self.scalar(column, data)?)),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(if negate { "1=1".to_string() } else { "1=0".to_string() });
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(column, v)).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", quoted_column, keyword, params.join(", ")))
            }
            FilterOp::Any => {
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() { return Ok("1=0".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.element_param(column, v)).collect();
                Ok(format!("{} && ARRAY[{}]", quoted_column, params.join(", ")))
            }
        }
    }

    fn scalar(&mut self, column: &str, data: &Value) -> Result<String, FilterError> {
        match data {
            Value::Array(_) | Value::Object(_) | Value::Null => Err(FilterError::InvalidOperatorData(format!(
                "comparison on '{}' requires a scalar value",
                column
            ))),
            _ => Ok(self.param(column, data.clone())),
        }
    }

    fn param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}{}", self.param_index, self.options.cast_for(column))
    }

    fn element_param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}{}", self.param_index, self.options.element_cast_for(column))
    }
}
