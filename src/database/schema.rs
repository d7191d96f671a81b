use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::store::{Document, StoreError, StoreResult};
use crate::filter::FilterWhere;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Number,
    Integer,
    Boolean,
    TextList,
    Timestamp,
}

impl FieldKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Id => "uuid",
            FieldKind::Text => "text",
            FieldKind::Number => "numeric",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::TextList => "text[]",
            FieldKind::Timestamp => "timestamptz",
        }
    }

    fn cast_name(&self) -> &'static str {
        match self {
            FieldKind::Id => "uuid",
            FieldKind::Text => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::TextList => "[string]",
            FieldKind::Timestamp => "date",
        }
    }
}

/// Column default applied by the in-memory store; the SQL schema carries the same defaults.
#[derive(Debug, Clone, Copy)]
pub enum Literal {
    Bool(bool),
    Str(&'static str),
    EmptyList,
}

impl Literal {
    pub fn to_value(self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(b),
            Literal::Str(s) => Value::String(s.to_string()),
            Literal::EmptyList => Value::Array(vec![]),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub hidden: bool,
    pub default: Option<Literal>,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, hidden: false, default: None }
    }

    /// Never serialized to clients.
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn default(mut self, literal: Literal) -> Self {
        self.default = Some(literal);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Unique {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Static description of a table: its columns, their kinds and unique groups.
#[derive(Debug)]
pub struct Collection {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub unique: &'static [Unique],
}

impl Collection {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.to_string()).collect()
    }

    pub fn column_types(&self) -> HashMap<String, &'static str> {
        self.fields.iter().map(|f| (f.name.to_string(), f.kind.sql_type())).collect()
    }

    fn require(&self, name: &str) -> StoreResult<&Field> {
        self.field(name).ok_or_else(|| StoreError::UnknownField(name.to_string()))
    }

    /// Cast a filter to column types, normalized to `{field: {$op: value}}`.
    ///
    /// Scalar `$in`/`$nin` values are comma-split. Equality and membership on
    /// list columns become `$any` (overlap).
    pub fn cast_filter(&self, filter: &Value) -> StoreResult<Value> {
        let obj = match filter {
            Value::Null => return Ok(Value::Object(Map::new())),
            Value::Object(obj) => obj,
            _ => return Err(StoreError::Query("filter must be an object".to_string())),
        };

        let mut out = Map::new();
        for (name, condition) in obj {
            if name.starts_with('$') {
                return Err(StoreError::UnsupportedOperator(name.clone()));
            }
            let field = self.require(name)?;
            let ops: Vec<(String, Value)> = match condition {
                Value::Object(ops) => ops.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                Value::Array(_) => vec![("$in".to_string(), condition.clone())],
                other => vec![("$eq".to_string(), other.clone())],
            };

            let mut cast_ops = Map::new();
            for (op, value) in ops {
                FilterWhere::map_operator(&op)?;
                let (op, value) = self.cast_condition(field, &op, value)?;
                cast_ops.insert(op, value);
            }
            out.insert(name.clone(), Value::Object(cast_ops));
        }
        Ok(Value::Object(out))
    }

    fn cast_condition(&self, field: &Field, op: &str, value: Value) -> StoreResult<(String, Value)> {
        let list_op = matches!(op, "$in" | "$nin" | "$any");
        if field.kind == FieldKind::TextList {
            return match op {
                "$eq" | "$in" | "$any" => {
                    let items = split_list(value, op != "$eq");
                    let items = items.into_iter().map(|v| cast_value(field, FieldKind::Text, v)).collect::<StoreResult<Vec<_>>>()?;
                    Ok(("$any".to_string(), Value::Array(items)))
                }
                other => Err(StoreError::UnsupportedOperator(format!("{} on {}", other, field.name))),
            };
        }

        if list_op {
            let items = split_list(value, true)
                .into_iter()
                .map(|v| cast_value(field, field.kind, v))
                .collect::<StoreResult<Vec<_>>>()?;
            Ok((op.to_string(), Value::Array(items)))
        } else {
            Ok((op.to_string(), cast_value(field, field.kind, value)?))
        }
    }

    /// Cast every value of a document to its column type. Unknown keys are rejected.
    pub fn cast_document(&self, document: Document) -> StoreResult<Document> {
        let mut out = Map::new();
        for (name, value) in document {
            let field = self.require(&name)?;
            let value = match (field.kind, value) {
                (_, Value::Null) => Value::Null,
                (FieldKind::TextList, value) => {
                    let items = split_list(value, false)
                        .into_iter()
                        .map(|v| cast_value(field, FieldKind::Text, v))
                        .collect::<StoreResult<Vec<_>>>()?;
                    Value::Array(items)
                }
                (kind, value) => cast_value(field, kind, value)?,
            };
            out.insert(name, value);
        }
        Ok(out)
    }

    /// Drop hidden columns before a document leaves the service.
    pub fn redact(&self, mut document: Document) -> Document {
        for field in self.fields.iter().filter(|f| f.hidden) {
            document.remove(field.name);
        }
        document
    }

    pub fn check_columns<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> StoreResult<()> {
        for column in columns {
            self.require(column)?;
        }
        Ok(())
    }
}

fn split_list(value: Value, split_commas: bool) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::String(s) if split_commas && s.contains(',') => {
            s.split(',').map(|part| Value::String(part.trim().to_string())).collect()
        }
        other => vec![other],
    }
}

fn cast_error(field: &Field, kind: FieldKind, value: &Value) -> StoreError {
    let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    StoreError::Cast { field: field.name.to_string(), kind: kind.cast_name(), value }
}

/// Canonical wire form for timestamps.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn cast_value(field: &Field, kind: FieldKind, value: Value) -> StoreResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let fail = |v: &Value| cast_error(field, kind, v);
    match kind {
        FieldKind::Id => match value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
            Some(id) => Ok(Value::String(id.to_string())),
            None => Err(fail(&value)),
        },
        FieldKind::Text => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(fail(&other)),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value),
            Value::String(ref s) => parse_number(s.trim()).ok_or_else(|| fail(&value)),
            other => Err(fail(&other)),
        },
        FieldKind::Integer => match value {
            Value::Number(ref n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::Number(ref n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err(fail(&value)),
            },
            Value::String(ref s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| fail(&value)),
            other => Err(fail(&other)),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value),
            Value::String(ref s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(fail(&value)),
            },
            other => Err(fail(&other)),
        },
        FieldKind::Timestamp => match value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            Some(at) => Ok(Value::String(format_timestamp(at.with_timezone(&Utc)))),
            None => Err(fail(&value)),
        },
        FieldKind::TextList => Err(fail(&value)),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static THINGS: Collection = Collection {
        name: "things",
        fields: &[
            Field::new("id", FieldKind::Id),
            Field::new("name", FieldKind::Text),
            Field::new("cost", FieldKind::Number),
            Field::new("rating", FieldKind::Integer),
            Field::new("open", FieldKind::Boolean).default(Literal::Bool(false)),
            Field::new("tags", FieldKind::TextList).default(Literal::EmptyList),
            Field::new("secret", FieldKind::Text).hidden(),
        ],
        unique: &[],
    };

    #[test]
    fn query_string_values_are_cast_to_column_types() {
        let cast = THINGS
            .cast_filter(&json!({"cost": {"$lte": "10000"}, "open": "true", "rating": {"$gt": "3"}}))
            .unwrap();
        assert_eq!(
            cast,
            json!({"cost": {"$lte": 10000}, "open": {"$eq": true}, "rating": {"$gt": 3}})
        );
    }

    #[test]
    fn scalar_membership_is_comma_split() {
        let cast = THINGS.cast_filter(&json!({"name": {"$in": "a,b"}})).unwrap();
        assert_eq!(cast, json!({"name": {"$in": ["a", "b"]}}));
    }

    #[test]
    fn list_columns_use_overlap() {
        let cast = THINGS.cast_filter(&json!({"tags": "Business"})).unwrap();
        assert_eq!(cast, json!({"tags": {"$any": ["Business"]}}));
        let cast = THINGS.cast_filter(&json!({"tags": {"$in": "Business,Other"}})).unwrap();
        assert_eq!(cast, json!({"tags": {"$any": ["Business", "Other"]}}));
    }

    #[test]
    fn bad_identifier_is_a_cast_error_carrying_the_value() {
        match THINGS.cast_filter(&json!({"id": "abc"})) {
            Err(StoreError::Cast { value, .. }) => assert_eq!(value, "abc"),
            other => panic!("expected cast error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_fields_and_operators_are_rejected() {
        assert!(matches!(THINGS.cast_filter(&json!({"nope": 1})), Err(StoreError::UnknownField(_))));
        assert!(matches!(
            THINGS.cast_filter(&json!({"name": {"$where": "1"}})),
            Err(StoreError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn redact_removes_hidden_columns() {
        let doc = json!({"name": "x", "secret": "s"}).as_object().cloned().unwrap();
        let redacted = THINGS.redact(doc);
        assert!(redacted.get("secret").is_none());
        assert_eq!(redacted["name"], "x");
    }

    #[test]
    fn documents_are_cast_on_write() {
        let doc = json!({"cost": "12.5", "tags": ["a"], "open": true}).as_object().cloned().unwrap();
        let cast = THINGS.cast_document(doc).unwrap();
        assert_eq!(cast["cost"], json!(12.5));
        let bad = json!({"cost": "lots"}).as_object().cloned().unwrap();
        assert!(matches!(THINGS.cast_document(bad), Err(StoreError::Cast { .. })));
    }
}
