use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::database::store::{FieldError, StoreError};

/// Collects field messages so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required<T>(&mut self, field: &str, value: Option<&T>, message: &str) -> &mut Self
    where
        T: IsBlank + ?Sized,
    {
        self.check(value.map_or(false, |v| !v.is_blank()), field, message)
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| v.chars().count() <= max), field, message)
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| v.chars().count() >= min), field, message)
    }

    pub fn email(&mut self, field: &str, value: Option<&str>, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| validate_email_format(v).is_ok()), field, message)
    }

    pub fn http_url(&mut self, field: &str, value: Option<&str>, message: &str) -> &mut Self {
        self.check(value.map_or(true, is_http_url), field, message)
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str], message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| allowed.contains(&v)), field, message)
    }

    pub fn range(&mut self, field: &str, value: Option<f64>, min: f64, max: f64, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| v >= min && v <= max), field, message)
    }

    pub fn finish(&mut self) -> Result<(), StoreError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> IsBlank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl IsBlank for f64 {
    fn is_blank(&self) -> bool {
        false
    }
}

impl IsBlank for i64 {
    fn is_blank(&self) -> bool {
        false
    }
}

/// Validate email format
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err("Invalid email format".to_string());
    }

    let domain = parts[1];
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err("Invalid email format".to_string());
    }
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

fn is_http_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().map_or(false, |host| host.contains('.'))
        }
        Err(_) => false,
    }
}

/// Accept `"8"` or `8` for text columns that clients often send as numbers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email_format("john@gmail.com").is_ok());
        assert!(validate_email_format("a.b-c@mail.example.org").is_ok());
        assert!(validate_email_format("").is_err());
        assert!(validate_email_format("no-at-sign.com").is_err());
        assert!(validate_email_format("a@b").is_err());
        assert!(validate_email_format("a@@b.com").is_err());
        assert!(validate_email_format("a b@c.com").is_err());
    }

    #[test]
    fn http_urls() {
        assert!(is_http_url("https://devworks.com"));
        assert!(is_http_url("http://www.example.co.uk/path?q=1"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn collects_every_failure() {
        let mut v = Validator::new();
        v.required::<str>("name", None, "Please add a name")
            .max_len("phone", Some("123456789012345678901"), 20, "Phone number too long")
            .one_of("role", Some("admin"), &["user", "publisher"], "bad role");
        match v.finish() {
            Err(StoreError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "phone", "role"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn absent_optional_values_pass() {
        let mut v = Validator::new();
        v.email("email", None, "bad").http_url("website", None, "bad").range("rating", None, 1.0, 10.0, "bad");
        assert!(v.finish().is_ok());
    }
}
