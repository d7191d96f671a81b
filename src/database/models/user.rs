use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::schema::{Collection, Field, FieldKind, Literal, Unique};
use crate::database::store::{Document, StoreError};
use crate::database::validation::Validator;
use crate::types::Role;

use super::{empty, put};

pub static USERS: Collection = Collection {
    name: "users",
    fields: &[
        Field::new("id", FieldKind::Id),
        Field::new("name", FieldKind::Text),
        Field::new("email", FieldKind::Text),
        Field::new("role", FieldKind::Text).default(Literal::Str("user")),
        Field::new("password", FieldKind::Text).hidden(),
        Field::new("reset_password_token", FieldKind::Text).hidden(),
        Field::new("reset_password_expire", FieldKind::Timestamp).hidden(),
        Field::new("created_at", FieldKind::Timestamp),
    ],
    unique: &[Unique { name: "users_email_key", columns: &["email"] }],
};

/// A user row including its credential columns. Only used server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expire: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub fn from_document(document: Document) -> Result<Self, StoreError> {
        serde_json::from_value(serde_json::Value::Object(document))
            .map_err(|e| StoreError::Query(format!("malformed user row: {}", e)))
    }
}

/// Body of register, admin create and admin update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

const PUBLIC_ROLES: [&str; 2] = ["user", "publisher"];
const ALL_ROLES: [&str; 3] = ["user", "publisher", "admin"];

impl UserInput {
    fn validate(&self, creating: bool, allow_admin: bool) -> Result<(), StoreError> {
        let roles: &[&str] = if allow_admin { &ALL_ROLES } else { &PUBLIC_ROLES };
        let mut v = Validator::new();
        if creating {
            v.required("name", self.name.as_deref(), "Please add a name")
                .required("email", self.email.as_deref(), "Please add an email")
                .required("password", self.password.as_deref(), "Please add a password");
        }
        v.email("email", self.email.as_deref(), "Please add a valid email")
            .min_len("password", self.password.as_deref(), 6, "Password must be at least 6 characters")
            .one_of(
                "role",
                self.role.as_deref(),
                roles,
                if allow_admin { "Role must be user, publisher or admin" } else { "Role must be user or publisher" },
            )
            .finish()
    }

    pub fn validate_new(&self, allow_admin: bool) -> Result<(), StoreError> {
        self.validate(true, allow_admin)
    }

    pub fn validate_changes(&self, allow_admin: bool) -> Result<(), StoreError> {
        self.validate(false, allow_admin)
    }

    /// A replacement password from the update or reset flows.
    pub fn validate_new_password(&self) -> Result<(), StoreError> {
        Validator::new()
            .required("password", self.password.as_deref(), "Please add a password")
            .min_len("password", self.password.as_deref(), 6, "Password must be at least 6 characters")
            .finish()
    }

    /// Document without the password; callers store the hash separately.
    pub fn into_document(self) -> Document {
        let mut doc = empty();
        put(&mut doc, "name", self.name.map(|s| s.trim().to_string()));
        put(&mut doc, "email", self.email.map(|s| s.trim().to_lowercase()));
        put(&mut doc, "role", self.role);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_requires_fields() {
        let err = UserInput::default().validate_new(false).unwrap_err();
        match err {
            StoreError::Validation(errors) => {
                let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
                assert_eq!(messages, vec!["Please add a name", "Please add an email", "Please add a password"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn admin_role_only_when_allowed() {
        let input = UserInput {
            name: Some("A".into()),
            email: Some("a@b.com".into()),
            password: Some("123456".into()),
            role: Some("admin".into()),
        };
        assert!(input.validate_new(false).is_err());
        assert!(input.validate_new(true).is_ok());
    }

    #[test]
    fn replacement_passwords_need_six_characters() {
        let short = UserInput { password: Some("12345".into()), ..Default::default() };
        assert!(short.validate_new_password().is_err());
        assert!(UserInput::default().validate_new_password().is_err());
        let ok = UserInput { password: Some("123456".into()), ..Default::default() };
        assert!(ok.validate_new_password().is_ok());
    }

    #[test]
    fn account_reads_from_a_row() {
        let row = json!({
            "id": "0b9a4c2e-8a43-4a3e-9a3a-5d1f3f8e0c11",
            "name": "A", "email": "a@b.com", "role": "publisher", "password": "$2b$hash",
            "reset_password_token": null, "reset_password_expire": null,
            "created_at": "2024-01-01T00:00:00.000000Z",
        });
        let account = UserAccount::from_document(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(account.role, Role::Publisher);
        assert!(account.reset_password_expire.is_none());
    }
}
