use serde::Deserialize;

use crate::database::schema::{Collection, Field, FieldKind, Unique};
use crate::database::store::{Document, StoreError};
use crate::database::validation::Validator;

use super::{empty, put};

pub static REVIEWS: Collection = Collection {
    name: "reviews",
    fields: &[
        Field::new("id", FieldKind::Id),
        Field::new("title", FieldKind::Text),
        Field::new("text", FieldKind::Text),
        Field::new("rating", FieldKind::Integer),
        Field::new("bootcamp", FieldKind::Id),
        Field::new("user", FieldKind::Id),
        Field::new("created_at", FieldKind::Timestamp),
    ],
    unique: &[Unique { name: "reviews_bootcamp_user_key", columns: &["bootcamp", "user"] }],
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

impl ReviewInput {
    fn validate(&self, creating: bool) -> Result<(), StoreError> {
        let mut v = Validator::new();
        if creating {
            v.required("title", self.title.as_deref(), "Please add a title for the review")
                .required("text", self.text.as_deref(), "Please add some text")
                .required("rating", self.rating.as_ref(), "Please add a rating between 1 and 10");
        }
        v.max_len("title", self.title.as_deref(), 100, "Title can not be more than 100 characters")
            .range("rating", self.rating.map(|r| r as f64), 1.0, 10.0, "Please add a rating between 1 and 10")
            .finish()
    }

    pub fn validate_new(&self) -> Result<(), StoreError> {
        self.validate(true)
    }

    pub fn validate_changes(&self) -> Result<(), StoreError> {
        self.validate(false)
    }

    pub fn into_document(self) -> Document {
        let mut doc = empty();
        put(&mut doc, "title", self.title.map(|s| s.trim().to_string()));
        put(&mut doc, "text", self.text);
        put(&mut doc, "rating", self.rating);
        doc
    }
}
