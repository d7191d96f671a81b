use serde::Deserialize;

use crate::database::schema::{Collection, Field, FieldKind, Literal};
use crate::database::store::{Document, StoreError};
use crate::database::validation::{string_or_number, Validator};

use super::{empty, put};

pub static COURSES: Collection = Collection {
    name: "courses",
    fields: &[
        Field::new("id", FieldKind::Id),
        Field::new("title", FieldKind::Text),
        Field::new("description", FieldKind::Text),
        Field::new("weeks", FieldKind::Text),
        Field::new("tuition", FieldKind::Number),
        Field::new("minimum_skill", FieldKind::Text),
        Field::new("scholarship_available", FieldKind::Boolean).default(Literal::Bool(false)),
        Field::new("bootcamp", FieldKind::Id),
        Field::new("user", FieldKind::Id),
        Field::new("created_at", FieldKind::Timestamp),
    ],
    unique: &[],
};

pub const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

impl CourseInput {
    fn validate(&self, creating: bool) -> Result<(), StoreError> {
        let mut v = Validator::new();
        if creating {
            v.required("title", self.title.as_deref(), "Please add a course title")
                .required("description", self.description.as_deref(), "Please add a description")
                .required("weeks", self.weeks.as_deref(), "Please add number of weeks")
                .required("tuition", self.tuition.as_ref(), "Please add a tuition cost")
                .required("minimum_skill", self.minimum_skill.as_deref(), "Please add a minimum skill");
        }
        v.range("tuition", self.tuition, 0.0, f64::MAX, "Tuition can not be negative")
            .one_of(
                "minimum_skill",
                self.minimum_skill.as_deref(),
                &SKILLS,
                "Minimum skill must be beginner, intermediate or advanced",
            )
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
        put(&mut doc, "description", self.description);
        put(&mut doc, "weeks", self.weeks);
        put(&mut doc, "tuition", self.tuition);
        put(&mut doc, "minimum_skill", self.minimum_skill);
        put(&mut doc, "scholarship_available", self.scholarship_available);
        doc
    }
}
