use serde::Deserialize;
use serde_json::Value;

use crate::database::schema::{Collection, Field, FieldKind, Literal, Unique};
use crate::database::store::{Document, StoreError};
use crate::database::validation::Validator;

use super::{empty, put};

pub static BOOTCAMPS: Collection = Collection {
    name: "bootcamps",
    fields: &[
        Field::new("id", FieldKind::Id),
        Field::new("name", FieldKind::Text),
        Field::new("slug", FieldKind::Text),
        Field::new("description", FieldKind::Text),
        Field::new("website", FieldKind::Text),
        Field::new("phone", FieldKind::Text),
        Field::new("email", FieldKind::Text),
        Field::new("location_type", FieldKind::Text),
        Field::new("longitude", FieldKind::Number),
        Field::new("latitude", FieldKind::Number),
        Field::new("formatted_address", FieldKind::Text),
        Field::new("street", FieldKind::Text),
        Field::new("city", FieldKind::Text),
        Field::new("state", FieldKind::Text),
        Field::new("zipcode", FieldKind::Text),
        Field::new("country", FieldKind::Text),
        Field::new("careers", FieldKind::TextList).default(Literal::EmptyList),
        Field::new("average_rating", FieldKind::Number),
        Field::new("average_cost", FieldKind::Number),
        Field::new("photo", FieldKind::Text).default(Literal::Str("no-photo.jpg")),
        Field::new("housing", FieldKind::Boolean).default(Literal::Bool(false)),
        Field::new("job_assistance", FieldKind::Boolean).default(Literal::Bool(false)),
        Field::new("job_guarantee", FieldKind::Boolean).default(Literal::Bool(false)),
        Field::new("accept_gi", FieldKind::Boolean).default(Literal::Bool(false)),
        Field::new("user", FieldKind::Id),
        Field::new("created_at", FieldKind::Timestamp),
    ],
    unique: &[Unique { name: "bootcamps_name_key", columns: &["name"] }],
};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// Writable bootcamp fields. `address` is geocoded into the location columns
/// and never stored itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    fn validate(&self, creating: bool) -> Result<(), StoreError> {
        let mut v = Validator::new();
        if creating {
            v.required("name", self.name.as_deref(), "Please add a name")
                .required("description", self.description.as_deref(), "Please add a description")
                .required("address", self.address.as_deref(), "Please add an address")
                .required("careers", self.careers.as_ref(), "Please add at least one career");
        }
        if let Some(name) = &self.name {
            v.check(!name.trim().is_empty(), "name", "Please add a name");
        }
        if let Some(careers) = &self.careers {
            v.check(
                careers.iter().all(|c| CAREERS.contains(&c.as_str())),
                "careers",
                "Careers must be one of Web Development, Mobile Development, UI/UX, Data Science, Business, Other",
            );
        }
        v.max_len("name", self.name.as_deref().map(str::trim), 50, "Name can not be more than 50 characters")
            .max_len("description", self.description.as_deref(), 500, "Description can not be more than 500 characters")
            .http_url("website", self.website.as_deref(), "Please use a valid URL with HTTP or HTTPS")
            .max_len("phone", self.phone.as_deref(), 20, "Phone number can not be longer than 20 characters")
            .email("email", self.email.as_deref(), "Please add a valid email")
            .finish()
    }

    pub fn validate_new(&self) -> Result<(), StoreError> {
        self.validate(true)
    }

    pub fn validate_changes(&self) -> Result<(), StoreError> {
        self.validate(false)
    }

    /// Splits off the address and returns the remaining columns.
    pub fn into_document(self) -> (Option<String>, Document) {
        let mut doc = empty();
        put(&mut doc, "name", self.name.map(|s| s.trim().to_string()));
        put(&mut doc, "description", self.description);
        put(&mut doc, "website", self.website);
        put(&mut doc, "phone", self.phone);
        put(&mut doc, "email", self.email);
        put(&mut doc, "careers", self.careers.map(|c| Value::from(c)));
        put(&mut doc, "housing", self.housing);
        put(&mut doc, "job_assistance", self.job_assistance);
        put(&mut doc, "job_guarantee", self.job_guarantee);
        put(&mut doc, "accept_gi", self.accept_gi);
        (self.address, doc)
    }
}
