pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{BootcampInput, BOOTCAMPS};
pub use course::{CourseInput, COURSES};
pub use review::{ReviewInput, REVIEWS};
pub use user::{UserAccount, UserInput, USERS};

use serde_json::{Map, Value};

use crate::database::store::Document;

/// Insert `value` under `key` when present.
pub(crate) fn put<T: Into<Value>>(doc: &mut Document, key: &str, value: Option<T>) {
    if let Some(value) = value {
        doc.insert(key.to_string(), value.into());
    }
}

pub(crate) fn empty() -> Document {
    Map::new()
}
