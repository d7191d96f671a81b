use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::auth::password::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{BOOTCAMPS, COURSES, REVIEWS, USERS};
use crate::database::store::{Document, DocumentStore};
use crate::database::{DatabaseManager, PgStore};
use crate::services::aggregates::{refresh_average_cost, refresh_average_rating};
use crate::services::bootcamps::location_document;
use crate::services::geocoder::{Geocoder, MapQuestGeocoder};
use crate::services::slug::slugify;

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import users.json, bootcamps.json, courses.json and reviews.json")]
    Import {
        #[arg(help = "Directory holding the fixture files", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp, course and review")]
    Destroy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

pub async fn handle(cmd: SeedCommands, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    let store = PgStore::new(pool);

    match cmd {
        SeedCommands::Import { dir } => {
            let geocoder = config.geocoder.api_key.as_ref().map(|_| MapQuestGeocoder::new(&config.geocoder));
            let geocoder = geocoder.as_ref().map(|g| g as &dyn Geocoder);
            let report = import(&store, geocoder, &dir, config.security.bcrypt_cost).await?;
            output_success(
                output_format,
                "Data imported",
                Some(json!({
                    "users": report.users,
                    "bootcamps": report.bootcamps,
                    "courses": report.courses,
                    "reviews": report.reviews,
                })),
            )
        }
        SeedCommands::Destroy => {
            let removed = destroy(&store).await?;
            output_success(output_format, "Data destroyed", Some(json!({ "removed": removed })))
        }
    }
}

async fn read_fixture(dir: &Path, name: &str) -> anyhow::Result<Vec<Document>> {
    let path = dir.join(name);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let rows: Vec<Document> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(rows)
}

/// Load fixtures in dependency order. Plain-text passwords are hashed; bootcamp
/// addresses are geocoded when a geocoder is available and dropped otherwise.
pub async fn import(
    store: &dyn DocumentStore,
    geocoder: Option<&dyn Geocoder>,
    dir: &Path,
    bcrypt_cost: u32,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for mut user in read_fixture(dir, "users.json").await? {
        if let Some(plain) = user.get("password").and_then(Value::as_str).map(str::to_string) {
            user.insert("password".into(), Value::String(hash_password(&plain, bcrypt_cost).await?));
        }
        store.insert(&USERS, user).await?;
        report.users += 1;
    }

    for mut bootcamp in read_fixture(dir, "bootcamps.json").await? {
        if let Some(name) = bootcamp.get("name").and_then(Value::as_str) {
            if !bootcamp.contains_key("slug") {
                let slug = slugify(name);
                bootcamp.insert("slug".into(), Value::String(slug));
            }
        }
        if let Some(Value::String(address)) = bootcamp.remove("address") {
            if let Some(geocoder) = geocoder {
                let location = geocoder.geocode(&address).await?;
                bootcamp.extend(location_document(&location));
            }
        }
        store.insert(&BOOTCAMPS, bootcamp).await?;
        report.bootcamps += 1;
    }

    let mut touched = BTreeSet::new();
    for course in read_fixture(dir, "courses.json").await? {
        let row = store.insert(&COURSES, course).await?;
        touched.insert(row.get("bootcamp").and_then(Value::as_str).unwrap_or_default().to_string());
        report.courses += 1;
    }
    for review in read_fixture(dir, "reviews.json").await? {
        let row = store.insert(&REVIEWS, review).await?;
        touched.insert(row.get("bootcamp").and_then(Value::as_str).unwrap_or_default().to_string());
        report.reviews += 1;
    }

    for bootcamp in touched.iter().filter(|id| !id.is_empty()) {
        refresh_average_cost(store, bootcamp).await?;
        refresh_average_rating(store, bootcamp).await?;
    }

    tracing::info!(?report, "fixtures imported");
    Ok(report)
}

/// Remove all rows, children first.
pub async fn destroy(store: &dyn DocumentStore) -> anyhow::Result<u64> {
    let mut removed = 0;
    for collection in [&REVIEWS, &COURSES, &BOOTCAMPS, &USERS] {
        removed += store.delete_many(collection, &json!({})).await?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    async fn write(dir: &Path, name: &str, value: Value) {
        tokio::fs::write(dir.join(name), value.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn imports_then_destroys_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let owner = uuid::Uuid::new_v4().to_string();
        let bootcamp = uuid::Uuid::new_v4().to_string();

        write(dir.path(), "users.json", json!([
            {"id": owner, "name": "Publisher", "email": "publisher@gmail.com", "role": "publisher", "password": "123456"}
        ]))
        .await;
        write(dir.path(), "bootcamps.json", json!([
            {"id": bootcamp, "name": "Devworks Bootcamp", "description": "d", "careers": ["Web Development"],
             "address": "233 Bay State Rd Boston MA 02215", "user": owner}
        ]))
        .await;
        write(dir.path(), "courses.json", json!([
            {"title": "Front End", "description": "d", "weeks": "8", "tuition": 8000, "minimum_skill": "beginner",
             "bootcamp": bootcamp, "user": owner}
        ]))
        .await;
        write(dir.path(), "reviews.json", json!([])).await;

        let store = MemoryStore::new();
        let report = import(&store, None, dir.path(), 4).await.unwrap();
        assert_eq!(report, SeedReport { users: 1, bootcamps: 1, courses: 1, reviews: 0 });

        let camp = store.find_by_id(&BOOTCAMPS, &bootcamp).await.unwrap().unwrap();
        assert_eq!(camp["slug"], "devworks-bootcamp");
        assert_eq!(camp["average_cost"].as_f64(), Some(8000.0));
        assert!(!camp.contains_key("address"));

        let user = store.find_by_id(&USERS, &owner).await.unwrap().unwrap();
        assert_ne!(user["password"], "123456");

        assert_eq!(destroy(&store).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = import(&MemoryStore::new(), None, dir.path(), 4).await.unwrap_err();
        assert!(err.to_string().contains("users.json"));
    }
}
