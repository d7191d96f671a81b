#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use bootcamp_api::app::{router, AppState};
use bootcamp_api::auth::password::hash_password;
use bootcamp_api::config::AppConfig;
use bootcamp_api::database::models::USERS;
use bootcamp_api::database::{DocumentStore, MemoryStore};
use bootcamp_api::services::{GeoLocation, OutboxMailer, StaticGeocoder};

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<OutboxMailer>,
    pub upload_dir: tempfile::TempDir,
}

pub const BOSTON_ADDRESS: &str = "233 Bay State Rd Boston MA 02215";

pub fn boston() -> GeoLocation {
    GeoLocation {
        longitude: -71.104028,
        latitude: 42.350846,
        formatted_address: "233 Bay State Rd, Boston, MA 02215, US".into(),
        street: Some("233 Bay State Rd".into()),
        city: Some("Boston".into()),
        state: Some("MA".into()),
        zipcode: Some("02215".into()),
        country: Some("US".into()),
    }
}

pub fn beverly_hills() -> GeoLocation {
    GeoLocation {
        longitude: -118.406477,
        latitude: 34.090107,
        formatted_address: "Beverly Hills, CA 90210, US".into(),
        street: None,
        city: Some("Beverly Hills".into()),
        state: Some("CA".into()),
        zipcode: Some("90210".into()),
        country: Some("US".into()),
    }
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(|_| {}).await
}

/// Serve the full router over the in-memory store on a free port.
pub async fn spawn_app_with(configure: impl FnOnce(&mut AppConfig)) -> Result<TestApp> {
    let upload_dir = tempfile::tempdir()?;
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = 4;
    config.uploads.file_upload_path = upload_dir.path().to_path_buf();
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(OutboxMailer::new());
    // unlisted addresses fail to geocode
    let geocoder = Arc::new(
        StaticGeocoder::new()
            .with(BOSTON_ADDRESS, boston())
            .with("02215", boston())
            .with("90210", beverly_hills()),
    );

    let state = AppState::new(config, store.clone(), geocoder, outbox.clone());
    let app = router(state);

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    let test_app = TestApp {
        base_url: format!("http://127.0.0.1:{}/api/v1", port),
        client: reqwest::Client::new(),
        store,
        outbox,
        upload_dir,
    };
    test_app.wait_ready(Duration::from_secs(10)).await?;
    Ok(test_app)
}

impl TestApp {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn send(&self, method: reqwest::Method, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::POST, path, token, body).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::PUT, path, token, body).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.delete(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await?))
    }

    /// Register through the API and return the issued token.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({ "name": name, "email": email, "password": "123456", "role": role }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        body["token"].as_str().map(str::to_string).context("no token in register response")
    }

    /// Admins cannot self-register; insert one directly and log in.
    pub async fn admin(&self) -> Result<String> {
        let hash = hash_password("123456", 4).await?;
        let doc = json!({ "name": "Admin", "email": "admin@gmail.com", "role": "admin", "password": hash });
        self.store.insert(&USERS, doc.as_object().cloned().context("object")?).await?;
        self.login("admin@gmail.com", "123456").await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post("/auth/login", None, json!({ "email": email, "password": password }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["token"].as_str().map(str::to_string).context("no token in login response")
    }

    pub async fn me(&self, token: &str) -> Result<Value> {
        let (_, body) = self.get("/auth/me", Some(token)).await?;
        Ok(body["data"].clone())
    }

    /// Create a bootcamp and return its id.
    pub async fn create_bootcamp(&self, token: &str, name: &str) -> Result<String> {
        let (status, body) = self.post("/bootcamps", Some(token), bootcamp_body(name)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create bootcamp failed: {} {}", status, body);
        body["data"]["id"].as_str().map(str::to_string).context("no id")
    }

    pub async fn create_course(&self, token: &str, bootcamp: &str, title: &str, tuition: u64) -> Result<String> {
        let (status, body) = self
            .post(&format!("/bootcamps/{}/courses", bootcamp), Some(token), course_body(title, tuition))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create course failed: {} {}", status, body);
        body["data"]["id"].as_str().map(str::to_string).context("no id")
    }
}

pub fn bootcamp_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Full stack web development bootcamp",
        "website": "https://devworks.com",
        "phone": "(111) 111-1111",
        "email": "enroll@devworks.com",
        "address": BOSTON_ADDRESS,
        "careers": ["Web Development", "UI/UX", "Business"],
        "housing": true,
        "job_assistance": true,
    })
}

pub fn course_body(title: &str, tuition: u64) -> Value {
    json!({
        "title": title,
        "description": "Learn the front end",
        "weeks": 8,
        "tuition": tuition,
        "minimum_skill": "beginner",
        "scholarship_available": true,
    })
}
