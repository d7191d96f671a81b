mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn admins_manage_users() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    app.register("Alice", "alice@gmail.com", "user").await?;

    let (status, body) = app.get("/users", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body["data"].as_array().map_or(false, |rows| rows.iter().all(|u| u.get("password").is_none())));

    let (status, body) = app
        .post(
            "/users",
            Some(&admin),
            json!({"name": "Second Admin", "email": "second@gmail.com", "password": "123456", "role": "admin"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"].get("password").is_none());
    let id = body["data"]["id"].as_str().context("user id")?.to_string();
    app.login("second@gmail.com", "123456").await?;

    let (status, body) = app.get(&format!("/users/{}", id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "second@gmail.com");

    let (status, body) = app
        .put(&format!("/users/{}", id), Some(&admin), json!({"name": "Renamed", "password": "abcdef"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    app.login("second@gmail.com", "abcdef").await?;

    let (status, body) = app.delete(&format!("/users/{}", id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({}));

    let (status, body) = app.get(&format!("/users/{}", id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No user with the id of {}", id));
    Ok(())
}

#[tokio::test]
async fn user_management_is_admin_only() -> Result<()> {
    let app = common::spawn_app().await?;
    let publisher = app.register("Pub", "pub@gmail.com", "publisher").await?;

    let (status, body) = app.get("/users", Some(&publisher)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User role publisher is not authorized to access this route");

    let (status, _) = app.get("/users", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_created_users_are_validated() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;

    let (status, body) = app
        .post("/users", Some(&admin), json!({"name": "X", "email": "x@gmail.com", "password": "1", "role": "root"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!(["Password must be at least 6 characters", "Role must be user, publisher or admin"])
    );

    let (status, body) = app
        .post("/users", Some(&admin), json!({"name": "Dup", "email": "admin@gmail.com", "password": "123456"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate Field");
    Ok(())
}
