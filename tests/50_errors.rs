mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> Result<()> {
    let app = common::spawn_app().await?;
    let res = app
        .client
        .post(app.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{\"email\": ")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    let messages = body["error"].as_array().cloned().unwrap_or_default();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].as_str().map_or(false, |m| !m.is_empty()));
    Ok(())
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() -> Result<()> {
    let app = common::spawn_app().await?;
    let (status, body) = app.get("/nothing-here", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Route /api/v1/nothing-here not found");
    Ok(())
}

#[tokio::test]
async fn malformed_ids_are_not_found_everywhere() -> Result<()> {
    let app = common::spawn_app().await?;
    for path in ["/courses/abc", "/reviews/abc", "/bootcamps/abc/courses"] {
        let (status, body) = app.get(path, None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        assert_eq!(body["error"], "Resource not found with id of abc", "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn responses_carry_security_headers() -> Result<()> {
    let app = common::spawn_app().await?;
    let res = app.client.get(app.url("/health")).send().await?;
    let headers = res.headers();
    assert_eq!(headers.get("x-content-type-options").and_then(|v| v.to_str().ok()), Some("nosniff"));
    assert_eq!(headers.get("x-frame-options").and_then(|v| v.to_str().ok()), Some("DENY"));
    assert_eq!(headers.get("referrer-policy").and_then(|v| v.to_str().ok()), Some("no-referrer"));
    Ok(())
}

#[tokio::test]
async fn rate_limit_rejects_bursts() -> Result<()> {
    let app = common::spawn_app_with(|config| {
        config.api.enable_rate_limiting = true;
        config.api.rate_limit_requests = 3;
        config.api.rate_limit_window_secs = 600;
    })
    .await?;

    let mut limited = None;
    for _ in 0..10 {
        let (status, body) = app.get("/bootcamps", None).await?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(body);
            break;
        }
        assert_eq!(status, StatusCode::OK);
    }
    let body = limited.ok_or_else(|| anyhow::anyhow!("never rate limited"))?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Too many requests, please try again later");
    Ok(())
}

#[tokio::test]
async fn unknown_sort_fields_are_rejected() -> Result<()> {
    let app = common::spawn_app().await?;
    let res = app.client.get(app.url("/bootcamps")).query(&[("sort", "secret")]).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], serde_json::json!(["Unknown field 'secret'"]));
    Ok(())
}
