mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestApp;

fn review(title: &str, rating: i64) -> Value {
    json!({"title": title, "text": "Learned a lot and found a job", "rating": rating})
}

async fn post_review(app: &TestApp, token: &str, bootcamp: &str, body: Value) -> Result<(StatusCode, Value)> {
    app.post(&format!("/bootcamps/{}/reviews", bootcamp), Some(token), body).await
}

async fn average_rating(app: &TestApp, bootcamp: &str) -> Result<Option<f64>> {
    let (_, body) = app.get(&format!("/bootcamps/{}", bootcamp), None).await?;
    Ok(body["data"]["average_rating"].as_f64())
}

#[tokio::test]
async fn reviews_keep_average_rating_current() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let bootcamp = app.create_bootcamp(&admin, "Devworks").await?;
    let alice = app.register("Alice", "alice@gmail.com", "user").await?;
    let bob = app.register("Bob", "bob@gmail.com", "user").await?;

    let (status, body) = post_review(&app, &alice, &bootcamp, review("Okay", 7)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let alice_review = body["data"]["id"].as_str().context("review id")?.to_string();
    assert_eq!(average_rating(&app, &bootcamp).await?, Some(7.0));

    let (status, _) = post_review(&app, &bob, &bootcamp, review("Great", 10)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(average_rating(&app, &bootcamp).await?, Some(8.5));

    let (status, _) = app.put(&format!("/reviews/{}", alice_review), Some(&alice), json!({"rating": 9})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(average_rating(&app, &bootcamp).await?, Some(9.5));

    let (status, _) = app.delete(&format!("/reviews/{}", alice_review), Some(&alice)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(average_rating(&app, &bootcamp).await?, Some(10.0));
    Ok(())
}

#[tokio::test]
async fn one_review_per_user_and_bootcamp() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let devworks = app.create_bootcamp(&admin, "Devworks").await?;
    let modern = app.create_bootcamp(&admin, "ModernTech").await?;
    let alice = app.register("Alice", "alice@gmail.com", "user").await?;

    post_review(&app, &alice, &devworks, review("First", 8)).await?;
    let (status, body) = post_review(&app, &alice, &devworks, review("Second", 3)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate Field");

    let (status, _) = post_review(&app, &alice, &modern, review("Elsewhere", 6)).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn publishers_cannot_review() -> Result<()> {
    let app = common::spawn_app().await?;
    let publisher = app.register("Pub", "pub@gmail.com", "publisher").await?;
    let bootcamp = app.create_bootcamp(&publisher, "Devworks").await?;

    let (status, body) = post_review(&app, &publisher, &bootcamp, review("Mine is best", 10)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User role publisher is not authorized to access this route");
    Ok(())
}

#[tokio::test]
async fn review_validation() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let bootcamp = app.create_bootcamp(&admin, "Devworks").await?;
    let alice = app.register("Alice", "alice@gmail.com", "user").await?;

    let (status, body) = post_review(&app, &alice, &bootcamp, review("Too good", 11)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(["Please add a rating between 1 and 10"]));

    let (status, body) = post_review(&app, &alice, &bootcamp, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!(["Please add a title for the review", "Please add some text", "Please add a rating between 1 and 10"])
    );

    let missing = uuid::Uuid::new_v4();
    let (status, body) = post_review(&app, &alice, &missing.to_string(), review("Ghost", 5)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No bootcamp with the id of {}", missing));
    Ok(())
}

#[tokio::test]
async fn only_the_author_or_admin_edits_a_review() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let bootcamp = app.create_bootcamp(&admin, "Devworks").await?;
    let alice = app.register("Alice", "alice@gmail.com", "user").await?;
    let bob = app.register("Bob", "bob@gmail.com", "user").await?;

    let (_, body) = post_review(&app, &alice, &bootcamp, review("Okay", 7)).await?;
    let id = body["data"]["id"].as_str().context("review id")?.to_string();

    let (status, body) = app.put(&format!("/reviews/{}", id), Some(&bob), json!({"title": "Hacked"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let bob_id = app.me(&bob).await?["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["error"], format!("User {} is not authorized to update review {}", bob_id, id));

    let (status, body) = app.put(&format!("/reviews/{}", id), Some(&admin), json!({"title": "Moderated"})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Moderated");

    let (status, _) = app.delete(&format!("/reviews/{}", id), Some(&bob)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/reviews/{}", id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/reviews/{}", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No review found with the id of {}", id));
    Ok(())
}

#[tokio::test]
async fn reviews_are_listed_with_their_bootcamp() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let bootcamp = app.create_bootcamp(&admin, "Devworks").await?;
    let alice = app.register("Alice", "alice@gmail.com", "user").await?;
    let (_, body) = post_review(&app, &alice, &bootcamp, review("Okay", 7)).await?;
    let id = body["data"]["id"].as_str().context("review id")?.to_string();

    let (_, body) = app.get(&format!("/reviews/{}", id), None).await?;
    assert_eq!(body["data"]["bootcamp"]["name"], "Devworks");

    let (_, body) = app.get(&format!("/bootcamps/{}/reviews", bootcamp), None).await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["title"], "Okay");

    let (_, body) = app.get("/reviews", None).await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["pagination"], json!({}));
    Ok(())
}
