//! Forum CRUD, permission gates and optimistic concurrency over HTTP.

mod common;

use axum::http::header::LOCATION;
use axum::http::{Method, StatusCode};
use common::{body_json, request, TestApp};
use serde_json::{json, Value};

async fn create(app: &TestApp, token: &str, title: &str, content: &str) -> Value {
    let response = app
        .post_json("/v1/forum", Some(token), json!({ "title": title, "content": content }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

#[tokio::test]
async fn create_returns_location_and_version_one() {
    let app = TestApp::new();
    let token = app.writer("w@example.com").await;

    let response = app
        .post_json("/v1/forum", Some(&token), json!({ "title": "Hello", "content": "World" }))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap().to_string();
    let json = body_json(response).await;
    assert_eq!(json["data"]["version"], 1);
    assert_eq!(json["data"]["title"], "Hello");
    assert!(json["data"].get("created_at").is_none());
    assert_eq!(location, format!("/v1/forum/{}", json["data"]["id"]));
}

#[tokio::test]
async fn readers_cannot_write() {
    let app = TestApp::new();
    let token = app.activated_user("r@example.com").await;

    let response = app
        .post_json("/v1/forum", Some(&token), json!({ "title": "t", "content": "c" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    // Reading is allowed.
    assert_eq!(app.get("/v1/forum", Some(&token)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_callers_must_authenticate_before_ids_are_checked() {
    let app = TestApp::new();
    for uri in ["/v1/forum", "/v1/forum/1", "/v1/forum/abc"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn invalid_ids_are_not_found() {
    let app = TestApp::new();
    let token = app.writer("ids@example.com").await;

    for uri in ["/v1/forum/abc", "/v1/forum/0", "/v1/forum/-1", "/v1/forum/999"] {
        let response = app.get(uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn field_rules_are_enforced() {
    let app = TestApp::new();
    let token = app.writer("rules@example.com").await;

    let response = app
        .post_json(
            "/v1/forum",
            Some(&token),
            json!({ "title": "x".repeat(201), "content": "   " }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["fields"]["title"], "must not be more than 200 characters long");
    assert_eq!(json["fields"]["content"], "must be provided");

    let response = app.post_json("/v1/forum", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn patch_updates_only_given_fields_and_bumps_version() {
    let app = TestApp::new();
    let token = app.writer("patch@example.com").await;
    let forum = create(&app, &token, "Title", "Body").await;
    let uri = format!("/v1/forum/{}", forum["id"]);

    let response = app
        .patch_json(&uri, Some(&token), json!({ "content": "New body" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Title");
    assert_eq!(json["data"]["content"], "New body");
    assert_eq!(json["data"]["version"], 2);

    let shown = body_json(app.get(&uri, Some(&token)).await).await;
    assert_eq!(shown["data"]["version"], 2);
}

#[tokio::test]
async fn stale_expected_version_is_an_edit_conflict() {
    let app = TestApp::new();
    let token = app.writer("cas@example.com").await;
    let forum = create(&app, &token, "Title", "Body").await;
    let uri = format!("/v1/forum/{}", forum["id"]);

    let patch = |version: &str, title: &str| {
        let mut req = request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "title": title })),
        );
        req.headers_mut()
            .insert("x-expected-version", version.parse().unwrap());
        req
    };

    let response = app.send(patch("1", "Changed")).await;
    assert_eq!(response.status(), StatusCode::OK);

    // A second writer still holding version 1 loses.
    let response = app.send(patch("1", "Stale")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "EDIT_CONFLICT");

    // It re-reads, sees version 2 and retries against that.
    let shown = body_json(app.get(&uri, Some(&token)).await).await;
    assert_eq!(shown["data"]["version"], 2);
    assert_eq!(shown["data"]["title"], "Changed");

    let response = app.send(patch("2", "Retried")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version"], 3);
    assert_eq!(json["data"]["title"], "Retried");

    let response = app.send(patch("two", "Ignored")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_then_everything_is_not_found() {
    let app = TestApp::new();
    let token = app.writer("del@example.com").await;
    let forum = create(&app, &token, "Title", "Body").await;
    let uri = format!("/v1/forum/{}", forum["id"]);

    let response = app.delete(&uri, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["message"], "forum successfully deleted");

    assert_eq!(app.get(&uri, Some(&token)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&token)).await.status(), StatusCode::NOT_FOUND);
    let response = app
        .patch_json(&uri, Some(&token), json!({ "title": "again" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_sorts_and_pages() {
    let app = TestApp::new();
    let token = app.writer("list@example.com").await;
    create(&app, &token, "Rust tips", "ownership").await;
    create(&app, &token, "Go tips", "goroutines").await;
    create(&app, &token, "Rust news", "editions").await;

    let json = body_json(app.get("/v1/forum?title=rust&sort=-title", Some(&token)).await).await;
    let titles: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Rust tips", "Rust news"]);
    assert_eq!(json["metadata"]["total_records"], 2);

    let json = body_json(app.get("/v1/forum?page=2&page_size=2", Some(&token)).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(
        json["metadata"],
        json!({
            "current_page": 2,
            "page_size": 2,
            "first_page": 1,
            "last_page": 2,
            "total_records": 3
        })
    );

    let json = body_json(app.get("/v1/forum?title=python", Some(&token)).await).await;
    assert_eq!(json["data"], json!([]));
    assert_eq!(json["metadata"], json!({}));
}

#[tokio::test]
async fn listing_rejects_bad_paging_and_sort() {
    let app = TestApp::new();
    let token = app.activated_user("bad-list@example.com").await;

    let response = app
        .get("/v1/forum?page=x&page_size=101&sort=password", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["fields"]["page"], "must be an integer value");
    assert_eq!(json["fields"]["page_size"], "must be a maximum of 100");
    assert_eq!(json["fields"]["sort"], "invalid sort value");

    let response = app.get("/v1/forum?page=0", Some(&token)).await;
    assert_eq!(
        body_json(response).await["fields"]["page"],
        "must be greater than zero"
    );
}
