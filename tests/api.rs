use std::{collections::HashMap, path::Path, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use databyte::{
    application::collections::CollectionService,
    domain::types::CacheTier,
    infra::{
        http::{HttpState, build_router},
        store::FsContentStore,
    },
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

fn content_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "projects",
        &json!([
            {"id": "p1", "name": "Face Attendance", "category": "cv", "status": "deployed"},
            {"id": "p2", "name": "Admin Bot", "category": "nlp", "status": "deployed"},
            {"id": "p3", "name": "Segmentation", "category": "Computer Vision", "status": "research"},
            {"id": "p4", "name": "Pose", "category": "cv", "status": "completed"},
            {"id": "p5", "name": "Depth", "category": "CV", "status": "deployed"},
            {"id": "p6", "name": "Game Agent", "category": "rl", "status": "research"},
            {"id": "p7", "name": "Tracker", "category": "cv", "status": "in-progress"}
        ]),
    );
    write(
        dir.path(),
        "members",
        &json!([
            {"id": "m1", "name": "A", "domain": "Computer Vision", "batch": "2028"},
            {"id": "m2", "name": "B", "domain": "Web Development", "batch": "2027"}
        ]),
    );
    write(
        dir.path(),
        "blogs",
        &json!([
            {"id": "b1", "title": "Old", "date": "2023-01-02"},
            {"id": "b2", "title": "New", "date": "2024-06-30"}
        ]),
    );
    write(dir.path(), "stats", &json!({"members": 48, "projects": 7}));
    dir
}

fn write(dir: &Path, name: &str, value: &Value) {
    std::fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_vec(value).expect("serialize"),
    )
    .expect("write content");
}

fn router(dir: &Path, tiers: HashMap<String, CacheTier>) -> Router {
    let service = CollectionService::new(Arc::new(FsContentStore::new(dir)))
        .with_tier_overrides(tiers);
    build_router(HttpState {
        collections: Arc::new(service),
    })
}

async fn get(router: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn ids(body: &Value) -> Vec<&str> {
    body["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|record| record["id"].as_str().expect("id"))
        .collect()
}

fn cache_control(headers: &HeaderMap) -> &str {
    headers
        .get("cache-control")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn filtered_page_reports_pagination_over_the_matching_subset() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, headers, body) =
        get(&app, "/collection/projects?category=cv&page=1&limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["p1", "p3"]);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "limit": 2, "total": 5, "totalPages": 3, "hasMore": true})
    );
    assert_eq!(cache_control(&headers), NO_STORE);
    assert_eq!(headers.get("pragma").map(|v| v.as_bytes()), Some(&b"no-cache"[..]));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, _, body) = get(&app, "/collection/projects?category=cv&page=4&limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn malformed_parameters_are_coerced() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, _, body) =
        get(&app, "/collection/projects?page=-3&limit=500&category=&bogus=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 50);
    assert_eq!(body["pagination"]["total"], 7);
    assert_eq!(ids(&body).len(), 7);

    let (status, _, body) = get(&app, "/collection/members?limit=abc&page=two").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 9);
}

#[tokio::test]
async fn blogs_are_newest_first_unless_asked_otherwise() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (_, _, newest) = get(&app, "/collection/blogs").await;
    assert_eq!(ids(&newest), vec!["b2", "b1"]);

    let (_, _, oldest) = get(&app, "/collection/blogs?sort=oldest").await;
    assert_eq!(ids(&oldest), vec!["b1", "b2"]);
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, headers, body) = get(&app, "/collection/secrets").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(cache_control(&headers), NO_STORE);
}

#[tokio::test]
async fn unreadable_collection_fails_alone() {
    let dir = content_dir();
    std::fs::write(dir.path().join("members.json"), "[{\"id\": ").expect("corrupt");
    let app = router(dir.path(), HashMap::new());

    let (status, headers, body) = get(&app, "/collection/members").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": {"code": "store_unavailable", "message": "Failed to load collection"}})
    );
    assert_eq!(cache_control(&headers), NO_STORE);

    let (status, _, _) = get(&app, "/collection/projects").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn content_changes_are_visible_on_the_next_request() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (_, _, before) = get(&app, "/collection/members").await;
    assert_eq!(before["pagination"]["total"], 2);

    write(
        dir.path(),
        "members",
        &json!([{"id": "m1"}, {"id": "m2"}, {"id": "m3"}]),
    );
    let (_, _, after) = get(&app, "/collection/members").await;
    assert_eq!(after["pagination"]["total"], 3);
}

#[tokio::test]
async fn stats_use_the_long_tier() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, headers, body) = get(&app, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"], 48);
    assert_eq!(
        cache_control(&headers),
        "public, max-age=3600, s-maxage=86400, stale-while-revalidate=172800"
    );
    assert!(!headers.contains_key("surrogate-control"));
}

#[tokio::test]
async fn configured_tier_applies_to_collection_responses() {
    let dir = content_dir();
    let app = router(
        dir.path(),
        HashMap::from([("blogs".to_string(), CacheTier::Short)]),
    );

    let (_, headers, _) = get(&app, "/collection/blogs").await;
    assert_eq!(
        cache_control(&headers),
        "public, max-age=60, s-maxage=300, stale-while-revalidate=600"
    );

    let (_, headers, _) = get(&app, "/collection/projects").await;
    assert_eq!(cache_control(&headers), NO_STORE);
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, headers, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
    assert_eq!(cache_control(&headers), NO_STORE);
}

#[tokio::test]
async fn unknown_routes_are_json_not_found() {
    let dir = content_dir();
    let app = router(dir.path(), HashMap::new());

    let (status, _, body) = get(&app, "/collections").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
