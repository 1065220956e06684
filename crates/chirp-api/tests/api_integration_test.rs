//! Integration tests for the chirp tracker HTTP API
//!
//! Builds the real router over an in-memory store and drives it with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chirp_api::signature::{sign_sha1, sign_sha256, SHA1_HEADER, SHA256_HEADER};
use chirp_api::{create_router, AppState, ServerConfig};
use chirp_store::{KeyValueStore, MemoryKeyValueStore};

const SECRET: &str = "s3cret";
const TOKEN: &str = "token abc";

fn config() -> ServerConfig {
    ServerConfig {
        secret_token: SECRET.to_string(),
        build_auth_tokens: vec![TOKEN.to_string()],
        max_kb: 100,
        ..Default::default()
    }
}

fn test_app_with(config: ServerConfig) -> (axum::Router, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let state = AppState::new(store.clone(), config);
    (create_router(state), store)
}

fn test_app() -> (axum::Router, Arc<MemoryKeyValueStore>) {
    test_app_with(config())
}

/// Helper to read response body as bytes
async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

fn form(payload: &Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}

fn push_payload(repo: &str, commit: &str) -> Value {
    json!({
        "head_commit": {"id": commit},
        "repository": {"full_name": repo}
    })
}

fn build_payload(commit: &str, legs: &[(&str, &str)]) -> Value {
    let matrix: Vec<Value> = legs
        .iter()
        .map(|(env, finished)| json!({"config": {"env": env}, "finished_at": finished}))
        .collect();
    json!({
        "commit": commit,
        "repository": {"owner_name": "a", "name": "b"},
        "matrix": matrix
    })
}

fn signed_push(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/github")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(SHA256_HEADER, sign_sha256(SECRET, body.as_bytes()))
        .body(Body::from(body))
        .unwrap()
}

fn authed_build(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/travis")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, TOKEN)
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ---------------------------------------------------------------
// Health endpoints
// ---------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = test_app();

    for path in ["/health", "/live", "/ready"] {
        let resp = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", path);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["status"], "ok");
    }
}

#[tokio::test]
async fn test_openapi_document() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert!(json["paths"]["/chirps"].is_object());
    assert!(json["paths"]["/github"].is_object());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    chirp_observability::init();
    let (app, _) = test_app();
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------
// Push ingestion
// ---------------------------------------------------------------

#[tokio::test]
async fn test_signed_push_is_recorded() {
    let (app, store) = test_app();

    let resp = app
        .oneshot(signed_push(form(&push_payload("a/b", "c1"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.into_body()).await, json!({"ok": "great"}));

    assert!(store.get("github:timestamps:a/b:c1").await.unwrap().is_some());
    let payload = store.get("github:payloads:a/b:c1").await.unwrap().unwrap();
    let stored: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(stored, push_payload("a/b", "c1"));
}

#[tokio::test]
async fn test_push_legacy_sha1_signature() {
    let (app, store) = test_app();
    let body = form(&push_payload("a/b", "c1"));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/github")
                .header(SHA1_HEADER, sign_sha1(SECRET, body.as_bytes()))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.get("github:timestamps:a/b:c1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_push_json_body() {
    let (app, store) = test_app();
    let body = push_payload("a/b", "c1").to_string();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/github")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SHA256_HEADER, sign_sha256(SECRET, body.as_bytes()))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.get("github:timestamps:a/b:c1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_push_without_signature_is_400() {
    let (app, store) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/github")
                .body(Body::from(form(&push_payload("a/b", "c1"))))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["code"], 400);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_push_with_bad_signature_is_403() {
    let (app, store) = test_app();
    let body = form(&push_payload("a/b", "c1"));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/github")
                .header(SHA256_HEADER, sign_sha256("wrong", body.as_bytes()))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_push_development_mode_skips_signature() {
    let (app, store) = test_app_with(ServerConfig {
        development: true,
        ..config()
    });

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/github")
                .body(Body::from(form(&push_payload("a/b", "c1"))))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.get("github:timestamps:a/b:c1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_push_missing_payload_is_400() {
    let (app, _) = test_app();
    let resp = app.oneshot(signed_push("other=1".to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "missing payload");
}

#[tokio::test]
async fn test_push_missing_repository_writes_nothing() {
    let (app, store) = test_app();
    let payload = json!({"head_commit": {"id": "c1"}});

    let resp = app.oneshot(signed_push(form(&payload))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_push_invalid_json_is_400() {
    let (app, store) = test_app();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", "{nope")
        .finish();

    let resp = app.oneshot(signed_push(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

// ---------------------------------------------------------------
// Build ingestion
// ---------------------------------------------------------------

#[tokio::test]
async fn test_build_is_recorded_per_partition() {
    let (app, store) = test_app();
    let payload = build_payload(
        "c1",
        &[
            ("QUEUE=fast", "2016-01-01T00:02:30Z"),
            ("FOO=bar", "2016-01-01T00:03:00Z"),
        ],
    );

    let resp = app.oneshot(authed_build(form(&payload))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp.into_body()).await,
        json!({"ok": "great", "partitions": 2})
    );

    let keys = store.keys("travis:timestamps:*").await.unwrap();
    assert_eq!(
        keys,
        vec![
            "travis:timestamps:a/b:fast:c1".to_string(),
            "travis:timestamps:a/b:unknown:c1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_build_without_token_is_401() {
    let (app, store) = test_app();
    let payload = build_payload("c1", &[("QUEUE=fast", "2016-01-01T00:02:30Z")]);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/travis")
                .header(header::AUTHORIZATION, "token nope")
                .body(Body::from(form(&payload)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_build_auth_disabled() {
    let (app, store) = test_app_with(ServerConfig {
        build_auth_disabled: true,
        ..config()
    });
    let payload = build_payload("c1", &[("QUEUE=fast", "2016-01-01T00:02:30Z")]);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/travis")
                .body(Body::from(form(&payload)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!store.is_empty().await);
}

#[tokio::test]
async fn test_build_missing_commit_is_400() {
    let (app, store) = test_app();
    let payload = json!({"repository": {"owner_name": "a", "name": "b"}});

    let resp = app.oneshot(authed_build(form(&payload))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

// ---------------------------------------------------------------
// Chirp reports
// ---------------------------------------------------------------

#[tokio::test]
async fn test_chirps_end_to_end() {
    let (app, _) = test_app_with(ServerConfig {
        development: true,
        ..config()
    });

    let resp = app
        .clone()
        .oneshot(signed_push(form(&push_payload("a/b", "c1"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Finished an hour in the future relative to the push
    let finished = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
    let payload = build_payload("c1", &[("QUEUE=fast", finished.as_str())]);
    let resp = app
        .clone()
        .oneshot(authed_build(form(&payload)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/chirps?repo=a/b&queue=fast")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["repo"], "a/b");
    assert_eq!(data[0]["partition"], "fast");
    assert_eq!(data[0]["commit"], "c1");
    let delta = data[0]["delta"].as_i64().unwrap();
    assert!((3590..=3610).contains(&delta), "delta = {}", delta);

    assert_eq!(json["meta"]["repo_filter"], "a/b");
    assert_eq!(json["meta"]["partition_filter"], "fast");
    assert_eq!(json["meta"]["limit"], 100);
    assert_eq!(json["meta"]["total_matched"], 1);
    assert_eq!(json["meta"]["most_recent"], data[0]);
}

#[tokio::test]
async fn test_chirps_unmatched_build_requires_nofilter() {
    let (app, _) = test_app();
    let payload = build_payload("c9", &[("QUEUE=fast", "2016-01-01T00:02:30Z")]);
    app.clone()
        .oneshot(authed_build(form(&payload)))
        .await
        .unwrap();

    let filtered = body_json(app.clone().oneshot(get("/chirps")).await.unwrap().into_body()).await;
    assert_eq!(filtered["data"], json!([]));
    assert_eq!(filtered["meta"]["most_recent"], Value::Null);

    let unfiltered =
        body_json(app.oneshot(get("/chirps?nofilter=1")).await.unwrap().into_body()).await;
    assert_eq!(unfiltered["data"].as_array().unwrap().len(), 1);
    assert_eq!(unfiltered["data"][0]["push_timestamp"], 0);
}

#[tokio::test]
async fn test_chirps_limit_handling() {
    let (app, _) = test_app();

    let resp = app.clone().oneshot(get("/chirps?limit=abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.oneshot(get("/chirps?limit=0")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["meta"]["limit"], 1);
}

// ---------------------------------------------------------------
// Stats
// ---------------------------------------------------------------

async fn post_stats(body: &'static str) -> (StatusCode, Value) {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/stats")
                .header("Travis-Queue", "builds.gce")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp.into_body()).await)
}

#[tokio::test]
async fn test_stats_forwards_samples() {
    let (status, json) = post_stats(r#"{"data":[{"script":"test","exe_time":"1.5s"}]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": "great"}));
}

#[tokio::test]
async fn test_stats_empty_data() {
    let (status, json) = post_stats(r#"{"data":[]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"huh": "what"}));
}

#[tokio::test]
async fn test_stats_rejections() {
    let (status, _) = post_stats("{nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_stats(r#"{"nope":""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "missing data key");

    let (status, json) = post_stats(r#"{"data":[{"nope":1}]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "incorrect record format");
}

// ---------------------------------------------------------------
// Kb
// ---------------------------------------------------------------

#[tokio::test]
async fn test_kb_download() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/kb/3")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );

    let body = body_bytes(resp.into_body()).await;
    assert_eq!(body.len(), 3000);
    assert!(body.iter().all(|b| *b == b'z'));
}

#[tokio::test]
async fn test_kb_download_rejections() {
    let (app, _) = test_app();

    let resp = app.clone().oneshot(get("/kb/999999999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "too much kb");

    let resp = app.oneshot(get("/kb/lots")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn multipart_upload(uri: &str, data: &[u8]) -> Request<Body> {
    let boundary = "chirpboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"bytes\"; filename=\"data\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_kb_upload_matching_size() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(multipart_upload("/kb/2", &[b'z'; 2000]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.into_body()).await, json!({"ok": "wow"}));
}

#[tokio::test]
async fn test_kb_upload_mismatched_size() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(multipart_upload("/kb/3", &[b'z'; 2000]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "mismatched size: expected=3 actual=2");
}

#[tokio::test]
async fn test_kb_upload_stops_counting_past_expected_size() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(multipart_upload("/kb/1", &[b'z'; 2500]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "mismatched size: expected=1 actual>1");
}

#[tokio::test]
async fn test_kb_upload_over_max_kb_is_rejected() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(multipart_upload("/kb/101", &[b'z'; 10]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "too much kb");
}

#[tokio::test]
async fn test_kb_upload_requires_bytes() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/kb/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["error"], "missing bytes param");
}
