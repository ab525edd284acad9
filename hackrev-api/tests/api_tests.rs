//! Integration tests for hackrev-api endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Review submission (201, validation 400, malformed body 400)
//! - Point lookup (200, 404, bad id 400)
//! - Reviewee list with technology filter and sort
//! - Reviewee summary
//! - Tag search (union, de-duplication, sort, blank tags, partial results)
//! - SSE event stream

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use async_trait::async_trait;
use futures::StreamExt;
use hackrev_api::{build_router, AppState};
use hackrev_common::EventBus;
use hackrev_ledger::{LedgerError, LedgerStore, QueryEngine, ReviewRecord, TagIndex, TagKey};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: in-memory ledger wired to a fresh event bus
fn setup_state() -> AppState {
    let events = Arc::new(EventBus::new(64));
    let ledger = Arc::new(LedgerStore::in_memory().with_events(events.clone()));
    AppState::new(ledger, events, Duration::from_secs(2))
}

/// Index that fails every lookup of one tag
struct FailingIndex {
    inner: Arc<LedgerStore>,
    broken: &'static str,
}

#[async_trait]
impl TagIndex for FailingIndex {
    async fn lookup(&self, tag: &TagKey) -> hackrev_ledger::Result<Vec<ReviewRecord>> {
        if tag.as_str() == self.broken {
            return Err(LedgerError::Commit("index shard offline".to_string()));
        }
        self.inner.lookup(tag).await
    }
}

/// Index that never answers for one tag
struct StallingIndex {
    inner: Arc<LedgerStore>,
    stalled: &'static str,
}

#[async_trait]
impl TagIndex for StallingIndex {
    async fn lookup(&self, tag: &TagKey) -> hackrev_ledger::Result<Vec<ReviewRecord>> {
        if tag.as_str() == self.stalled {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.inner.lookup(tag).await
    }
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn review(reviewer: &str, reviewee: &str, hackathon: &str, rating: i64, technologies: &[&str]) -> Value {
    json!({
        "reviewer": reviewer,
        "reviewee": reviewee,
        "hackathon": hackathon,
        "rating": rating,
        "comment": "great collaborator",
        "technologies": technologies,
        "project_url": "https://github.com/example/project",
    })
}

async fn seed_scenario(state: &AppState) {
    for body in [
        review("bob", "alice", "ETHGlobal", 5, &["Solidity", "React"]),
        review("carol", "alice", "Polygon", 4, &["Polygon", "React"]),
        review("alice", "dave", "ETHGlobal", 3, &["Rust"]),
    ] {
        let (status, _) = send(state, json_request("/api/reviews", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let state = setup_state();
    let (status, body) = send(&state, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "hackrev-api");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["reviews"], 0);
    assert_eq!(body["sse_clients"], 0);
    assert!(body["version"].is_string());
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_returns_created_with_id() {
    let state = setup_state();
    let mut rx = state.events.subscribe();

    let (status, body) = send(
        &state,
        json_request("/api/reviews", &review("bob", "alice", "ETHGlobal", 5, &["Solidity"])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "ReviewCommitted");
}

#[tokio::test]
async fn test_submit_validation_errors() {
    let state = setup_state();

    for body in [
        review("bob", "alice", "ETHGlobal", 0, &["Rust"]),
        review("bob", "alice", "ETHGlobal", 6, &["Rust"]),
        review("bob", "alice", "ETHGlobal", 4, &[]),
        review("bob", "alice", "ETHGlobal", 4, &["  "]),
        review("  ", "alice", "ETHGlobal", 4, &["Rust"]),
    ] {
        let (status, body) = send(&state, json_request("/api/reviews", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].is_string());
    }
    assert!(state.ledger.is_empty());
}

#[tokio::test]
async fn test_submit_malformed_body() {
    let state = setup_state();
    let (status, body) = send(
        &state,
        json_request("/api/reviews", &json!({ "reviewer": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Point lookup
// =============================================================================

#[tokio::test]
async fn test_get_review() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (status, body) = send(&state, test_request("GET", "/api/reviews/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviewer"], "carol");
    assert_eq!(body["technologies"], json!(["Polygon", "React"]));

    let (status, body) = send(&state, test_request("GET", "/api/reviews/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&state, test_request("GET", "/api/reviews/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Reviewee queries
// =============================================================================

#[tokio::test]
async fn test_reviews_of_in_commit_order() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (status, body) = send(&state, test_request("GET", "/api/reviewees/alice/reviews")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["reviews"][0]["reviewer"], "bob");
    assert_eq!(body["reviews"][1]["reviewer"], "carol");

    let (status, body) = send(&state, test_request("GET", "/api/reviewees/nobody/reviews")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_reviews_of_with_filter_and_sort() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (_, body) = send(
        &state,
        test_request("GET", "/api/reviewees/alice/reviews?tech=poly"),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["reviews"][0]["reviewer"], "carol");

    let (_, body) = send(
        &state,
        test_request("GET", "/api/reviewees/alice/reviews?sort=rating"),
    )
    .await;
    assert_eq!(body["reviews"][0]["rating"], 5);

    let (status, body) = send(
        &state,
        test_request("GET", "/api/reviewees/alice/reviews?sort=sideways"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_reviewee_summary() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (status, body) = send(&state, test_request("GET", "/api/reviewees/alice/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review_count"], 2);
    assert_eq!(body["average_rating"], 4.5);
    assert_eq!(body["technologies"][0]["technology"], "React");
    assert_eq!(body["technologies"][0]["count"], 2);

    let (_, body) = send(&state, test_request("GET", "/api/reviewees/nobody/summary")).await;
    assert_eq!(body["review_count"], 0);
    assert!(body["average_rating"].is_null());
}

// =============================================================================
// Tag search
// =============================================================================

#[tokio::test]
async fn test_search_union_dedup() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (status, body) = send(&state, test_request("GET", "/api/search?tags=react")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["partial"], false);
    assert_eq!(body["failed_tags"], json!([]));

    let (_, body) = send(&state, test_request("GET", "/api/search?tags=Rust,REACT,rust")).await;
    let ids: Vec<u64> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_search_sorted_by_rating() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (_, body) = send(
        &state,
        test_request("GET", "/api/search?tags=rust,react&sort=rating"),
    )
    .await;
    assert_eq!(body["sort"], "highest_rated");
    let ratings: Vec<u64> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rating"].as_u64().unwrap())
        .collect();
    assert_eq!(ratings, vec![5, 4, 3]);
}

#[tokio::test]
async fn test_search_empty_and_blank_tags() {
    let state = setup_state();
    seed_scenario(&state).await;

    let (status, body) = send(&state, test_request("GET", "/api/search")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = send(&state, test_request("GET", "/api/search?tags=react,,go")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_partial_failure_is_ok_with_failed_tags() {
    let mut state = setup_state();
    seed_scenario(&state).await;
    let index = Arc::new(FailingIndex {
        inner: state.ledger.clone(),
        broken: "go",
    });
    state.queries = QueryEngine::with_tag_index(state.ledger.clone(), index);

    let (status, body) = send(&state, test_request("GET", "/api/search?tags=react,go")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partial"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["failed_tags"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed_tags"][0]["tag"], "go");
    assert_eq!(body["failed_tags"][0]["reason"], "lookup");
    assert!(body["failed_tags"][0]["detail"]
        .as_str()
        .unwrap()
        .contains("index shard offline"));

    // Retrying only the failed tag against a healthy engine completes the union
    state.queries = QueryEngine::new(state.ledger.clone());
    let (status, body) = send(&state, test_request("GET", "/api/search?tags=go")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partial"], false);
}

#[tokio::test]
async fn test_search_timeout_reports_timed_out() {
    let mut state = setup_state();
    seed_scenario(&state).await;
    let index = Arc::new(StallingIndex {
        inner: state.ledger.clone(),
        stalled: "rust",
    });
    state.queries = QueryEngine::with_tag_index(state.ledger.clone(), index);

    let (status, body) = send(
        &state,
        test_request("GET", "/api/search?tags=react,rust&timeout_ms=100"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partial"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["failed_tags"][0]["tag"], "rust");
    assert_eq!(body["failed_tags"][0]["reason"], "timed_out");
    assert!(body["failed_tags"][0].get("detail").is_none());
}

// =============================================================================
// SSE
// =============================================================================

#[tokio::test]
async fn test_event_stream_delivers_commits() {
    let state = setup_state();

    let response = build_router(state.clone())
        .oneshot(test_request("GET", "/api/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(state.events.subscriber_count(), 1);

    let mut frames = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("connection frame")
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&first).contains("event: ConnectionStatus"));

    let (status, _) = send(
        &state,
        json_request("/api/reviews", &review("bob", "alice", "ETHGlobal", 5, &["Solidity"])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let next = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("commit frame")
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&next);
    assert!(text.contains("event: ReviewCommitted"));
    assert!(text.contains(r#""reviewee":"alice""#));

    drop(frames);
    assert_eq!(state.events.subscriber_count(), 0);
}
