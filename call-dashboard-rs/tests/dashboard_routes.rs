use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use call_dashboard::event_store::{EventStore, JsonFileStore};
use call_dashboard::validation::MAX_PAYLOAD_SIZE;
use call_dashboard::CallDashboard;

const KEY: &str = "test-key";

struct Harness {
    _dir: TempDir,
    store: Arc<JsonFileStore>,
    dashboard: Arc<CallDashboard>,
}

impl Harness {
    fn new(api_key: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("data.json")));
        let dashboard = Arc::new(CallDashboard::new(
            store.clone(),
            api_key.map(str::to_string),
        ));
        Self {
            _dir: dir,
            store,
            dashboard,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.dashboard.clone().into_app().oneshot(request).await.unwrap()
    }

    async fn post_event(&self, event: Value) -> Response {
        self.send(
            Request::post("/data")
                .header("x-api-key", KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn summary(&self) -> Value {
        let response = self.get("/summary").await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_post_data_with_header_key() {
    let harness = Harness::new(Some(KEY));
    let event = json!({"classification": "deal_success", "origin": "A", "start_rate": "100"});

    let response = harness.post_event(event.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({"message": "POST Success", "count": 1, "data": event})
    );
    assert_eq!(harness.store.load_all().unwrap(), vec![event]);
}

#[tokio::test]
async fn test_post_data_with_bearer_key() {
    let harness = Harness::new(Some(KEY));

    let response = harness
        .send(
            Request::post("/data")
                .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"classification": "deal_ongoing"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["count"], 1);
}

#[tokio::test]
async fn test_wrong_or_missing_key_is_rejected() {
    let harness = Harness::new(Some(KEY));

    let requests = vec![
        Request::post("/data").body(Body::from("{}")).unwrap(),
        Request::post("/data")
            .header("x-api-key", "wrong")
            .body(Body::from("{}"))
            .unwrap(),
        Request::post("/data")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::from("{}"))
            .unwrap(),
        Request::post("/clear").body(Body::empty()).unwrap(),
        Request::post("/clear")
            .header("x-api-key", "TEST-KEY")
            .body(Body::empty())
            .unwrap(),
    ];

    for request in requests {
        let response = harness.send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "unauthorized"}));
    }
    assert!(harness.store.load_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_configured_key_rejects_everything() {
    let harness = Harness::new(None);

    let response = harness
        .send(Request::post("/data").body(Body::from("{}")).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = harness
        .send(
            Request::post("/clear")
                .header("x-api-key", "")
                .header(header::AUTHORIZATION, "Bearer ")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_stored_as_empty_object() {
    let harness = Harness::new(Some(KEY));

    let response = harness
        .send(
            Request::post("/data")
                .header("x-api-key", KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ this is not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"], json!({}));
    assert_eq!(harness.store.load_all().unwrap(), vec![json!({})]);
}

#[tokio::test]
async fn test_appends_grow_store_in_order() {
    let harness = Harness::new(Some(KEY));
    harness.store.save_all(&[json!({"n": 0})]).unwrap();

    for n in 1..=5 {
        let response = harness.post_event(json!({"n": n})).await;
        assert_eq!(body_json(response).await["count"], n + 1);
    }

    let stored: Vec<i64> = harness
        .store
        .load_all()
        .unwrap()
        .iter()
        .map(|event| event["n"].as_i64().unwrap())
        .collect();
    assert_eq!(stored, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_clear_resets_dashboard() {
    let harness = Harness::new(Some(KEY));
    harness
        .post_event(json!({"classification": "deal_success", "start_rate": 100, "final_rate": 120}))
        .await;

    let response = harness
        .send(
            Request::post("/clear")
                .header("x-api-key", KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"message": "Existing data cleared"}));

    let summary = harness.summary().await;
    assert_eq!(summary["total_calls"], 0);
    assert_eq!(summary["success_rate"], 0.0);
    assert_eq!(summary["negotiation_under_pct"], 0.0);
}

#[tokio::test]
async fn test_seed_is_additive() {
    let harness = Harness::new(Some(KEY));

    let first = harness.get("/seed").await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(body_json(first).await, json!({"message": "seeded", "count": 4}));

    let second = harness.get("/seed").await;
    assert_eq!(body_json(second).await["count"], 8);

    let summary = harness.summary().await;
    assert_eq!(summary["total_calls"], 8);
    assert_eq!(summary["success_count"], 6);
    assert_eq!(summary["fail_count"], 2);
    assert_eq!(
        summary["unsuccessful_reasons"],
        json!([{"reason": "deal_failure", "count": 2}])
    );
}

#[tokio::test]
async fn test_dashboard_renders_aggregates() {
    let harness = Harness::new(Some(KEY));
    for event in [
        json!({"classification": "deal_success", "origin": "A", "destination": "B",
               "start_rate": 100, "final_rate": 110}),
        json!({"classification": "deal_failure", "reasoning": "x"}),
        json!({"classification": "deal_ongoing"}),
    ] {
        harness.post_event(event).await;
    }

    let summary = harness.summary().await;
    assert_eq!(summary["total_calls"], 3);
    assert_eq!(summary["success_count"], 1);
    assert_eq!(summary["fail_count"], 1);
    assert_eq!(summary["ongoing_count"], 1);
    assert!((summary["success_rate"].as_f64().unwrap() - 33.333333).abs() < 1e-3);
    assert!((summary["negotiation_under_pct"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(summary["pickups"], json!([{"location": "A", "count": 1}]));
    assert_eq!(summary["dropoffs"], json!([{"location": "B", "count": 1}]));
    assert_eq!(
        summary["last5_rates"],
        json!([{"start_rate": 100, "final_rate": 110}])
    );

    let response = harness.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(r#"id="total-calls">3<"#));
    assert!(page.contains(r#"id="success-rate">33.3%<"#));
    assert!(page.contains("<tr><td>deal_failure</td><td>1</td></tr>"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let harness = Harness::new(Some(KEY));
    harness.store.save_all(&[json!({"n": 1})]).unwrap();

    let padding = "x".repeat(MAX_PAYLOAD_SIZE);
    let body = json!({"classification": "deal_success", "reasoning": padding}).to_string();
    assert!(body.len() > MAX_PAYLOAD_SIZE);

    let response = harness
        .send(
            Request::post("/data")
                .header("x-api-key", KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(harness.store.load_all().unwrap(), vec![json!({"n": 1})]);
}

#[tokio::test]
async fn test_non_ascii_api_key_is_accepted() {
    let harness = Harness::new(Some("clé-secrète"));

    let response = harness
        .send(
            Request::post("/data")
                .header("x-api-key", "clé-secrète".as_bytes())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_does_not_touch_store() {
    let harness = Harness::new(None);
    std::fs::write(harness.store.path(), "not json").unwrap();

    let response = harness.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["healthy"], true);
    assert_eq!(std::fs::read_to_string(harness.store.path()).unwrap(), "not json");
}

#[tokio::test]
async fn test_homepage_and_health() {
    let harness = Harness::new(None);

    let response = harness.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Call Outcome Dashboard"));

    let response = harness.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["healthy"], true);
    assert_eq!(health["service_name"], "call-dashboard");
}

#[tokio::test]
async fn test_trailing_slashes_are_ignored() {
    let harness = Harness::new(Some(KEY));

    let response = harness.get("/seed/").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = harness.get("/dashboard/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_corrupt_store_is_healed_on_read() {
    let harness = Harness::new(Some(KEY));
    std::fs::write(harness.store.path(), "not json at all").unwrap();

    let summary = harness.summary().await;
    assert_eq!(summary["total_calls"], 0);
    assert_eq!(std::fs::read_to_string(harness.store.path()).unwrap(), "[]");
}
