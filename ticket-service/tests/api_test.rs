use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use ticket_service::api::{create_router, AppState};
use ticket_service::queue::{IntakeQueue, QueueReceiver};
use ticket_service::store::MemoryTicketStore;
use tower::ServiceExt;
use uuid::Uuid;

fn app(store: &MemoryTicketStore, capacity: usize) -> (Router, QueueReceiver) {
    let (queue, receiver) = IntakeQueue::bounded(capacity).unwrap();
    let router = create_router(AppState {
        queue,
        store: Arc::new(store.clone()),
    });
    (router, receiver)
}

fn buy(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/buy")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_buy_is_accepted_without_waiting_for_fulfillment() {
    let store = MemoryTicketStore::new();
    let resource = store.insert_resource("gig", 3).await;
    let (router, mut receiver) = app(&store, 10);

    let (status, body) = send(
        &router,
        buy(json!({"resource_id": resource.id, "requester_id": "alice"})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");

    // Queued, but nothing sold until the stage runs.
    let queued = receiver.take().await.unwrap();
    assert_eq!(queued.requester_id, "alice");
    assert_eq!(store.resource(resource.id).await.unwrap().available_quota, 3);
}

#[tokio::test]
async fn test_buy_accepts_legacy_field_names() {
    let store = MemoryTicketStore::new();
    let (router, mut receiver) = app(&store, 10);
    let event_id = Uuid::new_v4();

    let (status, _) = send(
        &router,
        buy(json!({"event_id": event_id, "user_id": "bob"})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(receiver.take().await.unwrap().resource_id, event_id);
}

#[tokio::test]
async fn test_buy_returns_503_when_queue_is_full() {
    let store = MemoryTicketStore::new();
    let resource = store.insert_resource("gig", 3).await;
    let (router, _receiver) = app(&store, 2);

    for requester in ["a", "b"] {
        let (status, _) = send(
            &router,
            buy(json!({"resource_id": resource.id, "requester_id": requester})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, body) = send(
        &router,
        buy(json!({"resource_id": resource.id, "requester_id": "c"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("busy"));
}

#[tokio::test]
async fn test_malformed_buy_requests_are_400() {
    let store = MemoryTicketStore::new();
    let (router, _receiver) = app(&store, 10);

    let cases = [
        json!({"requester_id": "no-resource"}),
        json!({"resource_id": "not-a-uuid", "requester_id": "x"}),
        json!({"resource_id": Uuid::new_v4(), "requester_id": "   "}),
    ];
    for case in cases {
        let (status, body) = send(&router, buy(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_resource_status_reports_quota_and_reservations() {
    let store = MemoryTicketStore::new();
    let resource = store.insert_resource("gig", 3).await;
    let (router, _receiver) = app(&store, 10);

    let request = Request::builder()
        .uri(format!("/resources/{}", resource.id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "gig");
    assert_eq!(body["total_quota"], 3);
    assert_eq!(body["available_quota"], 3);
    assert_eq!(body["reserved"], 0);

    let missing = Request::builder()
        .uri(format!("/resources/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_queue_depth() {
    let store = MemoryTicketStore::new();
    let (router, _receiver) = app(&store, 4);

    send(
        &router,
        buy(json!({"resource_id": Uuid::new_v4(), "requester_id": "a"})),
    )
    .await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_depth"], 1);
    assert_eq!(body["queue_capacity"], 4);
}
