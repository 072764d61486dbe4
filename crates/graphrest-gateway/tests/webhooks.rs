//! Integration tests for webhook-driven subscriptions.
//!
//! Subscription events come from an async-graphql dynamic schema and are
//! delivered to a `wiremock` server standing in for the client.

use std::time::Duration;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
    Field, FieldFuture, InputValue, Object, Schema, Subscription, SubscriptionField,
    SubscriptionFieldFuture, TypeRef,
};
use async_stream::stream;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use futures_util::Stream;
use graphrest_gateway::{Gateway, GatewayConfig};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test schema
// =============================================================================

fn ticks(
    prefix: String,
    count: i64,
    interval: Duration,
) -> impl Stream<Item = Result<GqlValue, async_graphql::Error>> + Send {
    stream! {
        for i in 0..count {
            yield GqlValue::from_json(json!({
                "id": i.to_string(),
                "label": format!("{prefix}-{i}"),
            }))
            .map_err(|e| async_graphql::Error::new(e.to_string()));
            tokio::time::sleep(interval).await;
        }
    }
}

fn tick_field(name: &'static str) -> Field {
    Field::new(name, TypeRef::named_nn(TypeRef::STRING), move |ctx| {
        FieldFuture::new(async move {
            if let Some(GqlValue::Object(obj)) = ctx.parent_value.as_value()
                && let Some(value) = obj.get(&async_graphql::Name::new(name))
            {
                return Ok(Some(value.clone()));
            }
            Ok(None)
        })
    })
}

fn build_schema() -> Schema {
    let tick = Object::new("Tick")
        .field(tick_field("id"))
        .field(tick_field("label"));

    let query = Object::new("Query").field(Field::new(
        "ping",
        TypeRef::named(TypeRef::STRING),
        |_| FieldFuture::new(async { Ok(Some(GqlValue::from("pong"))) }),
    ));

    let subscription = Subscription::new("Subscription").field(
        SubscriptionField::new("onTick", TypeRef::named_nn("Tick"), |ctx| {
            let prefix = ctx
                .args
                .get("prefix")
                .and_then(|v| v.string().ok())
                .unwrap_or("tick")
                .to_string();
            let count = ctx
                .args
                .get("count")
                .and_then(|v| v.i64().ok())
                .unwrap_or(2);
            let interval = ctx
                .args
                .get("intervalMs")
                .and_then(|v| v.u64().ok())
                .unwrap_or(5);
            SubscriptionFieldFuture::new(async move {
                Ok(ticks(prefix, count, Duration::from_millis(interval)))
            })
        })
        .argument(InputValue::new("prefix", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("count", TypeRef::named(TypeRef::INT)))
        .argument(InputValue::new("intervalMs", TypeRef::named(TypeRef::INT))),
    )
    .field(
        SubscriptionField::new("onRoom", TypeRef::named_nn("Tick"), |ctx| {
            SubscriptionFieldFuture::new(async move {
                let room = ctx.args.try_get("room")?.string()?.to_string();
                Ok(ticks(room, 1, Duration::from_millis(5)))
            })
        })
        .argument(InputValue::new("room", TypeRef::named_nn(TypeRef::STRING))),
    );

    Schema::build("Query", None, Some("Subscription"))
        .register(tick)
        .register(query)
        .register(subscription)
        .finish()
        .unwrap()
}

fn gateway() -> Gateway {
    Gateway::builder(GatewayConfig::default())
        .with_dynamic_schema(build_schema())
        .unwrap()
        .build()
        .unwrap()
}

// =============================================================================
// Helpers
// =============================================================================

async fn receiver() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

async fn call(
    gateway: &Gateway,
    http_method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(http_method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = gateway.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn delivered(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

/// Polls until `count` events arrived or a second passed.
async fn wait_for_deliveries(server: &MockServer, count: usize) -> Vec<Value> {
    for _ in 0..100 {
        let events = delivered(server).await;
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    delivered(server).await
}

async fn wait_until_inactive(gateway: &Gateway, id: &str) -> bool {
    for _ in 0..100 {
        if !gateway.subscriptions().is_active(id) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_delivers_every_event() {
    let server = receiver().await;
    let gateway = gateway();

    let (status, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onTick",
            "variables": { "prefix": "hi", "count": "2" },
            "url": format!("{}/hook", server.uri()),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();

    let events = wait_for_deliveries(&server, 2).await;
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        json!({ "data": { "onTick": { "id": "0", "label": "hi-0" } } })
    );
    assert_eq!(events[1]["data"]["onTick"]["label"], "hi-1");

    // the stream ended, so the client is gone
    assert!(wait_until_inactive(&gateway, &id).await);
}

#[tokio::test]
async fn test_stop_ends_deliveries() {
    let server = receiver().await;
    let gateway = gateway();

    let (_, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onTick",
            "variables": { "count": 1000, "intervalMs": 20 },
            "url": format!("{}/hook", server.uri()),
        })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();
    wait_for_deliveries(&server, 1).await;

    let (status, body) = call(&gateway, "DELETE", &format!("/webhook/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id }));
    assert!(!gateway.subscriptions().is_active(&id));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_stop = delivered(&server).await.len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(delivered(&server).await.len(), after_stop);

    let (status, body) = call(&gateway, "DELETE", &format!("/webhook/{id}"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UNKNOWN_CLIENT");
}

#[tokio::test]
async fn test_update_restarts_with_new_id() {
    let server = receiver().await;
    let gateway = gateway();

    let (_, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onTick",
            "variables": { "prefix": "old", "count": 1000, "intervalMs": 20 },
            "url": format!("{}/hook", server.uri()),
        })),
    )
    .await;
    let first = body["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &gateway,
        "POST",
        &format!("/webhook/{first}"),
        Some(json!({ "variables": { "prefix": "new", "count": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["id"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(!gateway.subscriptions().is_active(&first));

    let mut labels = Vec::new();
    for _ in 0..100 {
        labels = delivered(&server)
            .await
            .iter()
            .filter_map(|event| event["data"]["onTick"]["label"].as_str().map(str::to_string))
            .collect();
        if labels.iter().any(|label| label == "new-0") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(labels.iter().any(|label| label == "new-0"));

    let (status, body) = call(
        &gateway,
        "POST",
        &format!("/webhook/{first}"),
        Some(json!({ "variables": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UNKNOWN_CLIENT");
}

#[tokio::test]
async fn test_unknown_subscription() {
    let gateway = gateway();
    let (status, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onNothing",
            "variables": {},
            "url": "http://127.0.0.1:9/hook",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UNKNOWN_SUBSCRIPTION");
    assert_eq!(gateway.subscriptions().active_clients(), 0);
}

#[tokio::test]
async fn test_invalid_subscription_returns_errors_without_client() {
    let server = receiver().await;
    let gateway = gateway();

    // `room` is required
    let (status, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onRoom",
            "variables": {},
            "url": format!("{}/hook", server.uri()),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("id").is_none());
    let message = body["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains("room"), "unexpected error: {message}");
    assert_eq!(gateway.subscriptions().active_clients(), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(delivered(&server).await.is_empty());
}

#[tokio::test]
async fn test_valid_subscription_with_required_variable() {
    let server = receiver().await;
    let gateway = gateway();

    let (status, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onRoom",
            "variables": { "room": "lobby" },
            "url": format!("{}/hook", server.uri()),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].is_string());

    let events = wait_for_deliveries(&server, 1).await;
    assert_eq!(
        events,
        vec![json!({ "data": { "onRoom": { "id": "0", "label": "lobby-0" } } })]
    );
}

#[tokio::test]
async fn test_delivery_failure_removes_client() {
    let gateway = gateway();
    let (status, body) = call(
        &gateway,
        "POST",
        "/webhook",
        Some(json!({
            "subscription": "onTick",
            "variables": { "count": 1000 },
            // nothing listens on the discard port
            "url": "http://127.0.0.1:9/hook",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert!(wait_until_inactive(&gateway, &id).await);
}

#[tokio::test]
async fn test_shutdown_stops_all_clients() {
    let server = receiver().await;
    let gateway = gateway();
    for _ in 0..2 {
        call(
            &gateway,
            "POST",
            "/webhook",
            Some(json!({
                "subscription": "onTick",
                "variables": { "count": 1000, "intervalMs": 20 },
                "url": format!("{}/hook", server.uri()),
            })),
        )
        .await;
    }
    assert_eq!(gateway.subscriptions().active_clients(), 2);
    gateway.subscriptions().shutdown();
    assert_eq!(gateway.subscriptions().active_clients(), 0);
}

#[tokio::test]
async fn test_missing_body_is_rejected() {
    let gateway = gateway();
    let (status, body) = call(&gateway, "POST", "/webhook", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
