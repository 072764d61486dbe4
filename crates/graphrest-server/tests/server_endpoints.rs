//! End-to-end tests of the server over a mocked upstream GraphQL endpoint.

use std::io::Write;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use graphrest_server::{AppConfig, ServerBuilder};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SDL: &str = r#"
type Query {
  "Looks up one user"
  user(id: ID!): User
  users: [User!]!
}

type Mutation {
  addUser(name: String!): User!
}

type Subscription {
  userAdded: User!
}

type User {
  id: ID!
  name: String!
}
"#;

fn schema_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".graphql")
        .tempfile()
        .unwrap();
    file.write_all(SDL.as_bytes()).unwrap();
    file
}

fn config(upstream: &MockServer, schema: &NamedTempFile) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.upstream.url = format!("{}/graphql", upstream.uri());
    cfg.upstream.schema_path = Some(schema.path().to_string_lossy().into_owned());
    cfg
}

async fn router(cfg: AppConfig) -> Router {
    ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .unwrap()
        .router()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_get_route_forwards_operation() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "user_query",
            "variables": { "id": "1" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": { "id": "1", "name": "Ada" } }
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let schema = schema_file();

    let router = router(config(&upstream, &schema)).await;
    let (status, body) = send(
        router,
        Request::get("/user/1").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": "1", "name": "Ada" }));
}

#[tokio::test]
async fn test_authorization_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(wiremock::matchers::header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "addUser": { "id": "9", "name": "Grace" } }
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let schema = schema_file();

    let router = router(config(&upstream, &schema)).await;
    let request = Request::post("/add-user")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::from(json!({ "name": "Grace" }).to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Grace");
}

#[tokio::test]
async fn test_upstream_errors_use_default_handler() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "not allowed" }]
        })))
        .mount(&upstream)
        .await;
    let schema = schema_file();

    let router = router(config(&upstream, &schema)).await;
    let response = router
        .oneshot(Request::get("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not allowed");
}

#[tokio::test]
async fn test_garbage_upstream_is_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&upstream)
        .await;
    let schema = schema_file();

    let router = router(config(&upstream, &schema)).await;
    let (status, body) = send(router, Request::get("/users").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_openapi_and_health() {
    let upstream = MockServer::start().await;
    let schema = schema_file();
    let mut cfg = config(&upstream, &schema);
    cfg.gateway.base_path = "/api".into();
    cfg.openapi.title = "Users".into();

    let router = router(cfg).await;
    let (status, body) = send(
        router.clone(),
        Request::get("/openapi.json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["openapi"], "3.0.0");
    assert_eq!(body["info"]["title"], "Users");
    assert_eq!(
        body["paths"]["/api/user/{id}"]["get"]["operationId"],
        "user_query"
    );
    assert_eq!(
        body["paths"]["/api/user/{id}"]["get"]["summary"],
        "Looks up one user"
    );

    let (status, body) = send(router, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_schema_from_sdl_url() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SDL))
        .mount(&upstream)
        .await;

    let mut cfg = AppConfig::default();
    cfg.upstream.url = format!("{}/graphql", upstream.uri());
    cfg.upstream.sdl_url = Some(format!("{}/sdl", upstream.uri()));

    let server = ServerBuilder::new().with_config(cfg).build().await.unwrap();
    let (status, _) = send(
        server.router(),
        Request::get("/healthz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_start_answers_immediately() {
    let upstream = MockServer::start().await;
    let schema = schema_file();
    let router = router(config(&upstream, &schema)).await;

    let request = Request::post("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "subscription": "userAdded",
                "variables": {},
                "url": "http://127.0.0.1:9/hook",
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["errors"][0]["message"],
        "subscriptions are not supported by the upstream executor"
    );
}
