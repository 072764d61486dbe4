//! Webhook endpoints driving the subscription manager.
//!
//! - `POST /webhook` - start, body `{subscription, variables, url}`
//! - `POST /webhook/{id}` - update, body `{variables}`
//! - `DELETE /webhook/{id}` - stop
//!
//! Any failure answers 500 with `{"error": {"code", "message"}}`.

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::context::{GatewayContext, RequestMeta};
use crate::error::GatewayError;
use crate::handler::GatewayState;
use crate::subscriptions::{StartEvent, UpdateEvent};

#[derive(Debug, Default, Deserialize)]
struct UpdateBody {
    #[serde(default)]
    variables: Map<String, Value>,
}

pub(crate) fn webhook_router() -> Router<GatewayState> {
    Router::new()
        .route("/webhook", post(start_subscription))
        .route(
            "/webhook/{id}",
            post(update_subscription).delete(stop_subscription),
        )
}

async fn start_subscription(
    State(state): State<GatewayState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = async {
        let event: StartEvent = parse_json(&body)?.ok_or_else(|| {
            GatewayError::BadRequest("subscription, variables and url are required".into())
        })?;
        let context = resolve_context(&state, method, uri.path(), headers).await?;
        state.subscriptions.start(event, context).await
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => webhook_error(&err, "Subscription failed to start"),
    }
}

async fn update_subscription(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = async {
        let UpdateBody { variables } = parse_json(&body)?.unwrap_or_default();
        let context = resolve_context(&state, method, uri.path(), headers).await?;
        state
            .subscriptions
            .update(UpdateEvent { id, variables }, context)
            .await
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => webhook_error(&err, "Subscription failed to update"),
    }
}

async fn stop_subscription(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.subscriptions.stop(&id) {
        Ok(id) => (StatusCode::OK, Json(json!({ "id": id }))).into_response(),
        Err(err) => webhook_error(&err, "Subscription failed to stop"),
    }
}

async fn resolve_context(
    state: &GatewayState,
    method: Method,
    path: &str,
    headers: HeaderMap,
) -> Result<GatewayContext, GatewayError> {
    state
        .context
        .resolve(RequestMeta {
            method,
            path: path.to_string(),
            headers,
        })
        .await
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| GatewayError::BadRequest(format!("invalid webhook body: {e}")))
}

fn webhook_error(err: &GatewayError, message: &str) -> Response {
    warn!(error = %err, "{message}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(err.to_json())).into_response()
}
