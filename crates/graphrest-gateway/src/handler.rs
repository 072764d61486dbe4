//! Axum handlers for synthesized routes.
//!
//! Every route runs the same pipeline: resolve variables from the request,
//! build the context, execute the route's operation, and answer with
//! `data[field]` or hand the GraphQL errors to the error handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, on};
use graphrest_core::{HttpMethod, RouteInfo, SchemaIndex};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::{ContextSource, RequestMeta};
use crate::error::GatewayError;
use crate::executor::{DynExecutor, ExecutionErrorEntry, ExecutionRequest};
use crate::params::{RequestInputs, parse_query_string, resolve_variables};
use crate::subscriptions::SubscriptionManager;

/// Turns GraphQL errors into the HTTP response of a failed route call.
pub type ErrorHandler = Arc<dyn Fn(&[ExecutionErrorEntry]) -> Response + Send + Sync>;

/// Answers 500 with the first error message as body.
pub fn default_error_handler(errors: &[ExecutionErrorEntry]) -> Response {
    let message = errors
        .first()
        .map(|error| error.message.clone())
        .unwrap_or_default();
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// State shared by every synthesized route and the webhook endpoints.
#[derive(Clone)]
pub struct GatewayState {
    pub schema: Arc<SchemaIndex>,
    pub executor: DynExecutor,
    pub context: ContextSource,
    pub error_handler: ErrorHandler,
    pub subscriptions: Arc<SubscriptionManager>,
}

/// Everything a route handler reads from the request.
struct RestRequest {
    path_params: HashMap<String, String>,
    raw_query: Option<String>,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

pub(crate) fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Patch => MethodFilter::PATCH,
    }
}

/// Adds the handler of `route` to the method router of its path.
pub(crate) fn add_route(
    router: Option<MethodRouter<GatewayState>>,
    route: Arc<RouteInfo>,
) -> MethodRouter<GatewayState> {
    let filter = method_filter(route.method);
    let handler = move |State(state): State<GatewayState>,
                        path: Option<Path<HashMap<String, String>>>,
                        RawQuery(raw_query): RawQuery,
                        method: Method,
                        OriginalUri(uri): OriginalUri,
                        headers: HeaderMap,
                        body: Bytes| {
        let route = Arc::clone(&route);
        async move {
            let request = RestRequest {
                path_params: path.map(|Path(params)| params).unwrap_or_default(),
                raw_query,
                method,
                path: uri.path().to_string(),
                headers,
                body,
            };
            dispatch(state, route, request).await
        }
    };

    match router {
        Some(router) => router.on(filter, handler),
        None => on(filter, handler),
    }
}

async fn dispatch(state: GatewayState, route: Arc<RouteInfo>, request: RestRequest) -> Response {
    match execute_route(&state, &route, request).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, path = %route.path, "Route failed");
            err.into_response()
        }
    }
}

async fn execute_route(
    state: &GatewayState,
    route: &RouteInfo,
    request: RestRequest,
) -> Result<Response, GatewayError> {
    let RestRequest {
        path_params,
        raw_query,
        method,
        path,
        headers,
        body,
    } = request;

    let body = parse_body(&body)?;
    let query = parse_query_string(raw_query.as_deref());
    let variables = resolve_variables(
        &state.schema,
        &route.document.variables,
        &RequestInputs {
            path: Some(&path_params),
            query: &query,
            body: body.as_ref(),
        },
    )?;

    let context = state
        .context
        .resolve(RequestMeta {
            method,
            path,
            headers,
        })
        .await?;

    let result = state
        .executor
        .execute(ExecutionRequest {
            document: Arc::clone(&route.document),
            variables,
            context,
        })
        .await?;

    if result.has_errors() {
        debug!(
            error = %GatewayError::Execution(result.error_messages()),
            path = %route.path,
            "Operation returned errors"
        );
        return Ok((state.error_handler)(&result.errors));
    }

    let status = StatusCode::from_u16(route.response_status).unwrap_or(StatusCode::OK);
    Ok((status, Json(result.field(route.field_name()))).into_response())
}

/// Parses a JSON body. Empty bodies and non-object JSON carry no variables.
fn parse_body(body: &[u8]) -> Result<Option<Map<String, Value>>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::BadRequest(format!("request body is not valid JSON: {e}")))?;
    Ok(match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
}
