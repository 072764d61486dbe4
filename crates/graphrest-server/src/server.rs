use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use graphrest_gateway::{Gateway, SubscriptionManager};
use serde_json::{Value, json};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::upstream::{UpstreamExecutor, load_schema};

pub struct GraphrestServer {
    addr: SocketAddr,
    app: Router,
    subscriptions: Arc<SubscriptionManager>,
}

/// Gateway routes plus the OpenAPI document and health check.
///
/// # Errors
///
/// Fails if the OpenAPI document cannot be serialized.
pub fn build_app(cfg: &AppConfig, gateway: &Gateway) -> anyhow::Result<Router> {
    let document = gateway
        .openapi(cfg.openapi.to_options())
        .to_json()
        .context("failed to serialize the OpenAPI document")?;
    let document = Arc::new(document);
    let body_limit = cfg.server.body_limit_bytes;

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route(
            &cfg.openapi.path,
            get(move || {
                let document = Arc::clone(&document);
                async move { Json(Value::clone(&document)) }
            }),
        )
        .merge(gateway.router())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let request_id = req
                        .headers()
                        .get(graphrest_gateway::REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %request_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(body_limit));
    Ok(app)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Loads the upstream schema and builds the gateway over it.
    pub async fn build(self) -> anyhow::Result<GraphrestServer> {
        let cfg = self.config;
        let schema = load_schema(&cfg.upstream).await?;
        let executor = UpstreamExecutor::new(&cfg.upstream)?;

        let gateway = Gateway::builder(cfg.gateway.clone())
            .with_schema(schema)
            .with_executor(Arc::new(executor))
            .on_route(|route| {
                tracing::debug!(
                    method = %route.method,
                    path = %route.path,
                    operation = %route.document.name,
                    "Route registered"
                );
            })
            .build()?;

        tracing::info!(
            routes = gateway.routes().len(),
            upstream = %cfg.upstream.url,
            "Gateway ready"
        );

        Ok(GraphrestServer {
            addr: cfg.addr(),
            app: build_app(&cfg, &gateway)?,
            subscriptions: Arc::clone(gateway.subscriptions()),
        })
    }
}

impl GraphrestServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        self.subscriptions.shutdown();
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
