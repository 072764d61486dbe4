//! # graphrest-gateway
//!
//! Serves a GraphQL schema as REST routes and webhook-driven subscriptions.
//!
//! Every query field becomes a `GET` route and every mutation field a `POST`
//! route; each route runs one pre-built operation through an [`Executor`].
//! Subscriptions are started, updated and stopped through `/webhook`
//! endpoints and deliver each event to a callback URL.
//!
//! ## Example
//!
//! ```no_run
//! use async_graphql::dynamic::Schema;
//! use graphrest_gateway::{Gateway, GatewayConfig};
//!
//! # async fn run(schema: Schema) -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::builder(GatewayConfig::default())
//!     .with_dynamic_schema(schema)?
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, gateway.into_router()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod handler;
pub mod params;
pub mod routes;
pub mod subscriptions;
mod webhook;

pub use config::{GatewayConfig, RouteConfig, WebhookConfig};
pub use context::{
    ContextFactory, ContextSource, FnContextFactory, GatewayContext, REQUEST_ID_HEADER,
    RequestMeta,
};
pub use error::GatewayError;
pub use executor::{
    DynExecutor, DynamicSchemaExecutor, ExecutionErrorEntry, ExecutionRequest, ExecutionResult,
    Executor, ResultStream, SubscribeOutcome,
};
pub use gateway::{Gateway, GatewayBuilder, RouteCallback};
pub use handler::{ErrorHandler, GatewayState, default_error_handler};
pub use params::{RequestInputs, coerce_variable, parse_query_string, pick_param, resolve_variables};
pub use routes::{RouteSynthesizer, default_path};
pub use subscriptions::{
    StartEvent, StartOutcome, SubscriptionManager, UpdateEvent, WebhookDelivery,
};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
