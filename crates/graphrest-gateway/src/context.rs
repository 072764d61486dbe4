//! Per-request execution context.
//!
//! Every REST call and every webhook `start`/`update` builds a
//! [`GatewayContext`] from a [`ContextSource`]. The context is handed to the
//! executor; with the async-graphql executor resolvers read it through
//! `ctx.data::<GatewayContext>()`.
//!
//! # Example
//!
//! ```
//! use graphrest_gateway::{ContextSource, GatewayError, RequestMeta};
//! use serde_json::json;
//!
//! let source = ContextSource::factory(|request: RequestMeta| async move {
//!     let token = request
//!         .headers
//!         .get("authorization")
//!         .and_then(|value| value.to_str().ok())
//!         .map(str::to_string);
//!     match token {
//!         Some(token) => Ok(json!({ "token": token })),
//!         None => Err(GatewayError::Context("missing authorization".into())),
//!     }
//! });
//! # let _ = source;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method};
use serde_json::Value;

use crate::error::GatewayError;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request data a context factory may inspect.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

/// Execution context for one REST call or subscription start.
#[derive(Debug, Clone, Default)]
pub struct GatewayContext {
    /// Request ID for tracing and correlation.
    pub request_id: String,

    /// Headers of the originating HTTP request.
    pub headers: HeaderMap,

    /// Value produced by the context source. `Null` when none is configured.
    pub data: Value,
}

impl GatewayContext {
    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Produces the context value for a request.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error to reject the request (mapped to its status code).
    async fn create(&self, request: RequestMeta) -> Result<Value, GatewayError>;
}

/// [`ContextFactory`] backed by an async closure.
pub struct FnContextFactory<F>(F);

#[async_trait]
impl<F, Fut> ContextFactory for FnContextFactory<F>
where
    F: Fn(RequestMeta) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, GatewayError>> + Send,
{
    async fn create(&self, request: RequestMeta) -> Result<Value, GatewayError> {
        (self.0)(request).await
    }
}

/// Where context values come from.
#[derive(Clone, Default)]
pub enum ContextSource {
    /// Only request metadata, `data` is `Null`.
    #[default]
    Request,
    /// The same value for every request.
    Static(Value),
    /// Computed per request.
    Factory(Arc<dyn ContextFactory>),
}

impl fmt::Debug for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("Request"),
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl ContextSource {
    /// Wraps an async closure as a factory source.
    pub fn factory<F, Fut>(factory: F) -> Self
    where
        F: Fn(RequestMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, GatewayError>> + Send + 'static,
    {
        Self::Factory(Arc::new(FnContextFactory(factory)))
    }

    /// Builds the context for one request.
    ///
    /// # Errors
    ///
    /// Propagates factory failures.
    pub async fn resolve(&self, request: RequestMeta) -> Result<GatewayContext, GatewayError> {
        let request_id = request
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let headers = request.headers.clone();

        let data = match self {
            Self::Request => Value::Null,
            Self::Static(value) => value.clone(),
            Self::Factory(factory) => factory.create(request).await?,
        };

        Ok(GatewayContext {
            request_id,
            headers,
            data,
        })
    }
}
