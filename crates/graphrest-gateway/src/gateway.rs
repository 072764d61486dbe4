//! Gateway facade.
//!
//! [`GatewayBuilder`] wires the schema, executor, route synthesis, handlers
//! and the subscription manager into one axum [`Router`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::MethodRouter;
use graphrest_core::{
    HttpMethod, OperationBuilder, RouteInfo, SchemaIndex, SelectionBuilder, extract_models,
};
use graphrest_openapi::{AddRouteOptions, OpenApi, OpenApiDocument, OpenApiOptions};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::context::{ContextSource, RequestMeta};
use crate::error::GatewayError;
use crate::executor::{DynExecutor, DynamicSchemaExecutor};
use crate::handler::{self, ErrorHandler, GatewayState, default_error_handler};
use crate::routes::{RouteSynthesizer, to_axum_path};
use crate::subscriptions::{SubscriptionManager, WebhookDelivery};
use crate::webhook::webhook_router;

/// Called once per synthesized route, in registration order.
pub type RouteCallback = Arc<dyn Fn(&RouteInfo) + Send + Sync>;

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    schema: Option<Arc<SchemaIndex>>,
    executor: Option<DynExecutor>,
    operation_builder: Arc<dyn OperationBuilder>,
    on_route: Option<RouteCallback>,
    error_handler: ErrorHandler,
    context: ContextSource,
    delivery: Option<WebhookDelivery>,
}

impl fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("has_schema", &self.schema.is_some())
            .field("has_executor", &self.executor.is_some())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            schema: None,
            executor: None,
            operation_builder: Arc::new(SelectionBuilder),
            on_route: None,
            error_handler: Arc::new(default_error_handler),
            context: ContextSource::default(),
            delivery: None,
        }
    }

    /// Sets the schema routes are derived from.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<Arc<SchemaIndex>>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the executor that runs operations.
    #[must_use]
    pub fn with_executor(mut self, executor: DynExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Uses an in-process async-graphql schema as both schema and executor.
    ///
    /// # Errors
    ///
    /// Fails if the schema's SDL cannot be introspected.
    pub fn with_dynamic_schema(
        self,
        schema: async_graphql::dynamic::Schema,
    ) -> Result<Self, GatewayError> {
        let executor = DynamicSchemaExecutor::new(schema);
        let index = executor.schema_index()?;
        Ok(self
            .with_schema(index)
            .with_executor(Arc::new(executor)))
    }

    #[must_use]
    pub fn with_operation_builder(mut self, builder: Arc<dyn OperationBuilder>) -> Self {
        self.operation_builder = builder;
        self
    }

    #[must_use]
    pub fn on_route<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RouteInfo) + Send + Sync + 'static,
    {
        self.on_route = Some(Arc::new(callback));
        self
    }

    /// Replaces the default "500 with first message" error response.
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[crate::ExecutionErrorEntry]) -> axum::response::Response + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    #[must_use]
    pub fn context(mut self, context: ContextSource) -> Self {
        self.context = context;
        self
    }

    /// Hands the same value to every request.
    #[must_use]
    pub fn with_context_value(self, value: Value) -> Self {
        self.context(ContextSource::Static(value))
    }

    /// Computes the context value per request.
    #[must_use]
    pub fn with_context_factory<F, Fut>(self, factory: F) -> Self
    where
        F: Fn(RequestMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, GatewayError>> + Send + 'static,
    {
        self.context(ContextSource::factory(factory))
    }

    /// Overrides the webhook HTTP client.
    #[must_use]
    pub fn with_delivery(mut self, delivery: WebhookDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Synthesizes every route and builds the router.
    ///
    /// # Errors
    ///
    /// Fails on a missing schema or executor, invalid configuration, an
    /// operation that cannot be built, or a route on the webhook paths.
    /// When two routes share a method and path the first one is kept.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let Self {
            config,
            schema,
            executor,
            operation_builder,
            on_route,
            error_handler,
            context,
            delivery,
        } = self;

        config.validate().map_err(GatewayError::InvalidConfig)?;
        let schema =
            schema.ok_or_else(|| GatewayError::InvalidConfig("a schema is required".into()))?;
        let executor =
            executor.ok_or_else(|| GatewayError::InvalidConfig("an executor is required".into()))?;

        let models = extract_models(&schema);

        let routes = distinct_routes(
            RouteSynthesizer::new(&schema, &config, &models, operation_builder.as_ref())
                .synthesize()?,
        );
        if let Some(callback) = &on_route {
            for route in &routes {
                callback(route);
            }
        }

        let delivery = match delivery {
            Some(delivery) => delivery,
            None => WebhookDelivery::new(config.webhook.timeout())?,
        };
        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::clone(&schema),
            Arc::clone(&executor),
            delivery,
            operation_builder.as_ref(),
            &models,
            &config,
        )?);

        let state = GatewayState {
            schema: Arc::clone(&schema),
            executor,
            context,
            error_handler,
            subscriptions: Arc::clone(&subscriptions),
        };
        let router = route_router(&routes)?
            .merge(webhook_router())
            .with_state(state);

        let base_path = config.normalized_base_path();
        let router = if base_path.is_empty() {
            router
        } else {
            Router::new().nest(base_path, router)
        };

        info!(
            routes = routes.len(),
            models = models.len(),
            base_path = %base_path,
            "Gateway built"
        );

        Ok(Gateway {
            router,
            routes,
            models,
            subscriptions,
            schema,
            config,
        })
    }
}

/// Drops every route whose method and path are already taken.
fn distinct_routes(routes: Vec<RouteInfo>) -> Vec<Arc<RouteInfo>> {
    let mut seen: HashSet<(HttpMethod, String)> = HashSet::new();
    routes
        .into_iter()
        .filter(|route| {
            let fresh = seen.insert((route.method, to_axum_path(&route.path)));
            if !fresh {
                warn!(
                    method = %route.method,
                    path = %route.path,
                    operation = %route.document.name,
                    "Route skipped, method and path already registered"
                );
            }
            fresh
        })
        .map(Arc::new)
        .collect()
}

/// One method router per path, in first-seen order.
fn route_router(routes: &[Arc<RouteInfo>]) -> Result<Router<GatewayState>, GatewayError> {
    let mut by_path: IndexMap<String, MethodRouter<GatewayState>> = IndexMap::new();

    for route in routes {
        let path = to_axum_path(&route.path);
        if path == "/webhook" || path.starts_with("/webhook/") {
            return Err(GatewayError::InvalidConfig(format!(
                "route path {} collides with the webhook endpoints",
                route.path
            )));
        }
        let existing = by_path.shift_remove(&path);
        let method_router = handler::add_route(existing, Arc::clone(route));
        by_path.insert(path, method_router);
    }

    Ok(by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router)
        }))
}

/// REST surface over a GraphQL schema.
pub struct Gateway {
    router: Router,
    routes: Vec<Arc<RouteInfo>>,
    models: BTreeSet<String>,
    subscriptions: Arc<SubscriptionManager>,
    schema: Arc<SchemaIndex>,
    config: GatewayConfig,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("routes", &self.routes.len())
            .field("models", &self.models)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteInfo>] {
        &self.routes
    }

    /// Object types reduced to `id` when nested.
    #[must_use]
    pub fn models(&self) -> &BTreeSet<String> {
        &self.models
    }

    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaIndex> {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Describes every route as an OpenAPI document. Paths carry the base path.
    ///
    /// `custom_scalars` from the configuration are used when the options
    /// bring none.
    #[must_use]
    pub fn openapi(&self, mut options: OpenApiOptions) -> OpenApiDocument {
        if options.custom_scalars.is_empty() {
            options.custom_scalars = self.config.custom_scalars.clone();
        }
        let mut openapi = OpenApi::new(Arc::clone(&self.schema), options);
        let route_options = AddRouteOptions::with_base_path(self.config.normalized_base_path());
        for route in &self.routes {
            openapi.add_route(route, &route_options);
        }
        openapi.into_document()
    }
}
