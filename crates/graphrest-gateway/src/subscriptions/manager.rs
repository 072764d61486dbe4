//! Subscription lifecycle.
//!
//! A client starts a subscription with a callback URL and receives an id.
//! Every event of the underlying GraphQL subscription is then POSTed to the
//! URL by a background task until the stream ends, a delivery fails, or the
//! client stops it.
//!
//! ```text
//! absent --start--> active --stop / stream end / delivery error--> absent
//!                     |
//!                   update = stop + start (new id)
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::StreamExt;
use graphrest_core::{
    BuildOperationOptions, OperationBuilder, OperationDocument, OperationKind, SchemaIndex,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::delivery::WebhookDelivery;
use crate::config::GatewayConfig;
use crate::context::GatewayContext;
use crate::error::GatewayError;
use crate::executor::{
    DynExecutor, ExecutionRequest, ExecutionResult, ResultStream, SubscribeOutcome,
};
use crate::params::{RequestInputs, resolve_variables};

/// Body of `POST /webhook`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartEvent {
    /// Subscription field name.
    pub subscription: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    /// Callback URL receiving each event.
    pub url: String,
}

/// Body of `POST /webhook/{id}`, with the id taken from the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub id: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// Result of starting a subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StartOutcome {
    /// A delivery loop is running for this client.
    Started { id: String },
    /// The executor answered with a single result instead of a stream.
    Immediate(ExecutionResult),
}

impl StartOutcome {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Started { id } => Some(id),
            Self::Immediate(_) => None,
        }
    }
}

struct ClientEntry {
    name: String,
    url: String,
    token: CancellationToken,
}

/// Turns GraphQL subscriptions into webhook-driven resources.
///
/// Owns the client registry; there is at most one delivery task per client id.
pub struct SubscriptionManager {
    schema: Arc<SchemaIndex>,
    executor: DynExecutor,
    delivery: WebhookDelivery,
    operations: HashMap<String, Arc<OperationDocument>>,
    clients: Arc<DashMap<String, ClientEntry>>,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("active_clients", &self.clients.len())
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    /// Builds one operation per subscription field.
    ///
    /// # Errors
    ///
    /// Fails when an operation cannot be built.
    pub fn new(
        schema: Arc<SchemaIndex>,
        executor: DynExecutor,
        delivery: WebhookDelivery,
        builder: &dyn OperationBuilder,
        models: &BTreeSet<String>,
        config: &GatewayConfig,
    ) -> Result<Self, GatewayError> {
        let operations = build_operations(&schema, builder, models, config)?;
        debug!(
            subscriptions = ?operations.keys().collect::<Vec<_>>(),
            "Subscription operations built"
        );
        Ok(Self {
            schema,
            executor,
            delivery,
            operations,
            clients: Arc::new(DashMap::new()),
        })
    }

    /// Operation built for a subscription field.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Arc<OperationDocument>> {
        self.operations.get(name)
    }

    /// Starts a subscription.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnknownSubscription`] for an unknown field, variable
    /// coercion errors, and executor failures.
    pub async fn start(
        &self,
        event: StartEvent,
        context: GatewayContext,
    ) -> Result<StartOutcome, GatewayError> {
        let StartEvent {
            subscription,
            variables,
            url,
        } = event;
        let document = self
            .operations
            .get(&subscription)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownSubscription(subscription.clone()))?;

        let id = Uuid::new_v4().to_string();
        info!(client_id = %id, subscription = %subscription, url = %url, "Subscription start");

        let variables = resolve_variables(
            &self.schema,
            &document.variables,
            &RequestInputs::from_body(&variables),
        )?;
        let outcome = self
            .executor
            .subscribe(ExecutionRequest {
                document,
                variables,
                context,
            })
            .await?;

        match outcome {
            SubscribeOutcome::Single(result) => Ok(StartOutcome::Immediate(result)),
            SubscribeOutcome::Stream(stream) => {
                let token = CancellationToken::new();
                self.clients.insert(
                    id.clone(),
                    ClientEntry {
                        name: subscription,
                        url: url.clone(),
                        token: token.clone(),
                    },
                );
                self.spawn_delivery(id.clone(), url, stream, token);
                Ok(StartOutcome::Started { id })
            }
        }
    }

    /// Stops a subscription. The in-flight POST, if any, completes; no
    /// further event is requested.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnknownClient`] when no client has this id.
    pub fn stop(&self, id: &str) -> Result<String, GatewayError> {
        info!(client_id = %id, "Subscription stop");
        let (id, entry) = self
            .clients
            .remove(id)
            .ok_or_else(|| GatewayError::UnknownClient(id.to_string()))?;
        entry.token.cancel();
        Ok(id)
    }

    /// Restarts a subscription with new variables.
    ///
    /// The client keeps its subscription and callback URL but gets a new id.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnknownClient`] when no client has this id, then
    /// anything [`start`](Self::start) returns.
    pub async fn update(
        &self,
        event: UpdateEvent,
        context: GatewayContext,
    ) -> Result<StartOutcome, GatewayError> {
        info!(client_id = %event.id, "Subscription update");
        let (subscription, url) = self
            .clients
            .get(&event.id)
            .map(|entry| (entry.name.clone(), entry.url.clone()))
            .ok_or_else(|| GatewayError::UnknownClient(event.id.clone()))?;

        self.stop(&event.id)?;
        self.start(
            StartEvent {
                subscription,
                variables: event.variables,
                url,
            },
            context,
        )
        .await
    }

    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    #[must_use]
    pub fn active_clients(&self) -> usize {
        self.clients.len()
    }

    /// Cancels every active client.
    pub fn shutdown(&self) {
        let count = self.clients.len();
        self.clients.retain(|_, entry| {
            entry.token.cancel();
            false
        });
        info!(clients = count, "Subscriptions shut down");
    }

    fn spawn_delivery(
        &self,
        id: String,
        url: String,
        mut stream: ResultStream,
        token: CancellationToken,
    ) {
        let clients = Arc::clone(&self.clients);
        let delivery = self.delivery.clone();
        let span = info_span!("subscription", client_id = %id);

        tokio::spawn(
            async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            debug!("Subscription cancelled");
                            break;
                        }
                        next = stream.next() => next,
                    };

                    match next {
                        Some(Ok(result)) => {
                            info!("Subscription trigger");
                            if let Err(err) = delivery.deliver(&id, &url, &result).await {
                                error!(error = %err, url = %url, "Webhook delivery failed");
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "Subscription stream failed");
                            break;
                        }
                        None => {
                            debug!("Subscription completed");
                            break;
                        }
                    }
                }
                // Ids are never reused, so this can only remove our own entry.
                clients.remove(&id);
            }
            .instrument(span),
        );
    }
}

fn build_operations(
    schema: &SchemaIndex,
    builder: &dyn OperationBuilder,
    models: &BTreeSet<String>,
    config: &GatewayConfig,
) -> Result<HashMap<String, Arc<OperationDocument>>, GatewayError> {
    let Some(fields) = schema.subscription_type().and_then(|ty| ty.fields()) else {
        return Ok(HashMap::new());
    };

    let mut operations = HashMap::with_capacity(fields.len());
    for field in fields.values() {
        let document = builder.build_operation(
            schema,
            &BuildOperationOptions {
                kind: OperationKind::Subscription,
                field: &field.name,
                models,
                ignore: &config.ignore,
                depth_limit: config.depth_limit,
            },
        )?;
        operations.insert(field.name.clone(), Arc::new(document));
    }
    Ok(operations)
}
