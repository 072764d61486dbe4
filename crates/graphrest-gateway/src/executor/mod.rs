//! GraphQL execution seam.
//!
//! The gateway never evaluates GraphQL itself. Every synthesized route and
//! every subscription goes through an [`Executor`]; [`DynamicSchemaExecutor`]
//! runs documents against an in-process `async_graphql::dynamic::Schema`.

mod dynamic;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use graphrest_core::OperationDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::GatewayContext;
use crate::error::GatewayError;

pub use dynamic::DynamicSchemaExecutor;

/// Shared executor handle.
pub type DynExecutor = Arc<dyn Executor>;

/// One operation to run.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub document: Arc<OperationDocument>,
    pub variables: Map<String, Value>,
    pub context: GatewayContext,
}

impl ExecutionRequest {
    /// GraphQL source text of the document.
    #[must_use]
    pub fn query(&self) -> String {
        self.document.to_string()
    }

    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.document.name
    }
}

/// One GraphQL error as reported by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl ExecutionErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

/// A GraphQL response: `{data, errors, extensions}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ExecutionErrorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn from_errors(errors: Vec<ExecutionErrorEntry>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// `data[field]`, or `Null` when data or the field is missing.
    #[must_use]
    pub fn field(&self, field: &str) -> Value {
        self.data
            .as_ref()
            .and_then(|data| data.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Results of a subscription, one per event.
pub type ResultStream = BoxStream<'static, Result<ExecutionResult, GatewayError>>;

/// What `subscribe` produced.
pub enum SubscribeOutcome {
    /// No stream was created, e.g. validation failed. Returned to the caller as is.
    Single(ExecutionResult),
    Stream(ResultStream),
}

impl std::fmt::Debug for SubscribeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(result) => f.debug_tuple("Single").field(result).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Runs operation documents.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes a query or mutation.
    ///
    /// GraphQL errors are part of the result; `Err` is reserved for failures
    /// to execute at all.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, GatewayError>;

    /// Starts a subscription.
    async fn subscribe(&self, request: ExecutionRequest)
    -> Result<SubscribeOutcome, GatewayError>;
}
