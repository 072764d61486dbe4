//! Executor over an in-process async-graphql dynamic schema.

use std::fmt;

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response, Variables};
use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt, stream};
use graphrest_core::{SchemaError, SchemaIndex};
use serde_json::Value;
use tracing::debug;

use super::{ExecutionRequest, ExecutionResult, Executor, SubscribeOutcome};
use crate::error::GatewayError;

/// Runs documents against an `async_graphql::dynamic::Schema`.
///
/// The request's [`GatewayContext`](crate::GatewayContext) is attached as
/// request data.
#[derive(Clone)]
pub struct DynamicSchemaExecutor {
    schema: Schema,
}

impl fmt::Debug for DynamicSchemaExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSchemaExecutor").finish_non_exhaustive()
    }
}

impl DynamicSchemaExecutor {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Introspects the schema through its SDL.
    ///
    /// # Errors
    ///
    /// Returns an error if the printed SDL cannot be parsed back.
    pub fn schema_index(&self) -> Result<SchemaIndex, SchemaError> {
        SchemaIndex::parse(&self.schema.sdl())
    }
}

fn to_graphql_request(request: ExecutionRequest) -> Request {
    let query = request.query();
    Request::new(query)
        .operation_name(request.document.name.clone())
        .variables(Variables::from_json(Value::Object(request.variables)))
        .data(request.context)
}

fn to_result(response: Response) -> Result<ExecutionResult, GatewayError> {
    let value =
        serde_json::to_value(&response).map_err(|e| GatewayError::Internal(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| GatewayError::Internal(e.to_string()))
}

#[async_trait]
impl Executor for DynamicSchemaExecutor {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, GatewayError> {
        debug!(operation = %request.operation_name(), "Executing operation");
        let response = self.schema.execute(to_graphql_request(request)).await;
        to_result(response)
    }

    async fn subscribe(
        &self,
        request: ExecutionRequest,
    ) -> Result<SubscribeOutcome, GatewayError> {
        debug!(operation = %request.operation_name(), "Starting subscription stream");
        let mut responses = self
            .schema
            .execute_stream(to_graphql_request(request))
            .boxed();

        // Request errors (parse, validation, variables) are yielded as the only
        // item on the first poll. Anything already polled is replayed.
        let mut polled = Vec::new();
        match responses.next().now_or_never() {
            Some(Some(response)) if response.is_err() => match responses.next().now_or_never() {
                Some(None) => return Ok(SubscribeOutcome::Single(to_result(response)?)),
                Some(Some(next)) => polled.extend([response, next]),
                None => polled.push(response),
            },
            Some(Some(response)) => polled.push(response),
            Some(None) => return Ok(SubscribeOutcome::Stream(stream::empty().boxed())),
            None => {}
        }

        let results = stream::iter(polled).chain(responses).map(to_result).boxed();
        Ok(SubscribeOutcome::Stream(results))
    }
}
