//! Executor forwarding operations to a GraphQL-over-HTTP endpoint.

use async_trait::async_trait;
use graphrest_core::SchemaIndex;
use graphrest_gateway::{
    ExecutionErrorEntry, ExecutionRequest, ExecutionResult, Executor, GatewayError,
    SubscribeOutcome,
};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderName};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::config::UpstreamConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLRequest<'a> {
    query: String,
    variables: &'a Map<String, Value>,
    operation_name: &'a str,
}

/// POSTs `{query, variables, operationName}` to the upstream endpoint.
///
/// Subscriptions are answered with a single error result: plain HTTP has no
/// event stream to forward.
#[derive(Debug, Clone)]
pub struct UpstreamExecutor {
    client: Client,
    url: String,
    forward_headers: Vec<HeaderName>,
}

impl UpstreamExecutor {
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let forward_headers = config
            .forward_headers
            .iter()
            .map(|name| {
                HeaderName::try_from(name.as_str()).map_err(|e| {
                    GatewayError::InvalidConfig(format!(
                        "upstream.forward_headers: invalid header '{name}': {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            forward_headers,
        })
    }
}

#[async_trait]
impl Executor for UpstreamExecutor {
    #[instrument(skip(self, request), fields(operation = %request.operation_name()))]
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, GatewayError> {
        let body = GraphQLRequest {
            query: request.query(),
            variables: &request.variables,
            operation_name: request.operation_name(),
        };

        let mut builder = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        for name in &self.forward_headers {
            if let Some(value) = request.context.headers.get(name) {
                builder = builder.header(name, value);
            }
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Upstream(format!("request timed out: {e}"))
            } else if e.is_connect() {
                GatewayError::Upstream(format!("failed to connect: {e}"))
            } else {
                GatewayError::Upstream(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Upstream(format!("failed to read response: {e}")))?;
        debug!(status = status.as_u16(), "Upstream responded");

        // GraphQL-over-HTTP servers may answer errors with 4xx and a valid body.
        serde_json::from_str::<ExecutionResult>(&text).map_err(|e| {
            GatewayError::Upstream(format!(
                "unexpected response (status {}): {e}",
                status.as_u16()
            ))
        })
    }

    async fn subscribe(
        &self,
        request: ExecutionRequest,
    ) -> Result<SubscribeOutcome, GatewayError> {
        info!(
            operation = %request.operation_name(),
            "Subscriptions are not forwarded upstream"
        );
        Ok(SubscribeOutcome::Single(ExecutionResult::from_errors(vec![
            ExecutionErrorEntry::new("subscriptions are not supported by the upstream executor"),
        ])))
    }
}

/// Loads the upstream SDL from `schema_path`, else from `sdl_url`.
pub async fn load_schema(config: &UpstreamConfig) -> anyhow::Result<SchemaIndex> {
    let sdl = match (&config.schema_path, &config.sdl_url) {
        (Some(path), _) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read schema file '{path}': {e}"))?,
        (None, Some(url)) => {
            let client = Client::builder()
                .timeout(config.timeout())
                .build()?;
            client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        }
        (None, None) => anyhow::bail!("no upstream schema source configured"),
    };
    let schema = SchemaIndex::parse(&sdl)?;
    info!(types = schema.types().count(), "Upstream schema loaded");
    Ok(schema)
}
