//! Webhook delivery of subscription events.

use std::time::{Duration, Instant};

use reqwest::{Client, header};
use tracing::debug;

use crate::error::GatewayError;
use crate::executor::ExecutionResult;

/// POSTs subscription results to client callback URLs.
#[derive(Debug, Clone, Default)]
pub struct WebhookDelivery {
    client: Client,
}

impl WebhookDelivery {
    /// Creates a delivery client, optionally bounding each request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create with a custom client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends one result and waits for the response body.
    ///
    /// The response status is not checked; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Delivery`] when the request or body read fails.
    pub async fn deliver(
        &self,
        client_id: &str,
        url: &str,
        result: &ExecutionResult,
    ) -> Result<(), GatewayError> {
        let start = Instant::now();
        let body = serde_json::to_vec(result)
            .map_err(|e| GatewayError::Delivery(format!("Failed to serialize result: {e}")))?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        response.text().await?;

        debug!(
            client_id = client_id,
            url = url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Webhook delivered"
        );
        Ok(())
    }
}
