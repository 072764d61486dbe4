//! Gateway error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use graphrest_core::SchemaError;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors raised by the REST surface and the subscription manager.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `start` named a field the subscription type does not have.
    #[error("Subscription '{0}' is not defined")]
    UnknownSubscription(String),

    /// No active subscription client has this id.
    #[error("Subscription client '{0}' not found")]
    UnknownClient(String),

    /// The executor reported GraphQL errors.
    #[error("Execution failed: {}", .0.join("; "))]
    Execution(Vec<String>),

    /// A webhook POST failed.
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),

    /// A request value could not be coerced to its variable type.
    #[error("Invalid value for variable '{name}': {message}")]
    InvalidVariable { name: String, message: String },

    /// Malformed request (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Gateway configuration does not match the schema.
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The context factory failed.
    #[error("Context error: {0}")]
    Context(String),

    /// A remote GraphQL endpoint could not be reached or answered garbage.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_variable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidVariable {
            name: name.into(),
            message: message.into(),
        }
    }

    /// HTTP status used when the error is returned from a REST route.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidVariable { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownSubscription(_) | Self::UnknownClient(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Execution(_)
            | Self::Delivery(_)
            | Self::InvalidConfig(_)
            | Self::Schema(_)
            | Self::Context(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSubscription(_) => "UNKNOWN_SUBSCRIPTION",
            Self::UnknownClient(_) => "UNKNOWN_CLIENT",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::InvalidVariable { .. } => "INVALID_VARIABLE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Schema(err) => err.error_code(),
            Self::Context(_) => "CONTEXT_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// `{"error": {"code", "message"}}` body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery(err.to_string())
    }
}
