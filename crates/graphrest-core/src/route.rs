//! Synthesized route records.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::operation::OperationDocument;

/// HTTP verbs a synthesized route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Methods whose variables travel in a JSON request body.
    #[must_use]
    pub fn uses_request_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesized route, as handed to `on_route` callbacks and the OpenAPI builder.
///
/// `path` uses the `:param` placeholder syntax and excludes the base path.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub method: HttpMethod,
    pub path: String,
    pub response_status: u16,
    pub tags: Vec<String>,
    pub description: String,
    pub document: Arc<OperationDocument>,
}

impl RouteInfo {
    /// Name of the root field the route executes.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.document.info().root_field
    }

    /// Path parameter names, in order of appearance.
    #[must_use]
    pub fn path_params(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .collect()
    }
}
