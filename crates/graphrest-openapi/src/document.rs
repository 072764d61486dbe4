//! OpenAPI 3.0 document types.
//!
//! Sections the generator fills itself are typed; caller-provided sections
//! (`info`, `servers`, `security`, extra `components`) are kept as JSON so
//! they round-trip untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// Version written into every generated document.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Media type used for every request and response body.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// `info` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Info {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            extensions: IndexMap::new(),
        }
    }
}

impl Default for Info {
    fn default() -> Self {
        Self::new("graphrest", "0.0.1")
    }
}

/// `servers[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `tags[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `components` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    /// `securitySchemes`, `responses`, ... passed through from the caller.
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// `{schema}` under a media type key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// Content keyed by media type.
pub type Content = IndexMap<String, MediaType>;

/// Wraps a schema as `{"application/json": {schema}}`.
#[must_use]
pub fn json_content(schema: Schema) -> Content {
    let mut content = Content::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
    content
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: Content,
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub name: String,
    pub required: bool,
    pub schema: Schema,
}

/// Operation object of one method under one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub tags: Vec<String>,
    pub description: String,
    pub summary: String,
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    pub responses: IndexMap<String, Response>,
}

/// Lower-cased method name to operation.
pub type PathItem = IndexMap<String, Operation>;

/// A complete OpenAPI document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub components: Components,
}

impl OpenApiDocument {
    /// Looks up the operation registered for `method` (any case) under `path`.
    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths
            .get(path)
            .and_then(|item| item.get(&method.to_ascii_lowercase()))
    }

    /// Serializes the document to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
