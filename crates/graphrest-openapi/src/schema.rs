//! OpenAPI schema objects.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of local component references.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Custom scalar name to schema table, e.g. `DateTime -> {type: string, format: date-time}`.
pub type CustomScalars = IndexMap<String, Schema>;

/// A JSON-Schema-shaped OpenAPI schema object.
///
/// Only the keywords the generator emits are modelled; anything else a caller
/// supplies (custom scalars, merged components) survives in `extensions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Schema {
    /// `{type: <ty>}`.
    pub fn of_type(ty: impl Into<String>) -> Self {
        Self {
            schema_type: Some(ty.into()),
            ..Self::default()
        }
    }

    /// `{type: object}`, the fallback for anything without a better mapping.
    #[must_use]
    pub fn object() -> Self {
        Self::of_type("object")
    }

    /// `{type: array, items: <items>}`.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type("array")
        }
    }

    /// `{$ref: "#/components/schemas/<name>"}`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{COMPONENTS_PREFIX}{name}")),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the referenced component name, if this is a `$ref`.
    #[must_use]
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|reference| reference.strip_prefix(COMPONENTS_PREFIX))
    }
}
