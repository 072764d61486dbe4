//! Error types for schema introspection and operation building.

use thiserror::Error;

use crate::operation::OperationKind;

/// Errors raised while reading a schema or building operations from it.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The SDL could not be parsed.
    #[error("Failed to parse schema: {0}")]
    Parse(String),

    /// The schema has no root type for the requested operation kind.
    #[error("Schema has no {0} type")]
    MissingRootType(OperationKind),

    /// The requested field does not exist on the root type.
    #[error("Field '{field}' does not exist on type '{type_name}'")]
    UnknownField {
        /// Root type name.
        type_name: String,
        /// Requested field name.
        field: String,
    },

    /// A type referenced by the schema is not defined.
    #[error("Unknown type: {0}")]
    UnknownType(String),
}

impl SchemaError {
    /// Returns the error code used in error payloads.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "SCHEMA_PARSE_ERROR",
            Self::MissingRootType(_) => "MISSING_ROOT_TYPE",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::UnknownType(_) => "UNKNOWN_TYPE",
        }
    }
}

impl From<async_graphql_parser::Error> for SchemaError {
    fn from(err: async_graphql_parser::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
