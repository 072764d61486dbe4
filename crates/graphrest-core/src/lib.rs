//! # graphrest-core
//!
//! Type-system layer shared by every graphrest crate.
//!
//! This crate turns GraphQL SDL into a closed, exhaustively matchable
//! representation of the schema and derives the artifacts the REST surface
//! is synthesized from:
//!
//! - [`SchemaIndex`] - introspected type map with root operation types
//! - [`TypeRef`] - `Named | List | NonNull` type references
//! - [`extract_models`] - classification of identifiable resources
//! - [`OperationDocument`] - the single-field operation synthesized per route
//! - [`OperationBuilder`] / [`SelectionBuilder`] - building those documents
//! - [`RouteInfo`] - bookkeeping record of one synthesized HTTP route
//!
//! ## Example
//!
//! ```
//! use graphrest_core::{SchemaIndex, extract_models};
//!
//! let schema = SchemaIndex::parse(r#"
//!     type Query { user(id: ID!): User  users: [User!]! }
//!     type User { id: ID!  name: String! }
//! "#).unwrap();
//!
//! let models = extract_models(&schema);
//! assert!(models.contains("User"));
//! ```

pub mod builder;
pub mod error;
pub mod index;
pub mod models;
pub mod naming;
pub mod operation;
pub mod route;
pub mod types;

pub use builder::{BuildOperationOptions, OperationBuilder, SelectionBuilder};
pub use error::SchemaError;
pub use index::SchemaIndex;
pub use models::extract_models;
pub use naming::{is_name_equal, to_param_case};
pub use operation::{
    FieldSelection, OperationDocument, OperationInfo, OperationKind, Selection,
    VariableDefinition,
};
pub use route::{HttpMethod, RouteInfo};
pub use types::{
    EnumValue, Field, InputValue, ObjectType, TypeDefinition, TypeKind, TypeRef,
};

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
