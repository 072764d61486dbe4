//! # graphrest-openapi
//!
//! OpenAPI 3.0 description of a synthesized REST surface.
//!
//! - [`mapper`] - GraphQL type references to JSON-Schema-shaped [`Schema`]s
//! - [`OpenApi`] - component schemas per object/input type plus one
//!   operation per added route
//!
//! Mapping is total: every type maps to some schema, so nothing here returns
//! an error.

pub mod builder;
pub mod document;
pub mod mapper;
pub mod schema;

pub use builder::{AddRouteOptions, OpenApi, OpenApiOptions, to_openapi_path};
pub use document::{
    Components, Info, OPENAPI_VERSION, OpenApiDocument, Operation, Parameter, ParameterLocation,
    PathItem, RequestBody, Response, Server, Tag,
};
pub use mapper::{build_schema_object, map_primitive, map_type, map_variable_type};
pub use schema::{CustomScalars, Schema};
