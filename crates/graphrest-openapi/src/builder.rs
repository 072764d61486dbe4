//! Incremental OpenAPI document builder.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use graphrest_core::{OperationKind, RouteInfo, SchemaIndex, TypeKind, VariableDefinition};

use crate::document::{
    Components, Info, OPENAPI_VERSION, OpenApiDocument, Operation, Parameter, ParameterLocation,
    PathItem, RequestBody, Response, Server, Tag, json_content,
};
use crate::mapper::{build_schema_object, map_type, map_variable_type};
use crate::schema::{CustomScalars, Schema};

/// Document-level options.
#[derive(Debug, Clone, Default)]
pub struct OpenApiOptions {
    pub info: Info,
    pub servers: Vec<Server>,
    /// Caller components; generated schemas replace caller schemas of the same name.
    pub components: Option<Components>,
    pub security: Option<Vec<Value>>,
    pub tags: Option<Vec<Tag>>,
    pub custom_scalars: CustomScalars,
}

/// Per-route options.
#[derive(Debug, Clone, Default)]
pub struct AddRouteOptions {
    /// Prefix prepended to the route path, e.g. `/api`.
    pub base_path: String,
}

impl AddRouteOptions {
    pub fn with_base_path(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

/// Accumulates the OpenAPI description of a synthesized REST surface.
///
/// Component schemas are generated once at construction; each synthesized
/// route is then added with [`OpenApi::add_route`].
#[derive(Debug, Clone)]
pub struct OpenApi {
    schema: Arc<SchemaIndex>,
    custom_scalars: CustomScalars,
    document: OpenApiDocument,
}

impl OpenApi {
    pub fn new(schema: Arc<SchemaIndex>, options: OpenApiOptions) -> Self {
        let OpenApiOptions {
            info,
            servers,
            components,
            security,
            tags,
            custom_scalars,
        } = options;

        let mut generated = IndexMap::new();
        for definition in schema.types() {
            let eligible = matches!(definition.kind, TypeKind::Object(_) | TypeKind::InputObject(_));
            if !eligible || definition.is_introspection() {
                continue;
            }
            if let Some(object) = build_schema_object(&schema, definition, &custom_scalars) {
                generated.insert(definition.name.clone(), object);
            }
        }

        let mut components = components.unwrap_or_default();
        components.schemas.extend(generated);
        debug!(schemas = components.schemas.len(), "OpenAPI components generated");

        Self {
            document: OpenApiDocument {
                openapi: OPENAPI_VERSION.to_string(),
                info,
                servers,
                tags: tags.unwrap_or_default(),
                security,
                paths: IndexMap::new(),
                components,
            },
            schema,
            custom_scalars,
        }
    }

    /// Describes one route, replacing any operation already registered for
    /// the same path and method.
    pub fn add_route(&mut self, route: &RouteInfo, options: &AddRouteOptions) {
        let path = format!("{}{}", options.base_path, to_openapi_path(&route.path));
        let operation = self.build_operation(&path, route);

        trace!(path = %path, method = %route.method, "OpenAPI path added");
        self.document
            .paths
            .entry(path)
            .or_insert_with(PathItem::new)
            .insert(route.method.as_str().to_ascii_lowercase(), operation);
    }

    /// Returns the document built so far.
    #[must_use]
    pub fn get(&self) -> &OpenApiDocument {
        &self.document
    }

    /// Consumes the builder, returning the document.
    #[must_use]
    pub fn into_document(self) -> OpenApiDocument {
        self.document
    }

    fn build_operation(&self, path: &str, route: &RouteInfo) -> Operation {
        let document = &route.document;
        let summary = self.summary(document.kind, route.field_name());

        let (request_body, parameters) = if route.method.uses_request_body() {
            let body = RequestBody {
                content: json_content(request_body_schema(&document.variables)),
            };
            (Some(body), None)
        } else {
            (None, Some(parameters(path, &document.variables)))
        };

        let mut response = Response {
            description: summary.clone(),
            content: IndexMap::new(),
        };
        if let Some(schema) = self.response_schema(document.kind, route.field_name()) {
            response.content = json_content(schema);
        }

        let mut responses = IndexMap::new();
        responses.insert("200".to_string(), response);

        Operation {
            tags: route.tags.clone(),
            description: route.description.clone(),
            summary,
            operation_id: document.name.clone(),
            request_body,
            parameters,
            responses,
        }
    }

    fn summary(&self, kind: OperationKind, field: &str) -> String {
        self.schema
            .root_field(kind, field)
            .ok()
            .and_then(|field| field.description.clone())
            .unwrap_or_default()
    }

    fn response_schema(&self, kind: OperationKind, field: &str) -> Option<Schema> {
        if kind == OperationKind::Subscription {
            return None;
        }
        let field = self.schema.root_field(kind, field).ok()?;
        Some(map_type(&self.schema, &field.ty, &self.custom_scalars))
    }
}

/// Converts every `:param` segment to `{param}`.
#[must_use]
pub fn to_openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn parameters(path: &str, variables: &[VariableDefinition]) -> Vec<Parameter> {
    variables
        .iter()
        .map(|variable| {
            let in_path = path.contains(&format!("{{{}}}", variable.name));
            Parameter {
                location: if in_path {
                    ParameterLocation::Path
                } else {
                    ParameterLocation::Query
                },
                name: variable.name.clone(),
                required: variable.ty.is_non_null(),
                schema: map_variable_type(&variable.ty),
            }
        })
        .collect()
}

fn request_body_schema(variables: &[VariableDefinition]) -> Schema {
    let required: Vec<String> = variables
        .iter()
        .filter(|variable| variable.ty.is_non_null())
        .map(|variable| variable.name.clone())
        .collect();
    let properties = variables
        .iter()
        .map(|variable| (variable.name.clone(), map_variable_type(&variable.ty)))
        .collect();

    Schema {
        properties: Some(properties),
        required: (!required.is_empty()).then_some(required),
        ..Schema::object()
    }
}
