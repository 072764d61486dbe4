//! Route synthesis.
//!
//! One route per query field (default `GET`) and per mutation field (default
//! `POST`). Paths are the dash-cased field name; a query returning a single
//! object and taking an `id` argument gets `/:id` appended. Overrides keyed by
//! `"<RootType>.<field>"` replace any part of the default.

use std::collections::BTreeSet;
use std::sync::Arc;

use graphrest_core::{
    BuildOperationOptions, Field, HttpMethod, OperationBuilder, OperationKind, RouteInfo,
    SchemaIndex, TypeRef, to_param_case,
};
use tracing::debug;

use crate::config::{GatewayConfig, RouteConfig};
use crate::error::GatewayError;

/// Default path of a field's route.
#[must_use]
pub fn default_path(field_name: &str, has_id: bool) -> String {
    let mut path = format!("/{}", to_param_case(field_name));
    if has_id {
        path.push_str("/:id");
    }
    path
}

/// Converts `:param` placeholders to axum's `{param}` syntax.
#[must_use]
pub fn to_axum_path(path: &str) -> String {
    graphrest_openapi::to_openapi_path(path)
}

/// Derives [`RouteInfo`]s from a schema.
pub struct RouteSynthesizer<'a> {
    schema: &'a SchemaIndex,
    config: &'a GatewayConfig,
    models: &'a BTreeSet<String>,
    builder: &'a dyn OperationBuilder,
}

impl<'a> RouteSynthesizer<'a> {
    pub fn new(
        schema: &'a SchemaIndex,
        config: &'a GatewayConfig,
        models: &'a BTreeSet<String>,
        builder: &'a dyn OperationBuilder,
    ) -> Self {
        Self {
            schema,
            config,
            models,
            builder,
        }
    }

    /// Checks that every override key names an existing query or mutation field.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] for the first unknown key.
    pub fn validate_overrides(&self) -> Result<(), GatewayError> {
        for key in self.config.routes.keys() {
            let known = [OperationKind::Query, OperationKind::Mutation]
                .into_iter()
                .filter_map(|kind| self.schema.root_type(kind))
                .any(|root| {
                    root.fields().is_some_and(|fields| {
                        fields
                            .values()
                            .any(|field| *key == format!("{}.{}", root.name, field.name))
                    })
                });
            if !known {
                return Err(GatewayError::InvalidConfig(format!(
                    "route override '{key}' does not name a query or mutation field"
                )));
            }
        }
        Ok(())
    }

    /// Synthesizes every route: queries first, then mutations, each in
    /// field declaration order.
    ///
    /// # Errors
    ///
    /// Fails on invalid overrides or when an operation cannot be built.
    pub fn synthesize(&self) -> Result<Vec<RouteInfo>, GatewayError> {
        self.validate_overrides()?;

        let mut routes = Vec::new();
        for kind in [OperationKind::Query, OperationKind::Mutation] {
            let Some(root) = self.schema.root_type(kind) else {
                continue;
            };
            let Some(fields) = root.fields() else {
                continue;
            };
            for field in fields.values() {
                let route = match kind {
                    OperationKind::Query => self.query_route(&root.name, field)?,
                    _ => self.mutation_route(&root.name, field)?,
                };
                routes.push(route);
            }
        }
        Ok(routes)
    }

    /// Route of one query field.
    ///
    /// # Errors
    ///
    /// Fails when the operation cannot be built.
    pub fn query_route(&self, root_name: &str, field: &Field) -> Result<RouteInfo, GatewayError> {
        let is_single = matches!(field.ty.nullable(), TypeRef::Named(name)
            if self.schema.get(name).is_some_and(|ty| ty.is_object()));
        let has_id = is_single && field.has_argument("id");
        self.build_route(
            OperationKind::Query,
            root_name,
            field,
            HttpMethod::Get,
            default_path(&field.name, has_id),
        )
    }

    /// Route of one mutation field.
    ///
    /// # Errors
    ///
    /// Fails when the operation cannot be built.
    pub fn mutation_route(
        &self,
        root_name: &str,
        field: &Field,
    ) -> Result<RouteInfo, GatewayError> {
        self.build_route(
            OperationKind::Mutation,
            root_name,
            field,
            HttpMethod::Post,
            default_path(&field.name, false),
        )
    }

    fn build_route(
        &self,
        kind: OperationKind,
        root_name: &str,
        field: &Field,
        default_method: HttpMethod,
        default_path: String,
    ) -> Result<RouteInfo, GatewayError> {
        let document = self.builder.build_operation(
            self.schema,
            &BuildOperationOptions {
                kind,
                field: &field.name,
                models: self.models,
                ignore: &self.config.ignore,
                depth_limit: self.config.depth_limit,
            },
        )?;

        let overrides = self
            .config
            .routes
            .get(&format!("{root_name}.{}", field.name))
            .cloned()
            .unwrap_or_default();
        let RouteConfig {
            method,
            path,
            response_status,
            tags,
            description,
        } = overrides;

        let route = RouteInfo {
            method: method.unwrap_or(default_method),
            path: path.unwrap_or(default_path),
            response_status: response_status.unwrap_or(200),
            tags: tags.unwrap_or_default(),
            description: description.unwrap_or_default(),
            document: Arc::new(document),
        };
        debug!(
            field = %field.name,
            kind = %kind,
            method = %route.method,
            path = %route.path,
            "Route synthesized"
        );
        Ok(route)
    }
}
