//! Operation building.
//!
//! [`OperationBuilder`] is the seam through which the REST layer obtains the
//! GraphQL document for a root field. [`SelectionBuilder`] is the default
//! implementation:
//!
//! - every argument becomes a variable; root arguments keep their name, nested
//!   ones are prefixed with the path to their field (`user_posts_first`)
//! - nested model types select only `id`, unless ignored
//! - a composite type already present `depth_limit` times among the ancestors
//!   is not expanded again
//! - abstract types select `__typename` plus one inline fragment per possible type

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::SchemaError;
use crate::index::SchemaIndex;
use crate::operation::{
    FieldSelection, OperationDocument, OperationKind, Selection, VariableDefinition,
};
use crate::types::{Field, TypeDefinition, TypeKind, TypeRef};

/// Inputs for building one operation.
#[derive(Debug, Clone, Copy)]
pub struct BuildOperationOptions<'a> {
    pub kind: OperationKind,
    /// Root field name.
    pub field: &'a str,
    pub models: &'a BTreeSet<String>,
    /// Type names (`User`) or field coordinates (`Post.author`) never treated as models.
    pub ignore: &'a [String],
    /// Maximum number of times a type may repeat along one selection path.
    pub depth_limit: usize,
}

/// Builds the operation document for one root field.
pub trait OperationBuilder: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the root type or field does not exist.
    fn build_operation(
        &self,
        schema: &SchemaIndex,
        options: &BuildOperationOptions<'_>,
    ) -> Result<OperationDocument, SchemaError>;
}

/// Default [`OperationBuilder`] walking the schema to build selections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionBuilder;

impl OperationBuilder for SelectionBuilder {
    fn build_operation(
        &self,
        schema: &SchemaIndex,
        options: &BuildOperationOptions<'_>,
    ) -> Result<OperationDocument, SchemaError> {
        let root_type = schema
            .root_type(options.kind)
            .ok_or(SchemaError::MissingRootType(options.kind))?;
        let field = root_type
            .field(options.field)
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: root_type.name.clone(),
                field: options.field.to_string(),
            })?;

        let mut walker = Walker {
            schema,
            options,
            variables: Vec::new(),
        };
        let root = walker
            .resolve_field(&root_type.name, field, &[], &mut Vec::new(), true)
            .ok_or_else(|| SchemaError::UnknownType(field.ty.named_type().to_string()))?;

        let document = OperationDocument {
            kind: options.kind,
            name: format!("{}_{}", options.field, options.kind),
            variables: walker.variables,
            root,
        };
        trace!(document = %document, "Operation built");
        Ok(document)
    }
}

struct Walker<'a> {
    schema: &'a SchemaIndex,
    options: &'a BuildOperationOptions<'a>,
    variables: Vec<VariableDefinition>,
}

impl<'a> Walker<'a> {
    /// Returns `None` for a nested composite field left with nothing to select.
    fn resolve_field(
        &mut self,
        parent: &str,
        field: &'a Field,
        path: &[String],
        ancestors: &mut Vec<String>,
        first_call: bool,
    ) -> Option<FieldSelection> {
        let schema = self.schema;
        let named = field.ty.named_type();
        let mark = self.variables.len();

        let selections = match schema.get(named) {
            Some(definition) if definition.is_composite() => {
                let mut field_path = path.to_vec();
                field_path.push(field.name.clone());
                ancestors.push(named.to_string());
                let mut selections = self.resolve_selection_set(
                    definition,
                    parent,
                    &field.name,
                    &field_path,
                    ancestors,
                    first_call,
                );
                ancestors.pop();

                if selections.is_empty() {
                    if !first_call {
                        return None;
                    }
                    selections.push(typename());
                }
                selections
            }
            _ => Vec::new(),
        };

        // Parent variables are declared ahead of those found in its selections.
        let mut position = mark;
        let arguments = field
            .args
            .iter()
            .map(|arg| {
                let variable = if first_call {
                    arg.name.clone()
                } else {
                    argument_name(&arg.name, path, &field.name)
                };
                if self.add_variable(position, &variable, &arg.ty) {
                    position += 1;
                }
                (arg.name.clone(), variable)
            })
            .collect();

        Some(FieldSelection {
            name: field.name.clone(),
            arguments,
            selections,
        })
    }

    fn resolve_selection_set(
        &mut self,
        definition: &'a TypeDefinition,
        parent: &str,
        field_name: &str,
        path: &[String],
        ancestors: &mut Vec<String>,
        first_call: bool,
    ) -> Vec<Selection> {
        let schema = self.schema;
        match &definition.kind {
            TypeKind::Object(_) => {
                self.resolve_object(definition, parent, field_name, path, ancestors, first_call)
            }
            TypeKind::Interface(_) | TypeKind::Union(_) => {
                let mut selections = vec![typename()];
                for possible in schema.possible_types(&definition.name) {
                    let nested = self.resolve_object(
                        possible, parent, field_name, path, ancestors, first_call,
                    );
                    if !nested.is_empty() {
                        selections.push(Selection::InlineFragment {
                            type_condition: possible.name.clone(),
                            selections: nested,
                        });
                    }
                }
                selections
            }
            TypeKind::Scalar | TypeKind::Enum(_) | TypeKind::InputObject(_) => Vec::new(),
        }
    }

    fn resolve_object(
        &mut self,
        definition: &'a TypeDefinition,
        parent: &str,
        field_name: &str,
        path: &[String],
        ancestors: &mut Vec<String>,
        first_call: bool,
    ) -> Vec<Selection> {
        let schema = self.schema;
        let options = self.options;

        let coordinate = format!("{parent}.{field_name}");
        let ignored = options
            .ignore
            .iter()
            .any(|entry| *entry == definition.name || *entry == coordinate);
        if !first_call && options.models.contains(&definition.name) && !ignored {
            return vec![Selection::Field(FieldSelection::leaf("id"))];
        }

        let Some(fields) = definition.fields() else {
            return Vec::new();
        };

        let mut selections = Vec::new();
        for field in fields.values() {
            let named = field.ty.named_type();
            let composite = schema.get(named).is_some_and(TypeDefinition::is_composite);
            if composite && has_circular_ref(ancestors, named, options.depth_limit) {
                continue;
            }
            if let Some(selection) =
                self.resolve_field(&definition.name, field, path, ancestors, false)
            {
                selections.push(Selection::Field(selection));
            }
        }
        selections
    }

    fn add_variable(&mut self, position: usize, name: &str, ty: &TypeRef) -> bool {
        if self.variables.iter().any(|v| v.name == name) {
            return false;
        }
        self.variables
            .insert(position, VariableDefinition::new(name, ty.clone()));
        true
    }
}

fn typename() -> Selection {
    Selection::Field(FieldSelection::leaf("__typename"))
}

fn argument_name(name: &str, path: &[String], field: &str) -> String {
    let mut parts: Vec<&str> = path.iter().map(String::as_str).collect();
    parts.extend([field, name]);
    parts.join("_")
}

fn has_circular_ref(ancestors: &[String], named: &str, depth_limit: usize) -> bool {
    let occurrences = ancestors.iter().filter(|a| *a == named).count() + 1;
    occurrences > depth_limit
}
