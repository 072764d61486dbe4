//! Schema introspection.
//!
//! [`SchemaIndex`] is built from SDL text. The parser's AST is converted into
//! the closed [`TypeDefinition`] representation once; everything downstream
//! reads the index, never the AST.

use async_graphql_parser::types::{
    BaseType, FieldDefinition, InputValueDefinition, SchemaDefinition, ServiceDocument, Type,
    TypeDefinition as AstTypeDefinition, TypeKind as AstTypeKind, TypeSystemDefinition,
};
use async_graphql_parser::{Positioned, parse_schema};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::operation::OperationKind;
use crate::types::{
    EnumValue, Field, InputValue, ObjectType, TypeDefinition, TypeKind, TypeRef,
};

/// Scalars every schema has, whether or not the SDL declares them.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Introspected view of a GraphQL schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    types: IndexMap<String, TypeDefinition>,
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl SchemaIndex {
    /// Parses SDL into an index.
    ///
    /// Root types come from a `schema { ... }` block when present, otherwise
    /// from the conventional `Query`, `Mutation` and `Subscription` names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] when the SDL is invalid.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let document = parse_schema(sdl)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: ServiceDocument) -> Self {
        let mut index = Self::default();
        let mut extensions = Vec::new();
        let mut roots = RootNames::default();

        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => roots.merge(&schema.node),
                TypeSystemDefinition::Type(ty) => {
                    if ty.node.extend {
                        extensions.push(ty.node);
                    } else {
                        let converted = convert_type(ty.node);
                        index.types.insert(converted.name.clone(), converted);
                    }
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        for extension in extensions {
            index.apply_extension(convert_type(extension));
        }

        for scalar in BUILTIN_SCALARS {
            index
                .types
                .entry(scalar.to_string())
                .or_insert_with(|| TypeDefinition::new(scalar, TypeKind::Scalar));
        }

        index.query = roots.query.or_else(|| index.conventional_root("Query"));
        index.mutation = roots.mutation.or_else(|| index.conventional_root("Mutation"));
        index.subscription = roots
            .subscription
            .or_else(|| index.conventional_root("Subscription"));

        debug!(
            types = index.types.len(),
            query = ?index.query,
            mutation = ?index.mutation,
            subscription = ?index.subscription,
            "Schema indexed"
        );

        index
    }

    fn conventional_root(&self, name: &str) -> Option<String> {
        self.types
            .get(name)
            .filter(|ty| ty.is_object())
            .map(|ty| ty.name.clone())
    }

    fn apply_extension(&mut self, extension: TypeDefinition) {
        let Some(base) = self.types.get_mut(&extension.name) else {
            // Extending an undeclared type declares it.
            self.types.insert(extension.name.clone(), extension);
            return;
        };

        match (&mut base.kind, extension.kind) {
            (TypeKind::Object(base), TypeKind::Object(ext))
            | (TypeKind::Interface(base), TypeKind::Interface(ext)) => {
                base.fields.extend(ext.fields);
                base.interfaces.extend(ext.interfaces);
            }
            (TypeKind::Union(base), TypeKind::Union(ext)) => base.extend(ext),
            (TypeKind::Enum(base), TypeKind::Enum(ext)) => base.extend(ext),
            (TypeKind::InputObject(base), TypeKind::InputObject(ext)) => base.extend(ext),
            (TypeKind::Scalar, TypeKind::Scalar) => {}
            _ => warn!(
                type_name = %extension.name,
                "Type extension kind does not match the base type, ignoring"
            ),
        }
    }

    /// Looks up a named type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Iterates over every named type in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Returns the root type for an operation kind.
    #[must_use]
    pub fn root_type(&self, kind: OperationKind) -> Option<&TypeDefinition> {
        let name = match kind {
            OperationKind::Query => self.query.as_deref(),
            OperationKind::Mutation => self.mutation.as_deref(),
            OperationKind::Subscription => self.subscription.as_deref(),
        }?;
        self.types.get(name)
    }

    #[must_use]
    pub fn query_type(&self) -> Option<&TypeDefinition> {
        self.root_type(OperationKind::Query)
    }

    #[must_use]
    pub fn mutation_type(&self) -> Option<&TypeDefinition> {
        self.root_type(OperationKind::Mutation)
    }

    #[must_use]
    pub fn subscription_type(&self) -> Option<&TypeDefinition> {
        self.root_type(OperationKind::Subscription)
    }

    /// Looks up a field on the root type of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error when the root type or the field is missing.
    pub fn root_field(&self, kind: OperationKind, field: &str) -> Result<&Field, SchemaError> {
        let root = self
            .root_type(kind)
            .ok_or(SchemaError::MissingRootType(kind))?;
        root.field(field).ok_or_else(|| SchemaError::UnknownField {
            type_name: root.name.clone(),
            field: field.to_string(),
        })
    }

    /// Object types a field of abstract type `name` may resolve to.
    ///
    /// For a union these are its members, for an interface the object types
    /// implementing it, for an object type the type itself.
    #[must_use]
    pub fn possible_types(&self, name: &str) -> Vec<&TypeDefinition> {
        let Some(definition) = self.types.get(name) else {
            return Vec::new();
        };
        match &definition.kind {
            TypeKind::Union(members) => members
                .iter()
                .filter_map(|member| self.types.get(member))
                .collect(),
            TypeKind::Interface(_) => self
                .types
                .values()
                .filter(|candidate| match &candidate.kind {
                    TypeKind::Object(object) => object.interfaces.iter().any(|i| i == name),
                    _ => false,
                })
                .collect(),
            TypeKind::Object(_) => vec![definition],
            TypeKind::Scalar | TypeKind::Enum(_) | TypeKind::InputObject(_) => Vec::new(),
        }
    }
}

#[derive(Default)]
struct RootNames {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl RootNames {
    fn merge(&mut self, schema: &SchemaDefinition) {
        if let Some(query) = &schema.query {
            self.query = Some(query.node.to_string());
        }
        if let Some(mutation) = &schema.mutation {
            self.mutation = Some(mutation.node.to_string());
        }
        if let Some(subscription) = &schema.subscription {
            self.subscription = Some(subscription.node.to_string());
        }
    }
}

fn convert_type(definition: AstTypeDefinition) -> TypeDefinition {
    let kind = match definition.kind {
        AstTypeKind::Scalar => TypeKind::Scalar,
        AstTypeKind::Object(object) => TypeKind::Object(ObjectType {
            fields: convert_fields(object.fields),
            interfaces: object.implements.iter().map(|i| i.node.to_string()).collect(),
        }),
        AstTypeKind::Interface(interface) => TypeKind::Interface(ObjectType {
            fields: convert_fields(interface.fields),
            interfaces: interface
                .implements
                .iter()
                .map(|i| i.node.to_string())
                .collect(),
        }),
        AstTypeKind::Union(union) => TypeKind::Union(
            union
                .members
                .iter()
                .map(|member| member.node.to_string())
                .collect(),
        ),
        AstTypeKind::Enum(enum_type) => TypeKind::Enum(
            enum_type
                .values
                .into_iter()
                .map(|value| EnumValue {
                    name: value.node.value.node.to_string(),
                    description: value.node.description.map(|d| d.node),
                })
                .collect(),
        ),
        AstTypeKind::InputObject(input) => TypeKind::InputObject(
            input
                .fields
                .into_iter()
                .map(|field| {
                    let value = convert_input_value(field);
                    (value.name.clone(), value)
                })
                .collect(),
        ),
    };

    TypeDefinition {
        name: definition.name.node.to_string(),
        description: definition.description.map(|d| d.node),
        kind,
    }
}

fn convert_fields(fields: Vec<Positioned<FieldDefinition>>) -> IndexMap<String, Field> {
    fields
        .into_iter()
        .map(|field| {
            let field = field.node;
            let converted = Field {
                name: field.name.node.to_string(),
                description: field.description.map(|d| d.node),
                ty: convert_type_ref(&field.ty.node),
                args: field.arguments.into_iter().map(convert_input_value).collect(),
            };
            (converted.name.clone(), converted)
        })
        .collect()
}

fn convert_input_value(value: Positioned<InputValueDefinition>) -> InputValue {
    let value = value.node;
    InputValue {
        name: value.name.node.to_string(),
        description: value.description.map(|d| d.node),
        ty: convert_type_ref(&value.ty.node),
        default_value: value
            .default_value
            .and_then(|default| default.node.into_json().ok()),
    }
}

fn convert_type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::Named(name.to_string()),
        BaseType::List(inner) => TypeRef::list(convert_type_ref(inner)),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::non_null(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = r#"
        "A person"
        type User implements Node {
            id: ID!
            "Display name"
            name: String!
            friends(first: Int = 10): [User!]
        }

        interface Node { id: ID! }

        union SearchResult = User | Post

        type Post implements Node { id: ID!  title: String }

        enum Role { ADMIN USER }

        input UserInput { name: String!  role: Role }

        type Query {
            user(id: ID!): User
            users: [User!]!
            search(term: String!): [SearchResult!]!
        }

        extend type Query { node(id: ID!): Node }
    "#;

    #[test]
    fn test_parse_types() {
        let index = SchemaIndex::parse(SDL).unwrap();

        let user = index.get("User").unwrap();
        assert_eq!(user.description.as_deref(), Some("A person"));
        assert!(user.has_id());
        assert_eq!(
            user.field("name").unwrap().description.as_deref(),
            Some("Display name")
        );

        let friends = user.field("friends").unwrap();
        assert_eq!(friends.ty.to_string(), "[User!]");
        assert_eq!(friends.args[0].default_value, Some(serde_json::json!(10)));

        assert!(index.get("UserInput").unwrap().is_input_object());
        assert!(index.get("Int").unwrap().is_scalar());
    }

    #[test]
    fn test_conventional_roots() {
        let index = SchemaIndex::parse(SDL).unwrap();
        assert_eq!(index.query_type().unwrap().name, "Query");
        assert!(index.mutation_type().is_none());
        assert!(index.subscription_type().is_none());
    }

    #[test]
    fn test_schema_block_roots() {
        let index = SchemaIndex::parse(
            r#"
            schema { query: RootQuery mutation: RootMutation }
            type RootQuery { ping: String }
            type RootMutation { pong: String }
            "#,
        )
        .unwrap();
        assert_eq!(index.query_type().unwrap().name, "RootQuery");
        assert_eq!(index.mutation_type().unwrap().name, "RootMutation");
    }

    #[test]
    fn test_extension_merges_fields() {
        let index = SchemaIndex::parse(SDL).unwrap();
        let query = index.query_type().unwrap();
        assert!(query.field("user").is_some());
        assert!(query.field("node").is_some());
    }

    #[test]
    fn test_possible_types() {
        let index = SchemaIndex::parse(SDL).unwrap();

        let union_members: Vec<_> = index
            .possible_types("SearchResult")
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(union_members, vec!["User", "Post"]);

        let implementors: Vec<_> = index
            .possible_types("Node")
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(implementors, vec!["User", "Post"]);
    }

    #[test]
    fn test_root_field_errors() {
        let index = SchemaIndex::parse(SDL).unwrap();
        assert!(index.root_field(OperationKind::Query, "user").is_ok());
        assert!(matches!(
            index.root_field(OperationKind::Query, "missing"),
            Err(SchemaError::UnknownField { .. })
        ));
        assert!(matches!(
            index.root_field(OperationKind::Mutation, "anything"),
            Err(SchemaError::MissingRootType(OperationKind::Mutation))
        ));
    }

    #[test]
    fn test_invalid_sdl() {
        let result = SchemaIndex::parse("type Query {");
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }
}
