//! GraphQL type to OpenAPI schema mapping.

use graphrest_core::{InputValue, SchemaIndex, TypeDefinition, TypeKind, TypeRef};

use crate::schema::{CustomScalars, Schema};

/// Maps a built-in scalar to its OpenAPI primitive.
#[must_use]
pub fn map_primitive(name: &str) -> Option<Schema> {
    let schema = match name {
        "Int" => Schema::of_type("integer").with_format("int32"),
        "Float" => Schema::of_type("number").with_format("float"),
        "String" | "ID" => Schema::of_type("string"),
        "Boolean" => Schema::of_type("boolean"),
        _ => return None,
    };
    Some(schema)
}

/// Maps a field or argument type to a schema.
///
/// Objects become component references, enums become string enums and
/// scalars map to primitives, then to `custom_scalars`, then to
/// `{type: object}`. Interfaces, unions and input objects map to
/// `{type: object}` as well.
#[must_use]
pub fn map_type(schema: &SchemaIndex, ty: &TypeRef, custom_scalars: &CustomScalars) -> Schema {
    match ty {
        TypeRef::NonNull(inner) => map_type(schema, inner, custom_scalars),
        TypeRef::List(inner) => Schema::array(map_type(schema, inner, custom_scalars)),
        TypeRef::Named(name) => match schema.get(name).map(|definition| &definition.kind) {
            Some(TypeKind::Object(_)) => Schema::reference(name),
            Some(TypeKind::Enum(values)) => Schema {
                enum_values: Some(
                    values
                        .iter()
                        .map(|value| serde_json::Value::String(value.name.clone()))
                        .collect(),
                ),
                ..Schema::of_type("string")
            },
            Some(TypeKind::Scalar) => map_primitive(name)
                .or_else(|| custom_scalars.get(name).cloned())
                .unwrap_or_else(Schema::object),
            Some(TypeKind::Interface(_) | TypeKind::Union(_) | TypeKind::InputObject(_))
            | None => Schema::object(),
        },
    }
}

/// Maps an operation variable type, as used by parameters and request bodies.
///
/// Unlike [`map_type`] this looks only at the type reference: anything that
/// is not a built-in scalar becomes a component reference.
#[must_use]
pub fn map_variable_type(ty: &TypeRef) -> Schema {
    match ty {
        TypeRef::NonNull(inner) => map_variable_type(inner),
        TypeRef::List(inner) => Schema::array(map_variable_type(inner)),
        TypeRef::Named(name) => map_primitive(name).unwrap_or_else(|| Schema::reference(name)),
    }
}

/// Builds the component schema of an object, interface or input object type.
///
/// Returns `None` for types without fields.
#[must_use]
pub fn build_schema_object(
    schema: &SchemaIndex,
    definition: &TypeDefinition,
    custom_scalars: &CustomScalars,
) -> Option<Schema> {
    let members: Vec<(&str, &TypeRef, Option<&String>)> = match &definition.kind {
        TypeKind::Object(object) | TypeKind::Interface(object) => object
            .fields
            .values()
            .map(|field| (field.name.as_str(), &field.ty, field.description.as_ref()))
            .collect(),
        TypeKind::InputObject(fields) => fields
            .values()
            .map(|InputValue { name, ty, description, .. }| {
                (name.as_str(), ty, description.as_ref())
            })
            .collect(),
        TypeKind::Scalar | TypeKind::Union(_) | TypeKind::Enum(_) => return None,
    };

    let mut required = Vec::new();
    let mut properties = indexmap::IndexMap::with_capacity(members.len());
    for (name, ty, description) in members {
        if ty.is_non_null() {
            required.push(name.to_string());
        }
        let mut property = map_type(schema, ty, custom_scalars);
        if let Some(description) = description {
            property.description = Some(description.clone());
        }
        properties.insert(name.to_string(), property);
    }

    Some(Schema {
        required: (!required.is_empty()).then_some(required),
        properties: Some(properties),
        description: definition.description.clone(),
        ..Schema::object()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SDL: &str = r#"
        type Query { user(id: ID!): User }

        "A person"
        type User {
            id: ID!
            "Display name"
            name: String
            age: Int
            score: Float!
            role: Role!
            joined: DateTime
            tags: [String!]!
            friends: [User]
            node: Node
        }

        interface Node { id: ID! }
        enum Role { ADMIN MEMBER }
        scalar DateTime
        input UserInput { name: String!  role: Role }
    "#;

    fn schema() -> SchemaIndex {
        SchemaIndex::parse(SDL).unwrap()
    }

    fn value(schema: &Schema) -> serde_json::Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_map_type_variants() {
        let schema = schema();
        let scalars = CustomScalars::new();
        let user = schema.get("User").unwrap();
        let map = |field: &str| value(&map_type(&schema, &user.field(field).unwrap().ty, &scalars));

        assert_eq!(map("id"), json!({"type": "string"}));
        assert_eq!(map("age"), json!({"type": "integer", "format": "int32"}));
        assert_eq!(map("score"), json!({"type": "number", "format": "float"}));
        assert_eq!(map("role"), json!({"type": "string", "enum": ["ADMIN", "MEMBER"]}));
        assert_eq!(map("joined"), json!({"type": "object"}));
        assert_eq!(map("tags"), json!({"type": "array", "items": {"type": "string"}}));
        assert_eq!(
            map("friends"),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}})
        );
        assert_eq!(map("node"), json!({"type": "object"}));
    }

    #[test]
    fn test_custom_scalar_table() {
        let schema = schema();
        let mut scalars = CustomScalars::new();
        scalars.insert(
            "DateTime".into(),
            Schema::of_type("string").with_format("date-time"),
        );
        let mapped = map_type(&schema, &TypeRef::named("DateTime"), &scalars);
        assert_eq!(value(&mapped), json!({"type": "string", "format": "date-time"}));
    }

    #[test]
    fn test_map_variable_type() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named_nn("UserInput")));
        assert_eq!(
            value(&map_variable_type(&ty)),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/UserInput"}})
        );
        assert_eq!(
            value(&map_variable_type(&TypeRef::named_nn("Int"))),
            json!({"type": "integer", "format": "int32"})
        );
    }

    #[test]
    fn test_build_schema_object() {
        let schema = schema();
        let scalars = CustomScalars::new();
        let user = build_schema_object(&schema, schema.get("User").unwrap(), &scalars).unwrap();
        let user = value(&user);

        assert_eq!(user["type"], "object");
        assert_eq!(user["description"], "A person");
        assert_eq!(user["required"], json!(["id", "score", "role", "tags"]));
        assert_eq!(
            user["properties"]["name"],
            json!({"type": "string", "description": "Display name"})
        );
    }

    #[test]
    fn test_build_input_object() {
        let schema = schema();
        let scalars = CustomScalars::new();
        let input =
            build_schema_object(&schema, schema.get("UserInput").unwrap(), &scalars).unwrap();
        assert_eq!(
            value(&input),
            json!({
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string"},
                    "role": {"type": "string", "enum": ["ADMIN", "MEMBER"]}
                }
            })
        );
        assert!(build_schema_object(&schema, schema.get("Role").unwrap(), &scalars).is_none());
    }
}
