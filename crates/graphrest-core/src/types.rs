//! Closed representation of the GraphQL type system.
//!
//! Every type reference is a [`TypeRef`]; every named type is a
//! [`TypeDefinition`] whose [`TypeKind`] is matched exhaustively by the
//! mapping and coercion code instead of probing kinds at runtime.

use std::fmt;

use indexmap::IndexMap;

/// Reference to a type as written in a field, argument or variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A named type, e.g. `User`.
    Named(String),
    /// A list wrapper, e.g. `[User]`.
    List(Box<TypeRef>),
    /// A non-null wrapper, e.g. `User!`.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Creates a named type reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Creates a non-null named type reference.
    pub fn named_nn(name: impl Into<String>) -> Self {
        Self::non_null(Self::named(name))
    }

    /// Wraps `inner` in a list.
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Wraps `inner` in a non-null marker.
    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Returns the innermost named type.
    #[must_use]
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// Returns true for a `!` reference.
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Returns the reference with a single outer non-null marker removed.
    #[must_use]
    pub fn nullable(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Returns true when the reference is a list, ignoring an outer `!`.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), Self::List(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// An argument or input object field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<serde_json::Value>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }
}

/// A field of an object or interface type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub args: Vec<InputValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            args: Vec::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn argument(mut self, arg: InputValue) -> Self {
        self.args.push(arg);
        self
    }

    /// Returns true when the field declares an argument called `name`.
    #[must_use]
    pub fn has_argument(&self, name: &str) -> bool {
        self.args.iter().any(|arg| arg.name == name)
    }
}

/// Fields shared by object and interface types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectType {
    pub fields: IndexMap<String, Field>,
    pub interfaces: Vec<String>,
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
}

/// The kind-specific part of a named type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar,
    Object(ObjectType),
    Interface(ObjectType),
    Union(Vec<String>),
    Enum(Vec<EnumValue>),
    InputObject(IndexMap<String, InputValue>),
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
        }
    }

    /// Returns true for the `__Schema`, `__Type`, ... introspection types.
    #[must_use]
    pub fn is_introspection(&self) -> bool {
        self.name.starts_with("__")
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object(_))
    }

    #[must_use]
    pub fn is_input_object(&self) -> bool {
        matches!(self.kind, TypeKind::InputObject(_))
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar)
    }

    /// Returns true for types that need a selection set (objects, interfaces, unions).
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object(_) | TypeKind::Interface(_) | TypeKind::Union(_)
        )
    }

    /// Output fields of an object or interface type.
    #[must_use]
    pub fn fields(&self) -> Option<&IndexMap<String, Field>> {
        match &self.kind {
            TypeKind::Object(object) | TypeKind::Interface(object) => Some(&object.fields),
            _ => None,
        }
    }

    /// Looks up an output field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// Returns true for an object type declaring an `id` field.
    #[must_use]
    pub fn has_id(&self) -> bool {
        self.is_object() && self.field("id").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named_nn("User")));
        assert_eq!(ty.to_string(), "[User!]!");
        assert_eq!(ty.named_type(), "User");
    }

    #[test]
    fn test_type_ref_wrappers() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named("Int")));
        assert!(ty.is_non_null());
        assert!(ty.is_list());
        assert!(!ty.nullable().is_non_null());

        let single = TypeRef::named_nn("User");
        assert!(!single.is_list());
    }

    #[test]
    fn test_has_id() {
        let mut object = ObjectType::default();
        object
            .fields
            .insert("id".into(), Field::new("id", TypeRef::named_nn("ID")));
        let user = TypeDefinition::new("User", TypeKind::Object(object));
        assert!(user.has_id());

        let input = TypeDefinition::new("UserInput", TypeKind::InputObject(IndexMap::new()));
        assert!(!input.has_id());
        assert!(input.is_input_object());
    }
}
