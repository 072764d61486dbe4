//! Single-field operation documents.
//!
//! An [`OperationDocument`] is the minimal GraphQL operation synthesized for
//! one root field: its variable definitions plus the selection tree. It
//! renders to GraphQL text through [`std::fmt::Display`].

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::types::TypeRef;

/// The three GraphQL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `$name: Type` variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: TypeRef,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A selected field with its variable-bound arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub name: String,
    /// `(argument name, variable name)` pairs.
    pub arguments: Vec<(String, String)>,
    pub selections: Vec<Selection>,
}

impl FieldSelection {
    /// A leaf field without arguments.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }
}

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Field(FieldSelection),
    InlineFragment {
        type_condition: String,
        selections: Vec<Selection>,
    },
}

/// An operation containing exactly one root field selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDocument {
    pub kind: OperationKind,
    pub name: String,
    pub variables: Vec<VariableDefinition>,
    pub root: FieldSelection,
}

/// Read-only view of the parts of an operation the REST layer needs.
#[derive(Debug, Clone, Copy)]
pub struct OperationInfo<'a> {
    pub kind: OperationKind,
    pub operation_name: &'a str,
    /// Name of the single top-level field.
    pub root_field: &'a str,
    /// Variable definitions in declaration order.
    pub variables: &'a [VariableDefinition],
}

impl OperationDocument {
    #[must_use]
    pub fn info(&self) -> OperationInfo<'_> {
        OperationInfo {
            kind: self.kind,
            operation_name: &self.name,
            root_field: &self.root.name,
            variables: &self.variables,
        }
    }

    /// Looks up a variable definition by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }
}

impl fmt::Display for OperationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if !self.variables.is_empty() {
            f.write_char('(')?;
            for (i, variable) in self.variables.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "${}: {}", variable.name, variable.ty)?;
            }
            f.write_char(')')?;
        }
        f.write_str(" {\n")?;
        write_field(f, &self.root, 1)?;
        f.write_str("}\n")
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    Ok(())
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FieldSelection, depth: usize) -> fmt::Result {
    write_indent(f, depth)?;
    f.write_str(&field.name)?;
    if !field.arguments.is_empty() {
        f.write_char('(')?;
        for (i, (argument, variable)) in field.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{argument}: ${variable}")?;
        }
        f.write_char(')')?;
    }
    if field.selections.is_empty() {
        return f.write_char('\n');
    }
    f.write_str(" {\n")?;
    write_selections(f, &field.selections, depth + 1)?;
    write_indent(f, depth)?;
    f.write_str("}\n")
}

fn write_selections(f: &mut fmt::Formatter<'_>, selections: &[Selection], depth: usize) -> fmt::Result {
    for selection in selections {
        match selection {
            Selection::Field(field) => write_field(f, field, depth)?,
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                write_indent(f, depth)?;
                writeln!(f, "... on {type_condition} {{")?;
                write_selections(f, selections, depth + 1)?;
                write_indent(f, depth)?;
                f.write_str("}\n")?;
            }
        }
    }
    Ok(())
}
