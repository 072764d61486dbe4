//! Model extraction.
//!
//! A model is an object type with an `id` field that the query type exposes
//! both as a collection (`users: [User]`) and as a single item fetched only by
//! id (`user(id: ID!): User`). Unions are never models: they might represent
//! an object that is not one.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::index::SchemaIndex;
use crate::naming::is_name_equal;
use crate::types::TypeRef;

#[derive(Debug, Default)]
struct ModelFlags {
    list: bool,
    single: bool,
}

/// Scans the query type and returns the names of all model types.
#[must_use]
pub fn extract_models(schema: &SchemaIndex) -> BTreeSet<String> {
    let Some(query) = schema.query_type() else {
        return BTreeSet::new();
    };
    let Some(fields) = query.fields() else {
        return BTreeSet::new();
    };

    let mut flags: HashMap<&str, ModelFlags> = HashMap::new();

    for field in fields.values() {
        let type_name = field.ty.named_type();
        let Some(named) = schema.get(type_name).filter(|ty| ty.has_id()) else {
            continue;
        };
        let entry = flags.entry(named.name.as_str()).or_default();

        if is_list_of(&field.ty, type_name) {
            let same_name = is_name_equal(&field.name, &format!("{}s", named.name));
            let all_optional = !field.args.iter().any(|arg| arg.ty.is_non_null());
            entry.list = same_name && all_optional;
        } else if is_single(&field.ty) {
            let same_name = is_name_equal(&field.name, &named.name);
            let only_id = field.args.len() == 1 && field.args[0].name == "id";
            entry.single = same_name && only_id;
        }
    }

    let models: BTreeSet<String> = flags
        .into_iter()
        .filter(|(_, flags)| flags.list && flags.single)
        .map(|(name, _)| name.to_string())
        .collect();

    debug!(models = ?models, "Models extracted");
    models
}

fn is_list_of(ty: &TypeRef, expected: &str) -> bool {
    ty.is_list() && ty.named_type() == expected
}

/// `User` or `User!`, without list wrappers.
fn is_single(ty: &TypeRef) -> bool {
    matches!(ty.nullable(), TypeRef::Named(_))
}
