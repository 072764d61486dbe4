//! Field-name to path-segment conversion.

use heck::ToKebabCase;

/// Converts a GraphQL name to its dash-case path segment.
///
/// `userAccounts` and `UserAccounts` both become `user-accounts`.
#[must_use]
pub fn to_param_case(name: &str) -> String {
    name.to_kebab_case()
}

/// Compares two names after normalizing both to dash-case.
#[must_use]
pub fn is_name_equal(a: &str, b: &str) -> bool {
    to_param_case(a) == to_param_case(b)
}
