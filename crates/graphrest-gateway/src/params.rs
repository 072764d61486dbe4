//! Variable resolution from HTTP inputs.
//!
//! Each declared variable is looked up in the path parameters, then the query
//! string, then the JSON body, and the raw value is coerced to the variable's
//! GraphQL type. Query strings carry only strings, so coercion is lenient in
//! the direction HTTP needs (`"5"` is a valid `Int`).

use std::collections::HashMap;

use graphrest_core::{SchemaIndex, TypeKind, TypeRef, VariableDefinition};
use serde_json::{Map, Number, Value};

use crate::error::GatewayError;

/// The raw inputs of one HTTP request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestInputs<'a> {
    pub path: Option<&'a HashMap<String, String>>,
    /// Decoded query-string pairs in order of appearance.
    pub query: &'a [(String, String)],
    pub body: Option<&'a Map<String, Value>>,
}

impl<'a> RequestInputs<'a> {
    /// Inputs consisting of a JSON object only, as for webhook events.
    #[must_use]
    pub fn from_body(body: &'a Map<String, Value>) -> Self {
        Self {
            path: None,
            query: &[],
            body: Some(body),
        }
    }
}

/// Decodes `a=1&b=2&a=3` into ordered pairs.
#[must_use]
pub fn parse_query_string(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|raw| {
        url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

/// Returns the raw value of `name`: path parameter, else query parameter (a
/// string, or an array when repeated), else body property.
#[must_use]
pub fn pick_param(name: &str, inputs: &RequestInputs<'_>) -> Option<Value> {
    if let Some(value) = inputs.path.and_then(|path| path.get(name)) {
        return Some(Value::String(value.clone()));
    }

    let mut values: Vec<Value> = inputs
        .query
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| Value::String(value.clone()))
        .collect();
    match values.len() {
        0 => {}
        1 => return values.pop(),
        _ => return Some(Value::Array(values)),
    }

    inputs.body.and_then(|body| body.get(name)).cloned()
}

/// Coerces a raw value to `ty`. `Null` means "absent" and yields `None`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidVariable`] when a scalar rejects the value
/// or an input object string is not valid JSON.
pub fn coerce_variable(
    schema: &SchemaIndex,
    name: &str,
    ty: &TypeRef,
    value: Value,
) -> Result<Option<Value>, GatewayError> {
    if value.is_null() {
        return Ok(None);
    }
    coerce_value(schema, name, ty, value).map(Some)
}

fn coerce_value(
    schema: &SchemaIndex,
    name: &str,
    ty: &TypeRef,
    value: Value,
) -> Result<Value, GatewayError> {
    match ty {
        TypeRef::NonNull(inner) => coerce_value(schema, name, inner, value),
        TypeRef::List(inner) => {
            let items = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            items
                .into_iter()
                .map(|item| {
                    if item.is_null() {
                        Ok(Value::Null)
                    } else {
                        coerce_value(schema, name, inner, item)
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        TypeRef::Named(type_name) => match schema.get(type_name).map(|ty| &ty.kind) {
            Some(TypeKind::Scalar) => serialize_scalar(name, type_name, value),
            Some(TypeKind::InputObject(_)) => match value {
                Value::String(text) => serde_json::from_str(&text).map_err(|e| {
                    GatewayError::invalid_variable(name, format!("expected a JSON object: {e}"))
                }),
                other => Ok(other),
            },
            _ => Ok(value),
        },
    }
}

/// Serializes a value with the rules of the built-in scalars. Custom scalars
/// pass through.
fn serialize_scalar(name: &str, type_name: &str, value: Value) -> Result<Value, GatewayError> {
    let reject = |value: &Value| {
        GatewayError::invalid_variable(name, format!("{type_name} cannot represent {value}"))
    };

    match type_name {
        // Only `true` and "true" are true.
        "Boolean" => Ok(Value::Bool(matches!(&value, Value::Bool(true))
            || matches!(&value, Value::String(s) if s == "true"))),
        "Int" => {
            let number = as_number(&value).ok_or_else(|| reject(&value))?;
            let in_range = number.fract() == 0.0
                && number >= f64::from(i32::MIN)
                && number <= f64::from(i32::MAX);
            if !in_range {
                return Err(reject(&value));
            }
            Ok(Value::Number(Number::from(number as i64)))
        }
        "Float" => {
            if let Value::Number(number) = &value {
                return Ok(Value::Number(number.clone()));
            }
            as_number(&value)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| reject(&value))
        }
        "String" => match value {
            Value::String(_) => Ok(value),
            Value::Number(number) => Ok(Value::String(number.to_string())),
            Value::Bool(flag) => Ok(Value::String(flag.to_string())),
            other => Err(reject(&other)),
        },
        "ID" => match value {
            Value::String(_) => Ok(value),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string()))
            }
            other => Err(reject(&other)),
        },
        _ => Ok(value),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if !text.trim().is_empty() => {
            text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Builds the variables object for an operation.
///
/// Variables without a value, or whose value is `null`, are left out.
///
/// # Errors
///
/// Fails on the first value that cannot be coerced.
pub fn resolve_variables(
    schema: &SchemaIndex,
    variables: &[VariableDefinition],
    inputs: &RequestInputs<'_>,
) -> Result<Map<String, Value>, GatewayError> {
    let mut resolved = Map::new();
    for variable in variables {
        let Some(raw) = pick_param(&variable.name, inputs) else {
            continue;
        };
        if let Some(value) = coerce_variable(schema, &variable.name, &variable.ty, raw)? {
            resolved.insert(variable.name.clone(), value);
        }
    }
    Ok(resolved)
}
