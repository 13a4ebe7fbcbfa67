//! Binds loosely-typed configuration to a derived schema.
//!
//! Every coercion returns a `Result`; the caller decides whether a failure is
//! fatal or whether the parameter falls back to its default.

use crate::core::describe::{Element, Primitive, TypeClass};
use crate::core::error::BindingError;
use crate::core::schema::{ParamDescriptor, SchemaNode};
use crate::core::{ConfigValue, RawConfig};
use serde_json::{Map, Number};

/// Parameter name to a value in the exact shape its declared type decodes from.
pub type BoundArguments = Map<String, ConfigValue>;

/// Binds every declared parameter of `node` from `raw`, in declaration order.
///
/// The first parameter that cannot be resolved aborts the whole bind.
pub fn bind(node: &SchemaNode, raw: &RawConfig) -> Result<BoundArguments, BindingError> {
    let mut bound = BoundArguments::new();
    for param in node.fields() {
        let value = bind_param(param, raw)?;
        bound.insert(param.name.clone(), value);
    }
    Ok(bound)
}

fn bind_param(param: &ParamDescriptor, raw: &RawConfig) -> Result<ConfigValue, BindingError> {
    if let Some(value) = raw.get(&param.name) {
        match coerce(&param.class, param.optional, value) {
            Ok(bound) => return Ok(bound),
            Err(reason) => match param.class {
                TypeClass::Primitive(_) | TypeClass::Structured(_) => {
                    return Err(BindingError::Invalid {
                        name: param.name.clone(),
                        reason,
                    });
                }
                // Anything else falls through to the default/required check.
                _ => log::debug!("Ignoring unusable value for '{}': {reason}", param.name),
            },
        }
    }

    match &param.class {
        TypeClass::Structured(node) => {
            // A flattened config may spell out the model's fields at top level.
            let flattened = ConfigValue::Object(raw.clone());
            match coerce_model(node, &flattened) {
                Ok(bound) => Ok(bound),
                Err(reason) => match &param.default {
                    Some(default) => {
                        log::warn!(
                            "Using default for '{}'; config does not build {}: {reason}",
                            param.name,
                            node.short_name()
                        );
                        Ok(default.clone())
                    }
                    None => Err(missing(param)),
                },
            }
        }
        _ => param.default.clone().ok_or_else(|| missing(param)),
    }
}

fn missing(param: &ParamDescriptor) -> BindingError {
    BindingError::Missing {
        name: param.name.clone(),
    }
}

/// Coerces `value` to the shape of `class`.
pub(crate) fn coerce(class: &TypeClass, optional: bool, value: &ConfigValue) -> Result<ConfigValue, String> {
    if optional && value.is_null() {
        return Ok(ConfigValue::Null);
    }
    match class {
        TypeClass::Primitive(primitive) => coerce_primitive(primitive, value),
        TypeClass::Structured(node) => coerce_model(node, value),
        TypeClass::Dynamic => Ok(value.clone()),
        TypeClass::Unit | TypeClass::Invalid(_) => {
            Err(format!("no conversion to {} exists", class.type_name()))
        }
    }
}

/// Builds a model from a mapping: fields are coerced, missing fields take
/// their default, unknown keys are dropped.
pub(crate) fn coerce_model(node: &SchemaNode, value: &ConfigValue) -> Result<ConfigValue, String> {
    let parsed;
    let map = match value {
        ConfigValue::Object(map) => map,
        ConfigValue::String(text) => match parse_inline(text) {
            Some(ConfigValue::Object(map)) => {
                parsed = map;
                &parsed
            }
            _ => return Err(format!("expected a mapping for {}, got '{text}'", node.short_name())),
        },
        other => {
            return Err(format!(
                "expected a mapping for {}, got {}",
                node.short_name(),
                kind_of(other)
            ));
        }
    };

    let mut fields = Map::new();
    for field in node.fields() {
        let bound = match map.get(&field.name) {
            Some(raw) => coerce(&field.class, field.optional, raw)
                .map_err(|e| format!("field '{}': {e}", field.name))?,
            None => field
                .default
                .clone()
                .ok_or_else(|| format!("missing field '{}'", field.name))?,
        };
        fields.insert(field.name.clone(), bound);
    }
    Ok(ConfigValue::Object(fields))
}

fn coerce_primitive(primitive: &Primitive, value: &ConfigValue) -> Result<ConfigValue, String> {
    match primitive {
        Primitive::Int { min, max } => to_int(value, *min, *max),
        Primitive::Float { max } => to_float(value, *max),
        Primitive::Str => match value {
            ConfigValue::String(_) => Ok(value.clone()),
            ConfigValue::Null => Err(mismatch("str", value)),
            other => Ok(ConfigValue::String(other.to_string())),
        },
        Primitive::Bool => to_bool(value),
        Primitive::Path => match value {
            ConfigValue::String(text) if !text.is_empty() => Ok(value.clone()),
            _ => Err(mismatch("path", value)),
        },
        Primitive::List(element) | Primitive::Set(element) => {
            let items = sequence(primitive.name(), value)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce_element(element, item).map_err(|e| format!("item {i}: {e}")))
                .collect::<Result<Vec<_>, _>>()
                .map(ConfigValue::Array)
        }
        Primitive::Tuple(elements) => {
            let items = sequence("tuple", value)?;
            if items.len() != elements.len() {
                return Err(format!(
                    "expected a tuple of {} items, got {}",
                    elements.len(),
                    items.len()
                ));
            }
            elements
                .iter()
                .zip(&items)
                .enumerate()
                .map(|(i, (element, item))| {
                    coerce_element(element, item).map_err(|e| format!("item {i}: {e}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ConfigValue::Array)
        }
        Primitive::Dict(element) => {
            let entries = mapping(value)?;
            entries
                .iter()
                .map(|(key, item)| {
                    coerce_element(element, item)
                        .map(|bound| (key.clone(), bound))
                        .map_err(|e| format!("key '{key}': {e}"))
                })
                .collect::<Result<Map<_, _>, _>>()
                .map(ConfigValue::Object)
        }
    }
}

fn coerce_element(element: &Element, value: &ConfigValue) -> Result<ConfigValue, String> {
    coerce(&element.class, element.optional, value)
}

fn to_int(value: &ConfigValue, min: i128, max: i128) -> Result<ConfigValue, String> {
    let whole: i128 = match value {
        ConfigValue::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i128::from(i),
            (_, Some(u), _) => i128::from(u),
            (_, _, Some(f)) if f.is_finite() && f.abs() < 1e38 => f.trunc() as i128,
            _ => return Err(mismatch("int", value)),
        },
        ConfigValue::Bool(b) => i128::from(*b),
        ConfigValue::String(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid int", text.trim()))?,
        _ => return Err(mismatch("int", value)),
    };
    if whole < min || whole > max {
        return Err(format!("{whole} is out of range for int ({min}..={max})"));
    }
    i64::try_from(whole)
        .map(ConfigValue::from)
        .or_else(|_| u64::try_from(whole).map(ConfigValue::from))
        .map_err(|_| format!("{whole} is out of range for int"))
}

fn to_float(value: &ConfigValue, max: f64) -> Result<ConfigValue, String> {
    let float = match value {
        ConfigValue::Number(n) => n.as_f64().ok_or_else(|| mismatch("float", value))?,
        ConfigValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        ConfigValue::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a valid float", text.trim()))?,
        _ => return Err(mismatch("float", value)),
    };
    if !float.is_finite() || float.abs() > max {
        return Err(format!("{float} is out of range for float"));
    }
    Number::from_f64(float)
        .map(ConfigValue::Number)
        .ok_or_else(|| format!("{float} is not a valid float"))
}

fn to_bool(value: &ConfigValue) -> Result<ConfigValue, String> {
    match value {
        ConfigValue::Bool(_) => Ok(value.clone()),
        ConfigValue::Number(n) => Ok(ConfigValue::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        ConfigValue::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(ConfigValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(ConfigValue::Bool(false)),
            _ => Err(format!("'{text}' is not a valid bool")),
        },
        _ => Err(mismatch("bool", value)),
    }
}

fn sequence(expected: &str, value: &ConfigValue) -> Result<Vec<ConfigValue>, String> {
    match value {
        ConfigValue::Array(items) => Ok(items.clone()),
        ConfigValue::String(text) => match parse_inline(text) {
            Some(ConfigValue::Array(items)) => Ok(items),
            _ => Err(format!("'{text}' is not a valid {expected}")),
        },
        _ => Err(mismatch(expected, value)),
    }
}

fn mapping(value: &ConfigValue) -> Result<Map<String, ConfigValue>, String> {
    match value {
        ConfigValue::Object(map) => Ok(map.clone()),
        ConfigValue::String(text) => match parse_inline(text) {
            Some(ConfigValue::Object(map)) => Ok(map),
            _ => Err(format!("'{text}' is not a valid dict")),
        },
        _ => Err(mismatch("dict", value)),
    }
}

// Command-line overrides arrive as strings; `[a, b]` and `{k: v}` are read as YAML.
fn parse_inline(text: &str) -> Option<ConfigValue> {
    serde_yaml::from_str::<ConfigValue>(text).ok()
}

fn mismatch(expected: &str, value: &ConfigValue) -> String {
    format!("expected {expected}, got {}", kind_of(value))
}

fn kind_of(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "bool",
        ConfigValue::Number(_) => "number",
        ConfigValue::String(_) => "string",
        ConfigValue::Array(_) => "sequence",
        ConfigValue::Object(_) => "mapping",
    }
}
