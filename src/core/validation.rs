//! Validation of a unit of work's return value against its declared output.

use crate::core::binder::coerce_model;
use crate::core::describe::TypeClass;
use crate::core::error::ResultValidationError;
use crate::core::task::Returned;
use serde::de::DeserializeOwned;

/// Reconciles `returned` with `declared`.
///
/// - `Unit`: no output declared, the result is `None` whatever was returned.
/// - primitive: instances pass through; raw values are decoded without coercion.
/// - structured: instances pass through; raw mappings are built with the
///   field rules (defaults applied, unknown keys dropped).
/// - anything else: permissive pass-through.
pub fn validate<T: DeserializeOwned>(
    declared: &TypeClass,
    returned: Returned<T>,
) -> Result<Option<T>, ResultValidationError> {
    let raw = match (declared, returned) {
        (TypeClass::Unit, _) => return Ok(None),
        (_, Returned::Value(value)) => return Ok(Some(value)),
        (TypeClass::Structured(node), Returned::Fields(raw)) => {
            coerce_model(node, &raw).map_err(|reason| ResultValidationError { reason })?
        }
        (_, Returned::Fields(raw)) => raw,
    };

    serde_json::from_value(raw)
        .map(Some)
        .map_err(|e| ResultValidationError {
            reason: e.to_string(),
        })
}
