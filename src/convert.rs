//! Value conversion
//!
//! The conversion bridge turns a raw value into the target type, or
//! fails with one of two distinguished errors: `NoConverter` (no rule
//! for the type pair, which lets the dispatcher retry through the
//! object binders) or `Conversion` (a rule exists but the value is
//! rejected).

use serde_json::Value;

use crate::error::BindError;
use crate::target::{Bindable, TypeDesc};

/// Pluggable value-conversion bridge
pub trait ConversionService: Send + Sync {
    fn convert(&self, value: &Value, target: &Bindable) -> Result<Value, BindError>;
}

/// JSON kind label used in conversion errors
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Default conversion rules
///
/// Identity passes for already-shaped values, string parsing for
/// scalars ("true"/"yes"/"on"/"1" style booleans), integer-to-float
/// widening, and scalar-to-string rendering. Null always passes
/// through unchanged so absent optional values survive the outcome
/// pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConversionService;

impl ConversionService for DefaultConversionService {
    fn convert(&self, value: &Value, target: &Bindable) -> Result<Value, BindError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match target.type_desc() {
            TypeDesc::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => parse_bool(s)
                    .map(Value::Bool)
                    .ok_or_else(|| rejected(value, target, "not a boolean")),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::Number(_) => Err(rejected(value, target, "not an integer")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|e| rejected(value, target, &e.to_string())),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::Float => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|e| rejected(value, target, &e.to_string())),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::Map { .. } => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::List { .. } | TypeDesc::Array { .. } => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(no_converter(value, target)),
            },
            TypeDesc::Object { .. } => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(no_converter(value, target)),
            },
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn no_converter(value: &Value, target: &Bindable) -> BindError {
    BindError::NoConverter {
        from: kind_of(value).to_string(),
        to: target.type_desc().to_string(),
    }
}

fn rejected(value: &Value, target: &Bindable, reason: &str) -> BindError {
    BindError::Conversion {
        value: render(value),
        to: target.type_desc().to_string(),
        reason: reason.to_string(),
    }
}

/// Render a value for error messages (strings unquoted)
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert(value: Value, type_desc: TypeDesc) -> Result<Value, BindError> {
        DefaultConversionService.convert(&value, &Bindable::of(type_desc))
    }

    #[test]
    fn string_parsing_for_scalars() {
        assert_eq!(convert(json!("8080"), TypeDesc::Integer).unwrap(), json!(8080));
        assert_eq!(convert(json!(" 42 "), TypeDesc::Integer).unwrap(), json!(42));
        assert_eq!(convert(json!("1.5"), TypeDesc::Float).unwrap(), json!(1.5));
        assert_eq!(convert(json!("on"), TypeDesc::Bool).unwrap(), json!(true));
        assert_eq!(convert(json!("No"), TypeDesc::Bool).unwrap(), json!(false));
    }

    #[test]
    fn identity_passes() {
        assert_eq!(convert(json!(7), TypeDesc::Integer).unwrap(), json!(7));
        assert_eq!(convert(json!(true), TypeDesc::Bool).unwrap(), json!(true));
        assert_eq!(convert(json!("x"), TypeDesc::String).unwrap(), json!("x"));
        assert_eq!(
            convert(json!([1, 2]), TypeDesc::list_of(TypeDesc::Integer)).unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn scalars_render_to_string() {
        assert_eq!(convert(json!(8080), TypeDesc::String).unwrap(), json!("8080"));
        assert_eq!(convert(json!(true), TypeDesc::String).unwrap(), json!("true"));
    }

    #[test]
    fn rejected_value_is_a_conversion_error() {
        let err = convert(json!("abc"), TypeDesc::Integer).unwrap_err();
        assert!(matches!(err, BindError::Conversion { .. }));
        let err = convert(json!(1.5), TypeDesc::Integer).unwrap_err();
        assert!(matches!(err, BindError::Conversion { .. }));
    }

    #[test]
    fn unsupported_pair_is_no_converter() {
        let err = convert(json!("text"), TypeDesc::object("server")).unwrap_err();
        assert!(err.is_no_converter());
        let err = convert(json!("text"), TypeDesc::list_of(TypeDesc::String)).unwrap_err();
        assert!(err.is_no_converter());
    }

    #[test]
    fn null_passes_through() {
        assert_eq!(convert(Value::Null, TypeDesc::Integer).unwrap(), Value::Null);
        assert_eq!(
            convert(Value::Null, TypeDesc::object("server")).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn integer_widens_to_float() {
        assert_eq!(convert(json!(3), TypeDesc::Float).unwrap(), json!(3));
    }
}
