// src/core/coerce.rs

use crate::core::vars::VarError;
use crate::models::VarValue;

/// Heuristic coercion of a raw string: integer first, then boolean, else the
/// string is kept as-is.
pub fn convert_string_value(value: &str) -> VarValue {
    if let Ok(int) = value.parse::<i64>() {
        return VarValue::Number(int.into());
    }
    if let Ok(boolean) = value.parse::<bool>() {
        return VarValue::Bool(boolean);
    }
    VarValue::String(value.to_string())
}

/// Coercion driven by the type of an already-typed default value: an integer
/// default forces an integer parse (errors propagate), a boolean default a
/// boolean parse, anything else keeps the raw string unchanged.
pub fn value_by_type(name: &str, value: &str, default: Option<&VarValue>) -> Result<VarValue, VarError> {
    match default {
        Some(VarValue::Number(n)) if n.is_i64() => {
            let int = value.parse::<i64>().map_err(|_| VarError::TypeMismatch {
                name: name.to_string(),
                value: value.to_string(),
                expected: "an integer",
            })?;
            Ok(VarValue::Number(int.into()))
        }
        Some(VarValue::Bool(_)) => {
            let boolean = value.parse::<bool>().map_err(|_| VarError::TypeMismatch {
                name: name.to_string(),
                value: value.to_string(),
                expected: "a boolean",
            })?;
            Ok(VarValue::Bool(boolean))
        }
        _ => Ok(VarValue::String(value.to_string())),
    }
}

/// Renders a scalar the way it is spliced into surrounding literal text.
pub fn scalar_to_string(value: &VarValue) -> String {
    match value {
        VarValue::String(s) => s.clone(),
        VarValue::Bool(b) => b.to_string(),
        VarValue::Number(n) => n.to_string(),
        VarValue::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_string_value_type_round_trip() {
        assert_eq!(convert_string_value("42"), VarValue::Number(42.into()));
        assert_eq!(convert_string_value("true"), VarValue::Bool(true));
        assert_eq!(convert_string_value("false"), VarValue::Bool(false));
        assert_eq!(
            convert_string_value("v1.2.3"),
            VarValue::String("v1.2.3".to_string())
        );
        // A float is not an integer and not a bool, so it stays a string.
        assert_eq!(
            convert_string_value("1.5"),
            VarValue::String("1.5".to_string())
        );
    }

    #[test]
    fn test_value_by_type_follows_default_type() {
        let int_default = VarValue::Number(8080.into());
        assert_eq!(
            value_by_type("PORT", "9090", Some(&int_default)).unwrap(),
            VarValue::Number(9090.into())
        );

        let bool_default = VarValue::Bool(false);
        assert_eq!(
            value_by_type("DEBUG", "true", Some(&bool_default)).unwrap(),
            VarValue::Bool(true)
        );

        // A string default leaves the raw value untouched, even a numeric one.
        let str_default = VarValue::String("latest".to_string());
        assert_eq!(
            value_by_type("TAG", "42", Some(&str_default)).unwrap(),
            VarValue::String("42".to_string())
        );
    }

    #[test]
    fn test_value_by_type_propagates_parse_errors() {
        let int_default = VarValue::Number(1.into());
        let err = value_by_type("PORT", "not-a-number", Some(&int_default)).unwrap_err();
        assert!(matches!(err, VarError::TypeMismatch { .. }));
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&VarValue::String("x".into())), "x");
        assert_eq!(scalar_to_string(&VarValue::Number(7.into())), "7");
        assert_eq!(scalar_to_string(&VarValue::Bool(true)), "true");
        assert_eq!(scalar_to_string(&VarValue::Null), "");
    }
}
