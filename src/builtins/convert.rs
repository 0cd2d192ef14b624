//! Conversions: str, int, parse_int, parse_float

use crate::error::RuntimeError;
use crate::value::Value;

/// String form of any value; strings pass through unquoted so that
/// `(parse_int (str 42))` round-trips.
pub fn builtin_str(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(args[0].to_display_string()))
}

/// Numeric conversion to int; floats truncate toward zero.
pub fn builtin_int(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(x) => Ok(Value::Int(*x as i64)),
        other => Err(RuntimeError::type_mismatch("int", "int or float", other)),
    }
}

/// Parse a decimal integer out of a string.
pub fn builtin_parse_int(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::general("parse_int", format!("invalid integer {:?}", s.as_ref()))
        }),
        other => Err(RuntimeError::type_mismatch("parse_int", "string", other)),
    }
}

/// Parse a float out of a string.
pub fn builtin_parse_float(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::general("parse_float", format!("invalid float {:?}", s.as_ref()))
        }),
        other => Err(RuntimeError::type_mismatch("parse_float", "string", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_round_trips_through_parse() {
        let s = builtin_str(&[Value::Int(-42)]).unwrap();
        assert_eq!(builtin_parse_int(&[s]).unwrap(), Value::Int(-42));

        let s = builtin_str(&[Value::Float(2.5)]).unwrap();
        assert_eq!(builtin_parse_float(&[s]).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_str_of_string_is_raw() {
        assert_eq!(builtin_str(&[Value::string("hi")]).unwrap(), Value::string("hi"));
    }

    #[test]
    fn test_int_truncates_toward_zero() {
        assert_eq!(builtin_int(&[Value::Float(2.9)]).unwrap(), Value::Int(2));
        assert_eq!(builtin_int(&[Value::Float(-2.9)]).unwrap(), Value::Int(-2));
        assert_eq!(builtin_int(&[Value::Int(7)]).unwrap(), Value::Int(7));
        assert!(builtin_int(&[Value::string("3")]).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(builtin_parse_int(&[Value::string("abc")]).is_err());
        assert!(builtin_parse_float(&[Value::string("abc")]).is_err());
        assert!(builtin_parse_int(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_parse_accepts_surrounding_space() {
        assert_eq!(
            builtin_parse_int(&[Value::string(" 42 ")]).unwrap(),
            Value::Int(42)
        );
    }
}
