//! Type predicates: is_null?, is_list?, is_dict?, is_string?, is_int?,
//! is_float?, is_bool?

use crate::error::RuntimeError;
use crate::value::Value;

pub fn builtin_is_null(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_null()))
}

pub fn builtin_is_list(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_list()))
}

pub fn builtin_is_dict(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_dictionary()))
}

pub fn builtin_is_string(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_string()))
}

pub fn builtin_is_int(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Int(_))))
}

pub fn builtin_is_float(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Float(_))))
}

pub fn builtin_is_bool(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_bool()))
}
