//! Sequence operations shared by strings and lists: len, head, last, tail,
//! is_empty?, range, list

use crate::error::RuntimeError;
use crate::value::Value;

fn length(op: &'static str, value: &Value) -> Result<usize, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Dict(d) => Ok(d.borrow().len()),
        other => Err(RuntimeError::type_mismatch(
            op,
            "string, list, or dict",
            other,
        )),
    }
}

/// Number of code points, elements, or entries.
///
/// ```lisp
/// (len "héllo") => 5
/// (len [1 2 3]) => 3
/// ```
pub fn builtin_len(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(length("len", &args[0])? as i64))
}

/// First element of a list, or first code point of a string.
pub fn builtin_head(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => items
            .borrow()
            .first()
            .cloned()
            .ok_or_else(|| RuntimeError::general("head", "empty list")),
        Value::Str(s) => s
            .chars()
            .next()
            .map(|c| Value::string(c.to_string()))
            .ok_or_else(|| RuntimeError::general("head", "empty string")),
        other => Err(RuntimeError::type_mismatch("head", "list or string", other)),
    }
}

/// Last element of a list, or last code point of a string.
pub fn builtin_last(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => items
            .borrow()
            .last()
            .cloned()
            .ok_or_else(|| RuntimeError::general("last", "empty list")),
        Value::Str(s) => s
            .chars()
            .last()
            .map(|c| Value::string(c.to_string()))
            .ok_or_else(|| RuntimeError::general("last", "empty string")),
        other => Err(RuntimeError::type_mismatch("last", "list or string", other)),
    }
}

/// Everything after the head, as a fresh value.
///
/// ```lisp
/// (tail [1 2 3]) => [2 3]
/// (tail "abc") => "bc"
/// ```
pub fn builtin_tail(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => {
            let items = items.borrow();
            if items.is_empty() {
                return Err(RuntimeError::general("tail", "empty list"));
            }
            Ok(Value::list(items[1..].to_vec()))
        }
        Value::Str(s) => {
            if s.is_empty() {
                return Err(RuntimeError::general("tail", "empty string"));
            }
            Ok(Value::string(s.chars().skip(1).collect::<String>()))
        }
        other => Err(RuntimeError::type_mismatch("tail", "list or string", other)),
    }
}

/// True when a string, list, or dict has no contents.
pub fn builtin_is_empty(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(length("is_empty?", &args[0])? == 0))
}

/// Half-open slice [from, to) of a string or list, in code points or
/// elements.
///
/// ```lisp
/// (range "hello" 1 3) => "el"
/// (range [1 2 3 4] 0 2) => [1 2]
/// ```
pub fn builtin_range(args: &[Value]) -> Result<Value, RuntimeError> {
    let from = match &args[1] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_mismatch("range", "int", other)),
    };
    let to = match &args[2] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_mismatch("range", "int", other)),
    };
    let len = length("range", &args[0])? as i64;
    if from < 0 || to < from || to > len {
        return Err(RuntimeError::general(
            "range",
            format!("bounds {}..{} out of range for length {}", from, to, len),
        ));
    }
    let (from, to) = (from as usize, to as usize);
    match &args[0] {
        Value::Str(s) => Ok(Value::string(
            s.chars().skip(from).take(to - from).collect::<String>(),
        )),
        Value::List(items) => Ok(Value::list(items.borrow()[from..to].to_vec())),
        other => Err(RuntimeError::type_mismatch("range", "string or list", other)),
    }
}

/// A new list of the arguments.
pub fn builtin_list(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::list(args.to_vec()))
}
