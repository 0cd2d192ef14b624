//! Container access: dict, get, put, del, has?, keys, values
//!
//! `get` and `put` also index lists and strings; the rest are
//! dictionary-only.

use crate::dict::Dict;
use crate::error::RuntimeError;
use crate::value::Value;

fn want_index(op: &'static str, value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::type_mismatch(op, "int index", other)),
    }
}

fn want_dict<'a>(
    op: &'static str,
    value: &'a Value,
) -> Result<&'a std::cell::RefCell<Dict>, RuntimeError> {
    match value {
        Value::Dict(d) => Ok(d),
        other => Err(RuntimeError::type_mismatch(op, "dict", other)),
    }
}

/// Build a dictionary from [key value] pairs.
///
/// ```lisp
/// (dict) => {}
/// (dict ["a" 1] ["b" 2]) => {"a" 1 "b" 2}
/// ```
pub fn builtin_dict(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut d = Dict::new();
    for arg in args {
        let pair = match arg {
            Value::List(items) if items.borrow().len() == 2 => items.borrow().clone(),
            other => {
                return Err(RuntimeError::type_mismatch(
                    "dict",
                    "[key value] pair",
                    other,
                ))
            }
        };
        d.insert(pair[0].clone(), pair[1].clone())?;
    }
    Ok(Value::dict(d))
}

/// Index into a list or string, or look up a dictionary key. A missing
/// dictionary key yields null.
///
/// ```lisp
/// (get [10 20] 1) => 20
/// (get "abc" 0) => "a"
/// (get (dict ["k" 1]) "k") => 1
/// ```
pub fn builtin_get(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => {
            let items = items.borrow();
            let ix = want_index("get", &args[1])?;
            if ix < 0 || ix as usize >= items.len() {
                return Err(RuntimeError::general(
                    "get",
                    format!("index {} out of range for length {}", ix, items.len()),
                ));
            }
            Ok(items[ix as usize].clone())
        }
        Value::Str(s) => {
            let ix = want_index("get", &args[1])?;
            if ix < 0 {
                return Err(RuntimeError::general("get", format!("index {} out of range", ix)));
            }
            s.chars()
                .nth(ix as usize)
                .map(|c| Value::string(c.to_string()))
                .ok_or_else(|| RuntimeError::general("get", format!("index {} out of range", ix)))
        }
        Value::Dict(d) => Ok(d.borrow().get(&args[1])?.unwrap_or(Value::Null)),
        other => Err(RuntimeError::type_mismatch(
            "get",
            "list, string, or dict",
            other,
        )),
    }
}

/// Mutate a list slot in place, or insert a dictionary entry. Returns the
/// container.
///
/// ```lisp
/// (put [1 2 3] 0 9) => [9 2 3]
/// (put d "k" 1) => d
/// ```
pub fn builtin_put(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => {
            let ix = want_index("put", &args[1])?;
            let mut items = items.borrow_mut();
            if ix < 0 || ix as usize >= items.len() {
                return Err(RuntimeError::general(
                    "put",
                    format!("index {} out of range for length {}", ix, items.len()),
                ));
            }
            items[ix as usize] = args[2].clone();
            drop(items);
            Ok(args[0].clone())
        }
        Value::Dict(d) => {
            d.borrow_mut().insert(args[1].clone(), args[2].clone())?;
            Ok(args[0].clone())
        }
        other => Err(RuntimeError::type_mismatch("put", "list or dict", other)),
    }
}

/// Remove a dictionary key. Returns the dictionary.
pub fn builtin_del(args: &[Value]) -> Result<Value, RuntimeError> {
    want_dict("del", &args[0])?.borrow_mut().remove(&args[1])?;
    Ok(args[0].clone())
}

/// True when the dictionary holds the key.
pub fn builtin_has(args: &[Value]) -> Result<Value, RuntimeError> {
    let present = want_dict("has?", &args[0])?.borrow().contains(&args[1])?;
    Ok(Value::Bool(present))
}

pub fn builtin_keys(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::list(want_dict("keys", &args[0])?.borrow().keys()))
}

pub fn builtin_values(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::list(want_dict("values", &args[0])?.borrow().values()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: i64) -> Value {
        Value::list(vec![Value::string(k), Value::Int(v)])
    }

    #[test]
    fn test_dict_from_pairs() {
        let d = builtin_dict(&[pair("a", 1), pair("b", 2)]).unwrap();
        assert_eq!(
            builtin_get(&[d.clone(), Value::string("a")]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            builtin_get(&[d, Value::string("missing")]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_dict_rejects_non_pairs() {
        assert!(builtin_dict(&[Value::Int(1)]).is_err());
        assert!(builtin_dict(&[Value::list(vec![Value::Int(1)])]).is_err());
    }

    #[test]
    fn test_put_then_del_then_has() {
        let d = builtin_dict(&[]).unwrap();
        builtin_put(&[d.clone(), Value::string("k"), Value::Int(1)]).unwrap();
        assert_eq!(
            builtin_has(&[d.clone(), Value::string("k")]).unwrap(),
            Value::Bool(true)
        );
        builtin_del(&[d.clone(), Value::string("k")]).unwrap();
        assert_eq!(
            builtin_has(&[d, Value::string("k")]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_list_get_and_put_in_place() {
        let l = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(builtin_get(&[l.clone(), Value::Int(1)]).unwrap(), Value::Int(2));
        builtin_put(&[l.clone(), Value::Int(0), Value::Int(9)]).unwrap();
        assert_eq!(builtin_get(&[l.clone(), Value::Int(0)]).unwrap(), Value::Int(9));
        assert!(builtin_get(&[l.clone(), Value::Int(5)]).is_err());
        assert!(builtin_put(&[l, Value::Int(2), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_string_get_is_one_code_point() {
        let s = Value::string("héllo");
        assert_eq!(builtin_get(&[s.clone(), Value::Int(1)]).unwrap(), Value::string("é"));
        assert!(builtin_get(&[s, Value::Int(9)]).is_err());
    }

    #[test]
    fn test_unhashable_key_surfaces() {
        let d = builtin_dict(&[]).unwrap();
        assert!(builtin_put(&[d.clone(), Value::list(vec![]), Value::Int(1)]).is_err());
        assert!(builtin_has(&[d, Value::Null]).is_err());
    }

    #[test]
    fn test_keys_values() {
        let d = builtin_dict(&[pair("a", 1), pair("b", 2)]).unwrap();
        match builtin_keys(&[d.clone()]).unwrap() {
            Value::List(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
        match builtin_values(&[d]).unwrap() {
            Value::List(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }
}
