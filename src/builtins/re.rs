//! Regex builtins: re, match?, match, match_ix

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::regex::Regex;
use crate::value::Value;

/// Accept either a pattern string (compiled on the fly) or a compiled regex.
fn pattern_of(op: &'static str, value: &Value) -> Result<Rc<Regex>, RuntimeError> {
    match value {
        Value::Regex(r) => Ok(r.clone()),
        Value::Str(s) => Regex::compile(s)
            .map(Rc::new)
            .map_err(|e| RuntimeError::general(op, e)),
        other => Err(RuntimeError::type_mismatch(op, "string or regex", other)),
    }
}

fn subject_of<'a>(op: &'static str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::type_mismatch(op, "string", other)),
    }
}

/// Compile a pattern into an immutable regex value.
///
/// ```lisp
/// (let digits (re "\\d+"))
/// (match? digits "42") => true
/// ```
pub fn builtin_re(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Str(s) => Regex::compile(s)
            .map(|r| Value::Regex(Rc::new(r)))
            .map_err(|e| RuntimeError::general("re", e)),
        other => Err(RuntimeError::type_mismatch("re", "string", other)),
    }
}

/// True when the pattern matches the whole subject.
pub fn builtin_match_p(args: &[Value]) -> Result<Value, RuntimeError> {
    let regex = pattern_of("match?", &args[0])?;
    let subject = subject_of("match?", &args[1])?;
    Ok(Value::Bool(regex.is_full_match(subject)))
}

/// Leftmost-first search returning captured text: full match at index 0,
/// groups after it, null for groups that did not participate. Null when
/// there is no match.
///
/// ```lisp
/// (match "(\\d+) (\\d+)" "42 17") => ["42 17" "42" "17"]
/// ```
pub fn builtin_match(args: &[Value]) -> Result<Value, RuntimeError> {
    let regex = pattern_of("match", &args[0])?;
    let subject = subject_of("match", &args[1])?;
    let Some(spans) = regex.captures(subject) else {
        return Ok(Value::Null);
    };
    let chars: Vec<char> = subject.chars().collect();
    let texts = spans
        .into_iter()
        .map(|span| match span {
            Some((from, to)) => Value::string(chars[from..to].iter().collect::<String>()),
            None => Value::Null,
        })
        .collect();
    Ok(Value::list(texts))
}

/// Like `match`, but yields [start end) code-point index pairs.
pub fn builtin_match_ix(args: &[Value]) -> Result<Value, RuntimeError> {
    let regex = pattern_of("match_ix", &args[0])?;
    let subject = subject_of("match_ix", &args[1])?;
    let Some(spans) = regex.captures(subject) else {
        return Ok(Value::Null);
    };
    let pairs = spans
        .into_iter()
        .map(|span| match span {
            Some((from, to)) => {
                Value::list(vec![Value::Int(from as i64), Value::Int(to as i64)])
            }
            None => Value::Null,
        })
        .collect();
    Ok(Value::list(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_returns_regex_value() {
        let r = builtin_re(&[Value::string(r"\d+")]).unwrap();
        assert!(r.is_regex());
        assert_eq!(
            builtin_match_p(&[r, Value::string("123")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_re_invalid_pattern() {
        assert!(builtin_re(&[Value::string("(")]).is_err());
    }

    #[test]
    fn test_match_p_is_anchored() {
        let pat = Value::string(r"\d+");
        assert_eq!(
            builtin_match_p(&[pat.clone(), Value::string("42")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            builtin_match_p(&[pat, Value::string("a42")]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_match_returns_groups() {
        let got = builtin_match(&[
            Value::string(r"(\d+) (\d+)"),
            Value::string("42 17"),
        ])
        .unwrap();
        assert_eq!(
            got,
            Value::list(vec![
                Value::string("42 17"),
                Value::string("42"),
                Value::string("17"),
            ])
        );
    }

    #[test]
    fn test_match_no_match_is_null() {
        assert_eq!(
            builtin_match(&[Value::string("z"), Value::string("abc")]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_match_ix_pairs() {
        let got = builtin_match_ix(&[
            Value::string(r"(\d+) (\d+)"),
            Value::string("42 17"),
        ])
        .unwrap();
        assert_eq!(
            got,
            Value::list(vec![
                Value::list(vec![Value::Int(0), Value::Int(5)]),
                Value::list(vec![Value::Int(0), Value::Int(2)]),
                Value::list(vec![Value::Int(3), Value::Int(5)]),
            ])
        );
    }

    #[test]
    fn test_type_errors() {
        assert!(builtin_match_p(&[Value::Int(1), Value::string("x")]).is_err());
        assert!(builtin_match(&[Value::string("a"), Value::Int(1)]).is_err());
    }
}
