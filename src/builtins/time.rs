//! Clock and randomness: time, time_ms, rand, randn

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::error::RuntimeError;
use crate::value::Value;

fn since_epoch() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Seconds since the Unix epoch.
///
/// ```lisp
/// (time) => 1721923200
/// ```
pub fn builtin_time(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(since_epoch().as_secs() as i64))
}

/// Milliseconds since the Unix epoch.
pub fn builtin_time_ms(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(since_epoch().as_millis() as i64))
}

/// A uniform float in [0, 1).
pub fn builtin_rand(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

/// A uniform integer in [0, n).
///
/// ```lisp
/// (randn 6) => 0..5
/// ```
pub fn builtin_randn(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(n) if *n > 0 => Ok(Value::Int(rand::thread_rng().gen_range(0..*n))),
        Value::Int(_) => Err(RuntimeError::general("randn", "bound must be positive")),
        other => Err(RuntimeError::type_mismatch("randn", "int", other)),
    }
}
