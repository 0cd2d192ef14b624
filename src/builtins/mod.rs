//! # Built-in Functions
//!
//! The fixed table of native functions exposed to liss programs. Order
//! matters: the compiler resolves builtin symbols to indices into
//! [`BUILTINS`], and the VM dispatches `GetBuiltin` through the same table.
//!
//! ## Categories
//!
//! - **[time]**: time, time_ms, rand, randn
//! - **[seq]**: len, head, last, tail, is_empty?, range, list
//! - **[maps]**: dict, get, put, del, has?, keys, values
//! - **[re]**: re, match?, match, match_ix
//! - **[io]**: print, println, fopen, fclose, fread_all
//! - **[types]**: is_null?, is_list?, is_dict?, is_string?, is_int?, is_float?, is_bool?
//! - **[convert]**: str, int, parse_int, parse_float
//!
//! `print`, `println`, and `fopen` are hookable: the VM installs adapters
//! that inject the implicit STDOUT handle and the current module directory.

use crate::error::RuntimeError;
use crate::value::Value;

pub mod convert;
pub mod io;
pub mod maps;
pub mod re;
pub mod seq;
pub mod time;
pub mod types;

pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// Fixed or open argument count, checked by the VM after hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn check(&self, name: &'static str, actual: usize) -> Result<(), RuntimeError> {
        let ok = match self {
            Arity::Exact(n) => actual == *n,
            Arity::AtLeast(n) => actual >= *n,
        };
        if ok {
            Ok(())
        } else {
            Err(RuntimeError::builtin_arity(name, self.expected_str(), actual))
        }
    }

    fn expected_str(&self) -> &'static str {
        match self {
            Arity::Exact(0) => "0",
            Arity::Exact(1) => "1",
            Arity::Exact(2) => "2",
            Arity::Exact(3) => "3",
            Arity::AtLeast(1) => "at least 1",
            Arity::AtLeast(2) => "at least 2",
            _ => "several",
        }
    }
}

/// One native function: name, arity, handler, and whether a VM hook may
/// rewrite its arguments before invocation.
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
    pub hookable: bool,
}

impl Builtin {
    const fn new(name: &'static str, arity: Arity, func: BuiltinFn) -> Self {
        Builtin {
            name,
            arity,
            func,
            hookable: false,
        }
    }

    const fn hookable(name: &'static str, arity: Arity, func: BuiltinFn) -> Self {
        Builtin {
            name,
            arity,
            func,
            hookable: true,
        }
    }
}

/// The builtin table. Appending is safe; reordering breaks compiled
/// `GetBuiltin` indices.
pub static BUILTINS: &[Builtin] = &[
    Builtin::new("time", Arity::Exact(0), time::builtin_time),
    Builtin::new("time_ms", Arity::Exact(0), time::builtin_time_ms),
    Builtin::new("rand", Arity::Exact(0), time::builtin_rand),
    Builtin::new("randn", Arity::Exact(1), time::builtin_randn),
    Builtin::new("len", Arity::Exact(1), seq::builtin_len),
    Builtin::new("head", Arity::Exact(1), seq::builtin_head),
    Builtin::new("last", Arity::Exact(1), seq::builtin_last),
    Builtin::new("tail", Arity::Exact(1), seq::builtin_tail),
    Builtin::new("str", Arity::Exact(1), convert::builtin_str),
    Builtin::new("int", Arity::Exact(1), convert::builtin_int),
    Builtin::new("list", Arity::AtLeast(0), seq::builtin_list),
    Builtin::new("range", Arity::Exact(3), seq::builtin_range),
    Builtin::new("dict", Arity::AtLeast(0), maps::builtin_dict),
    Builtin::new("get", Arity::Exact(2), maps::builtin_get),
    Builtin::new("put", Arity::Exact(3), maps::builtin_put),
    Builtin::new("del", Arity::Exact(2), maps::builtin_del),
    Builtin::new("has?", Arity::Exact(2), maps::builtin_has),
    Builtin::new("keys", Arity::Exact(1), maps::builtin_keys),
    Builtin::new("values", Arity::Exact(1), maps::builtin_values),
    Builtin::new("re", Arity::Exact(1), re::builtin_re),
    Builtin::new("match?", Arity::Exact(2), re::builtin_match_p),
    Builtin::new("match", Arity::Exact(2), re::builtin_match),
    Builtin::new("match_ix", Arity::Exact(2), re::builtin_match_ix),
    Builtin::hookable("print", Arity::AtLeast(1), io::builtin_print),
    Builtin::hookable("println", Arity::AtLeast(1), io::builtin_println),
    Builtin::hookable("fopen", Arity::Exact(1), io::builtin_fopen),
    Builtin::new("fclose", Arity::Exact(1), io::builtin_fclose),
    Builtin::new("fread_all", Arity::Exact(1), io::builtin_fread_all),
    Builtin::new("is_empty?", Arity::Exact(1), seq::builtin_is_empty),
    Builtin::new("is_null?", Arity::Exact(1), types::builtin_is_null),
    Builtin::new("is_list?", Arity::Exact(1), types::builtin_is_list),
    Builtin::new("is_dict?", Arity::Exact(1), types::builtin_is_dict),
    Builtin::new("is_string?", Arity::Exact(1), types::builtin_is_string),
    Builtin::new("is_int?", Arity::Exact(1), types::builtin_is_int),
    Builtin::new("is_float?", Arity::Exact(1), types::builtin_is_float),
    Builtin::new("is_bool?", Arity::Exact(1), types::builtin_is_bool),
    Builtin::new("parse_int", Arity::Exact(1), convert::builtin_parse_int),
    Builtin::new("parse_float", Arity::Exact(1), convert::builtin_parse_float),
];

#[allow(dead_code)]
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}
