// ABOUTME: Runtime value types for the liss VM

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::rc::Rc;

use crate::builtins::Builtin;
use crate::bytecode::Instructions;
use crate::dict::Dict;
use crate::modules::Module;
use crate::regex::Regex;

/// A compiled function: compile-time immutable, shared by closures.
#[derive(Debug)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub num_locals: usize,
    pub instructions: Instructions,
}

/// A function paired with its captured free values and defining module.
pub struct Closure {
    pub func: Rc<Function>,
    pub free: Vec<Value>,
    pub module: Rc<Module>,
}

/// An open file, or one of the borrowed standard streams.
#[derive(Debug)]
pub enum FileHandle {
    Stdout,
    Stderr,
    Disk {
        file: Option<std::fs::File>,
        path: PathBuf,
    },
}

impl FileHandle {
    pub fn disk(file: std::fs::File, path: PathBuf) -> Self {
        FileHandle::Disk {
            file: Some(file),
            path,
        }
    }

    /// Close the underlying handle. Closing twice, or closing a standard
    /// stream, is a silent no-op.
    pub fn close(&mut self) {
        if let FileHandle::Disk { file, .. } = self {
            file.take();
        }
    }

    pub fn is_std(&self) -> bool {
        matches!(self, FileHandle::Stdout | FileHandle::Stderr)
    }

    pub fn write_str(&mut self, s: &str) -> std::io::Result<()> {
        match self {
            FileHandle::Stdout => std::io::stdout().lock().write_all(s.as_bytes()),
            FileHandle::Stderr => std::io::stderr().lock().write_all(s.as_bytes()),
            FileHandle::Disk { file: Some(f), .. } => f.write_all(s.as_bytes()),
            FileHandle::Disk { file: None, .. } => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "file is closed",
            )),
        }
    }

    pub fn read_all(&mut self) -> std::io::Result<String> {
        match self {
            FileHandle::Disk { file: Some(f), .. } => {
                let mut buf = String::new();
                f.read_to_string(&mut buf)?;
                Ok(buf)
            }
            FileHandle::Disk { file: None, .. } => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "file is closed",
            )),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "cannot read from a standard stream",
            )),
        }
    }

    pub fn path_display(&self) -> String {
        match self {
            FileHandle::Stdout => "<stdout>".to_string(),
            FileHandle::Stderr => "<stderr>".to_string(),
            FileHandle::Disk { path, .. } => path.display().to_string(),
        }
    }
}

/// A runtime value. Aggregates share structure through `Rc`; mutation of
/// lists and dictionaries happens through `RefCell` interiors.
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Function(Rc<Function>),
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    Module(Rc<Module>),
    File(Rc<RefCell<FileHandle>>),
    Regex(Rc<Regex>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(d: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(d)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::Module(_) => "module",
            Value::File(_) => "file",
            Value::Regex(_) => "regex",
        }
    }

    // ===== Capability predicates =====

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    pub fn is_lenable(&self) -> bool {
        matches!(self, Value::Str(_) | Value::List(_) | Value::Dict(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Value::File(_))
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Value::Regex(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Closure(_) | Value::Builtin(_)
        )
    }

    /// Only null and false are falsy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Hash for dictionary keys. Only int, float, string, and bool hash;
    /// everything else returns None.
    pub fn hash_key(&self) -> Option<u64> {
        let mut h = DefaultHasher::new();
        match self {
            Value::Int(n) => {
                0u8.hash(&mut h);
                n.hash(&mut h);
            }
            Value::Float(x) => {
                1u8.hash(&mut h);
                // Normalize -0.0 so it probes the same slots as 0.0.
                let bits = if *x == 0.0 { 0u64 } else { x.to_bits() };
                bits.hash(&mut h);
            }
            Value::Str(s) => {
                2u8.hash(&mut h);
                s.hash(&mut h);
            }
            Value::Bool(b) => {
                3u8.hash(&mut h);
                b.hash(&mut h);
            }
            _ => return None,
        }
        Some(h.finish())
    }

    /// Key equality used by dictionary probing. Same-type comparison only.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Recursive copy of lists and dictionaries; scalars and shared
    /// immutables clone their handle.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => {
                let cloned: Vec<Value> = items.borrow().iter().map(Value::deep_clone).collect();
                Value::list(cloned)
            }
            Value::Dict(d) => {
                let mut copy = Dict::new();
                for (k, v) in d.borrow().entries() {
                    // Keys are hashable scalars; insertion cannot fail.
                    let _ = copy.insert(k.clone(), v.deep_clone());
                }
                Value::dict(copy)
            }
            other => other.clone(),
        }
    }

    /// String form used by `print`, `str`, and `raise!`: strings render
    /// without quotes. Everything else matches `Display`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => format!("{}", other),
        }
    }
}

/// Cleared stack slots read back as null.
impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.borrow().entries().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => match &func.name {
                Some(name) => write!(f, "#<fn {}>", name),
                None => write!(f, "#<fn>"),
            },
            Value::Closure(c) => match &c.func.name {
                Some(name) => write!(f, "#<fn {}>", name),
                None => write!(f, "#<fn>"),
            },
            Value::Builtin(b) => write!(f, "#<builtin {}>", b.name),
            Value::Module(m) => write!(f, "#<module {}>", m.name),
            Value::File(h) => write!(f, "#<file {}>", h.borrow().path_display()),
            Value::Regex(r) => write!(f, "#<regex {}>", r.pattern),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self)
    }
}

/// Structural equality for scalars, strings, and lists; reference equality
/// for everything else. Used by tests and list comparison.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            (Value::Regex(a), Value::Regex(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
