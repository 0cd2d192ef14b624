// ABOUTME: Error types for every stage of the liss pipeline

use crate::value::Value;
use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ZERO: &str = "0";
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_AT_LEAST_TWO: &str = "at least 2";

/// Errors produced while turning bytes into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character {ch:?} at {line}:{col}")]
    UnexpectedChar { ch: char, line: u32, col: u32 },

    #[error("unterminated string starting at {line}:{col}")]
    UnterminatedString { line: u32, col: u32 },
}

/// Errors produced while turning tokens into an AST.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token {found:?} at {line}:{col}")]
    UnexpectedToken { found: String, line: u32, col: u32 },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("{form}: {reason} at {line}:{col}")]
    MalformedForm {
        form: &'static str,
        reason: String,
        line: u32,
        col: u32,
    },

    #[error("identifier {name:?} has more than one ':' at {line}:{col}")]
    BadQualifier { name: String, line: u32, col: u32 },

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Errors produced while turning an AST into bytecode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("undefined symbol {name}")]
    UndefinedSymbol { name: String },

    #[error("symbol {name} is already defined in this scope")]
    Redefinition { name: String },

    #[error("operator {op}: expected {expected} operand{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    OperatorArity {
        op: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("let: {name} must not be module-qualified")]
    QualifiedLet { name: String },

    #[error("module {reference:?} not found")]
    ModuleNotFound { reference: String },

    #[error("module {name:?} does not export {symbol:?}")]
    UnknownExport { name: String, symbol: String },

    #[error("circular import of {path}")]
    CircularImport { path: String },

    #[error("{form} is not supported")]
    UnsupportedForm { form: &'static str },

    #[error("too many locals in one function (limit {limit})")]
    TooManyLocals { limit: usize },

    #[error("cannot read module {path}: {reason}")]
    ModuleRead { path: String, reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors surfaced by the VM during execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    /// Type mismatch with the operation name, expected type, and actual type
    #[error("{op}: expected {expected}, got {actual}")]
    TypeMismatch {
        op: String,
        expected: String,
        actual: String,
    },

    #[error("{op}: division by zero")]
    DivisionByZero { op: &'static str },

    #[error("wrong number of arguments: expected {expected}, got {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("{name}: expected {expected} argument{}, got {actual}", if .expected.ends_with('1') { "" } else { "s" })]
    BuiltinArity {
        name: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("object is not a function: {actual}")]
    NotAFunction { actual: String },

    #[error("{op}: {actual} is not a hashable key")]
    UnhashableKey { op: &'static str, actual: String },

    #[error("{message}")]
    Raised { message: String },

    #[error("{op}: {message}")]
    General { op: String, message: String },

    /// A runtime error annotated with the last source anchor seen by the VM
    #[error("{inner} (at {path}:{line})")]
    Anchored {
        #[source]
        inner: Box<RuntimeError>,
        path: String,
        line: u16,
    },
}

impl RuntimeError {
    /// Create a type mismatch error with the operation name and offending value
    pub fn type_mismatch(op: impl Into<String>, expected: impl Into<String>, actual: &Value) -> Self {
        RuntimeError::TypeMismatch {
            op: op.into(),
            expected: expected.into(),
            actual: actual.type_name().to_string(),
        }
    }

    /// Create a builtin arity error
    pub fn builtin_arity(name: &'static str, expected: &'static str, actual: usize) -> Self {
        RuntimeError::BuiltinArity {
            name,
            expected,
            actual,
        }
    }

    /// Create a general error with operation context
    pub fn general(op: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::General {
            op: op.into(),
            message: message.into(),
        }
    }

    /// Attach a source anchor. Nested anchors keep only the innermost one.
    pub fn at(self, path: &str, line: u16) -> Self {
        match self {
            RuntimeError::Anchored { .. } => self,
            inner => RuntimeError::Anchored {
                inner: Box::new(inner),
                path: path.to_string(),
                line,
            },
        }
    }
}

/// Top-level error for the driver: any stage, one exit path.
#[derive(Error, Debug)]
pub enum LissError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
