// ABOUTME: AST node variants produced by the parser

use crate::token::Location;
use std::fmt;

/// Operators with dedicated opcodes. `&`/`|`/`!` and the word forms
/// `and`/`or`/`not` parse to the same variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oper {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eql,
    NotEql,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
}

impl fmt::Display for Oper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Oper::Add => "+",
            Oper::Sub => "-",
            Oper::Mul => "*",
            Oper::Div => "/",
            Oper::Mod => "%",
            Oper::Eql => "=",
            Oper::NotEql => "!=",
            Oper::Lt => "<",
            Oper::LtEq => "<=",
            Oper::Gt => ">",
            Oper::GtEq => ">=",
            Oper::And => "&",
            Oper::Or => "|",
            Oper::Not => "!",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int {
        value: i64,
        loc: Location,
    },
    Float {
        value: f64,
        loc: Location,
    },
    Str {
        value: String,
        loc: Location,
    },
    Bool {
        value: bool,
        loc: Location,
    },
    Null {
        loc: Location,
    },
    /// `name` or `module:name`
    Ident {
        module: Option<String>,
        name: String,
        loc: Location,
    },
    /// Dot-prefixed accessor chain applied to its single operand.
    Accessor {
        path: Vec<String>,
        target: Box<Expr>,
        loc: Location,
    },
    /// `[a b c]`
    ListLit {
        items: Vec<Expr>,
        loc: Location,
    },
    /// A parenthesized sequence of forms valued at its last form.
    Block {
        forms: Vec<Expr>,
        loc: Location,
    },
    Oper {
        op: Oper,
        operands: Vec<Expr>,
        loc: Location,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: Location,
    },
    /// `(fn name [params] body…)`; `name` is optional.
    Fn {
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Expr>,
        loc: Location,
    },
    Let {
        module: Option<String>,
        name: String,
        value: Box<Expr>,
        loc: Location,
    },
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        alt: Option<Box<Expr>>,
        loc: Location,
    },
    Import {
        path: String,
        alias: Option<String>,
        symbols: Vec<String>,
        loc: Location,
    },
    Raise {
        value: Box<Expr>,
        loc: Location,
    },
    Breakpoint {
        loc: Location,
    },
    /// Parsed but rejected by the compiler.
    Try {
        forms: Vec<Expr>,
        loc: Location,
    },
    /// Parsed but rejected by the compiler.
    Switch {
        forms: Vec<Expr>,
        loc: Location,
    },
}

impl Expr {
    pub fn loc(&self) -> Location {
        match self {
            Expr::Int { loc, .. }
            | Expr::Float { loc, .. }
            | Expr::Str { loc, .. }
            | Expr::Bool { loc, .. }
            | Expr::Null { loc }
            | Expr::Ident { loc, .. }
            | Expr::Accessor { loc, .. }
            | Expr::ListLit { loc, .. }
            | Expr::Block { loc, .. }
            | Expr::Oper { loc, .. }
            | Expr::Call { loc, .. }
            | Expr::Fn { loc, .. }
            | Expr::Let { loc, .. }
            | Expr::Cond { loc, .. }
            | Expr::Import { loc, .. }
            | Expr::Raise { loc, .. }
            | Expr::Breakpoint { loc }
            | Expr::Try { loc, .. }
            | Expr::Switch { loc, .. } => *loc,
        }
    }
}

/// A parsed source text: a sequence of top-level forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub forms: Vec<Expr>,
}
