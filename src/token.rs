// ABOUTME: Token kinds and source locations produced by the lexer

use std::fmt;

/// Line/column position within a source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(line: u32, col: u32) -> Self {
        Location { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Error,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Amp,
    Pipe,
    Bang,

    // Literals
    Number,
    Str,

    // Names
    Ident,
    Accessor,

    // Keywords
    Fn,
    True,
    False,
    Null,
    Cond,
    Let,
    And,
    Or,
    Not,
    Import,
    As,
    Breakpoint,
    Raise,
}

impl TokenKind {
    /// True for the operator sigils and word operators the compiler maps to opcodes.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Bang
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Eof => "end of input",
            TokenKind::Error => "error",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Bang => "!",
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::Ident => "identifier",
            TokenKind::Accessor => "accessor",
            TokenKind::Fn => "fn",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Cond => "cond",
            TokenKind::Let => "let",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Import => "import",
            TokenKind::As => "as",
            TokenKind::Breakpoint => "breakpoint",
            TokenKind::Raise => "raise!",
        };
        write!(f, "{}", s)
    }
}

/// A lexed token. String tokens carry the decoded value in `literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub loc: Location,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, loc: Location) -> Self {
        Token {
            kind,
            literal: literal.into(),
            loc,
        }
    }
}

/// Map an identifier lexeme to its keyword kind, if it is one.
pub fn keyword_kind(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "fn" => TokenKind::Fn,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "cond" => TokenKind::Cond,
        "let" => TokenKind::Let,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "import" => TokenKind::Import,
        "as" => TokenKind::As,
        "breakpoint" => TokenKind::Breakpoint,
        "raise!" => TokenKind::Raise,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_kind("fn"), Some(TokenKind::Fn));
        assert_eq!(keyword_kind("raise!"), Some(TokenKind::Raise));
        assert_eq!(keyword_kind("raise"), None);
        assert_eq!(keyword_kind("foo"), None);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(format!("{}", Location::new(3, 14)), "3:14");
    }

    #[test]
    fn test_operator_predicate() {
        assert!(TokenKind::Plus.is_operator());
        assert!(TokenKind::And.is_operator());
        assert!(!TokenKind::Ident.is_operator());
        assert!(!TokenKind::LParen.is_operator());
    }
}
