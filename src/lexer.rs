// ABOUTME: Lexer turning liss source text into tokens using nom combinators

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{opt, recognize},
    multi::separated_list1,
    IResult, Parser,
};

use crate::error::LexError;
use crate::token::{keyword_kind, Location, Token, TokenKind};

// ============================================================================
// Lexeme recognizers
// ============================================================================

/// Recognize a numeric lexeme: optional sign, digits with optional `.` part,
/// optional e|E exponent. Whether it is an integer is decided by the parser.
fn raw_number(input: &str) -> IResult<&str, &str> {
    recognize((
        opt(one_of("+-")),
        alt((
            recognize((digit1, opt((char('.'), opt(digit1))))),
            recognize((char('.'), digit1)),
        )),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':' || c == '?' || c == '!'
}

/// Recognize an identifier or keyword lexeme. `module:name` stays one lexeme;
/// the parser validates the colon count.
fn raw_ident(input: &str) -> IResult<&str, &str> {
    recognize((satisfy(is_ident_start), take_while(is_ident_char))).parse(input)
}

/// Recognize a dot-prefixed accessor chain such as `.name` or `.a.b`.
fn raw_accessor(input: &str) -> IResult<&str, &str> {
    recognize((
        char('.'),
        separated_list1(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ),
    ))
    .parse(input)
}

/// Recognize an operator lexeme, longest match first.
fn raw_operator(input: &str) -> IResult<&str, (&str, TokenKind)> {
    alt((
        tag("!=").map(|s| (s, TokenKind::NotEq)),
        tag("<=").map(|s| (s, TokenKind::LtEq)),
        tag(">=").map(|s| (s, TokenKind::GtEq)),
        tag("+").map(|s| (s, TokenKind::Plus)),
        tag("-").map(|s| (s, TokenKind::Minus)),
        tag("*").map(|s| (s, TokenKind::Star)),
        tag("/").map(|s| (s, TokenKind::Slash)),
        tag("%").map(|s| (s, TokenKind::Percent)),
        tag("=").map(|s| (s, TokenKind::Eq)),
        tag("<").map(|s| (s, TokenKind::Lt)),
        tag(">").map(|s| (s, TokenKind::Gt)),
        tag("&").map(|s| (s, TokenKind::Amp)),
        tag("|").map(|s| (s, TokenKind::Pipe)),
        tag("!").map(|s| (s, TokenKind::Bang)),
    ))
    .parse(input)
}

// ============================================================================
// Lexer
// ============================================================================

/// Produces tokens on demand, tracking line and column. The first illegal
/// input is recorded and surfaced as an `Error` token.
pub struct Lexer<'a> {
    rest: &'a str,
    line: u32,
    col: u32,
    first_error: Option<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            rest: src,
            line: 1,
            col: 1,
            first_error: None,
        }
    }

    /// The first lex error seen so far, if any.
    pub fn error(&self) -> Option<&LexError> {
        self.first_error.as_ref()
    }

    /// Advance position over a consumed slice.
    fn advance(&mut self, consumed: &str) {
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn consume(&mut self, rest: &'a str) {
        let eaten = &self.rest[..self.rest.len() - rest.len()];
        self.advance(eaten);
        self.rest = rest;
    }

    /// Skip whitespace and `;` comments.
    fn skip_trivia(&mut self) {
        loop {
            let trimmed = self.rest.trim_start_matches(|c: char| c.is_whitespace());
            if trimmed.len() != self.rest.len() {
                self.consume(trimmed);
            }
            if self.rest.starts_with(';') {
                let after = match self.rest.find('\n') {
                    Some(pos) => &self.rest[pos..],
                    None => &self.rest[self.rest.len()..],
                };
                self.consume(after);
            } else {
                break;
            }
        }
    }

    /// Lex a quoted string. Escapes are decoded only inside double quotes.
    fn lex_string(&mut self, quote: char, loc: Location) -> Token {
        // Skip the opening quote.
        let mut chars = self.rest.char_indices();
        chars.next();

        let mut value = String::new();
        let mut escaped = false;
        for (ix, c) in chars {
            if escaped {
                match c {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{0008}'),
                    'f' => value.push('\u{000C}'),
                    'v' => value.push('\u{000B}'),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                escaped = false;
                continue;
            }
            if c == '\\' && quote == '"' {
                escaped = true;
            } else if c == quote {
                self.consume(&self.rest[ix + c.len_utf8()..]);
                return Token::new(TokenKind::Str, value, loc);
            } else {
                value.push(c);
            }
        }

        // Ran off the end of input.
        if self.first_error.is_none() {
            self.first_error = Some(LexError::UnterminatedString {
                line: loc.line,
                col: loc.col,
            });
        }
        let leftover = self.rest;
        self.consume(&self.rest[self.rest.len()..]);
        Token::new(TokenKind::Error, leftover, loc)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let loc = Location::new(self.line, self.col);

        let Some(first) = self.rest.chars().next() else {
            return Token::new(TokenKind::Eof, "", loc);
        };

        match first {
            '(' => {
                self.consume(&self.rest[1..]);
                return Token::new(TokenKind::LParen, "(", loc);
            }
            ')' => {
                self.consume(&self.rest[1..]);
                return Token::new(TokenKind::RParen, ")", loc);
            }
            '[' => {
                self.consume(&self.rest[1..]);
                return Token::new(TokenKind::LBracket, "[", loc);
            }
            ']' => {
                self.consume(&self.rest[1..]);
                return Token::new(TokenKind::RBracket, "]", loc);
            }
            '"' | '\'' => return self.lex_string(first, loc),
            _ => {}
        }

        // Numbers go before operators so a signed literal like -3 stays one
        // token; a bare sign falls through to the operator table.
        if let Ok((rest, lexeme)) = raw_number(self.rest) {
            let tok = Token::new(TokenKind::Number, lexeme, loc);
            self.consume(rest);
            return tok;
        }

        if let Ok((rest, lexeme)) = raw_accessor(self.rest) {
            let tok = Token::new(TokenKind::Accessor, lexeme, loc);
            self.consume(rest);
            return tok;
        }

        if let Ok((rest, (lexeme, kind))) = raw_operator(self.rest) {
            let tok = Token::new(kind, lexeme, loc);
            self.consume(rest);
            return tok;
        }

        if let Ok((rest, lexeme)) = raw_ident(self.rest) {
            let kind = keyword_kind(lexeme).unwrap_or(TokenKind::Ident);
            let tok = Token::new(kind, lexeme, loc);
            self.consume(rest);
            return tok;
        }

        // Nothing matched: emit an Error token for this character.
        if self.first_error.is_none() {
            self.first_error = Some(LexError::UnexpectedChar {
                ch: first,
                line: loc.line,
                col: loc.col,
            });
        }
        let len = first.len_utf8();
        let lexeme = &self.rest[..len];
        let tok = Token::new(TokenKind::Error, lexeme, loc);
        self.consume(&self.rest[len..]);
        tok
    }
}

/// Lex an entire source text. Fails with the first lex error encountered.
#[allow(dead_code)]
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    match lexer.first_error {
        Some(err) => Err(err),
        None => Ok(tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_delimiters_and_operators() {
        assert_eq!(
            kinds("( ) [ ] + - * / % = != < <= > >= & | !"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let toks = tokenize("42 -42 3.14 -.5 1e9 2.5E-3 7.").unwrap();
        let lexemes: Vec<&str> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .map(|t| t.literal.as_str())
            .collect();
        assert_eq!(lexemes, vec!["42", "-42", "3.14", "-.5", "1e9", "2.5E-3", "7."]);
    }

    #[test]
    fn test_signed_number_vs_operator() {
        assert_eq!(
            kinds("(- 5 -3)"),
            vec![
                TokenKind::LParen,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_idents() {
        let toks = tokenize("fn foo let cond import as raise! breakpoint has? _priv").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Fn);
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[2].kind, TokenKind::Let);
        assert_eq!(toks[3].kind, TokenKind::Cond);
        assert_eq!(toks[4].kind, TokenKind::Import);
        assert_eq!(toks[5].kind, TokenKind::As);
        assert_eq!(toks[6].kind, TokenKind::Raise);
        assert_eq!(toks[7].kind, TokenKind::Breakpoint);
        assert_eq!(toks[8].kind, TokenKind::Ident);
        assert_eq!(toks[8].literal, "has?");
        assert_eq!(toks[9].kind, TokenKind::Ident);
        assert_eq!(toks[9].literal, "_priv");
    }

    #[test]
    fn test_qualified_ident_is_one_token() {
        let toks = tokenize("strings:reverse").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Ident);
        assert_eq!(toks[0].literal, "strings:reverse");
    }

    #[test]
    fn test_accessor_chain() {
        let toks = tokenize("(.name.first person)").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Accessor);
        assert_eq!(toks[1].literal, ".name.first");
    }

    #[test]
    fn test_double_quoted_escapes() {
        let toks = tokenize(r#""a\tb\n\"c\"""#).unwrap();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].literal, "a\tb\n\"c\"");
    }

    #[test]
    fn test_single_quoted_is_raw() {
        let toks = tokenize(r"'a\tb'").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].literal, r"a\tb");
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("; a comment\n42 ; trailing\n"),
            vec![TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_locations() {
        let toks = tokenize("(let x\n  7)").unwrap();
        assert_eq!(toks[0].loc, Location::new(1, 1));
        assert_eq!(toks[1].loc, Location::new(1, 2));
        assert_eq!(toks[2].loc, Location::new(1, 6));
        assert_eq!(toks[3].loc, Location::new(2, 3));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("\"never closed"),
            Err(LexError::UnterminatedString { line: 1, col: 1 })
        ));
    }

    #[test]
    fn test_illegal_char_records_first_error() {
        let mut lexer = Lexer::new("#");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Error);
        assert!(matches!(
            lexer.error(),
            Some(LexError::UnexpectedChar { ch: '#', .. })
        ));
    }
}
