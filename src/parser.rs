// ABOUTME: Recursive-descent S-expression parser producing the liss AST

use crate::ast::{Expr, Oper, Program};
use crate::error::{LexError, ParseError};
use crate::lexer::Lexer;
use crate::token::{Location, Token, TokenKind};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
}

/// Parse a whole source text into a program.
pub fn parse(src: &str) -> Result<Program, ParseError> {
    Parser::new(src).parse_program()
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut lexer = Lexer::new(src);
        let cur = lexer.next_token();
        Parser { lexer, cur }
    }

    fn bump(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.cur, next)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.cur.kind == kind {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        if self.cur.kind == TokenKind::Error {
            if let Some(err) = self.lexer.error() {
                return ParseError::Lex(err.clone());
            }
        }
        ParseError::UnexpectedToken {
            found: self.cur.literal.clone(),
            line: self.cur.loc.line,
            col: self.cur.loc.col,
        }
    }

    fn malformed(&self, form: &'static str, reason: impl Into<String>) -> ParseError {
        ParseError::MalformedForm {
            form,
            reason: reason.into(),
            line: self.cur.loc.line,
            col: self.cur.loc.col,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut forms = Vec::new();
        while self.cur.kind != TokenKind::Eof {
            forms.push(self.parse_form()?);
        }
        Ok(Program { forms })
    }

    /// Parse a single form: an atom, a list literal, or a compound form.
    pub fn parse_form(&mut self) -> Result<Expr, ParseError> {
        match self.cur.kind {
            TokenKind::Number => self.parse_number(),
            TokenKind::Str => {
                let tok = self.bump();
                Ok(Expr::Str {
                    value: tok.literal,
                    loc: tok.loc,
                })
            }
            TokenKind::True => Ok(Expr::Bool {
                value: true,
                loc: self.bump().loc,
            }),
            TokenKind::False => Ok(Expr::Bool {
                value: false,
                loc: self.bump().loc,
            }),
            TokenKind::Null => Ok(Expr::Null {
                loc: self.bump().loc,
            }),
            TokenKind::Ident => {
                let tok = self.bump();
                ident_expr(&tok)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LParen => self.parse_compound(),
            TokenKind::Eof => Err(ParseError::UnexpectedEof),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let tok = self.bump();
        let lexeme = tok.literal.as_str();
        if is_integer_literal(lexeme) {
            if let Ok(value) = lexeme.parse::<i64>() {
                return Ok(Expr::Int {
                    value,
                    loc: tok.loc,
                });
            }
        }
        match lexeme.parse::<f64>() {
            Ok(value) => Ok(Expr::Float {
                value,
                loc: tok.loc,
            }),
            Err(_) => Err(ParseError::UnexpectedToken {
                found: tok.literal.clone(),
                line: tok.loc.line,
                col: tok.loc.col,
            }),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        while self.cur.kind != TokenKind::RBracket {
            if self.cur.kind == TokenKind::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            items.push(self.parse_form()?);
        }
        self.bump();
        Ok(Expr::ListLit {
            items,
            loc: open.loc,
        })
    }

    /// Parse a parenthesized form, dispatching on the leading token.
    fn parse_compound(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::LParen)?;
        let loc = open.loc;

        match self.cur.kind {
            // () is the null literal
            TokenKind::RParen => {
                self.bump();
                Ok(Expr::Null { loc })
            }
            TokenKind::Fn => self.parse_fn(loc),
            TokenKind::Let => self.parse_let(loc),
            TokenKind::Cond => self.parse_cond(loc),
            TokenKind::Import => self.parse_import(loc),
            TokenKind::Breakpoint => {
                self.bump();
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Breakpoint { loc })
            }
            TokenKind::Raise => {
                self.bump();
                let value = Box::new(self.parse_form()?);
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Raise { value, loc })
            }
            kind if kind.is_operator() => self.parse_operator(loc),
            TokenKind::Ident => {
                if self.cur.literal == "try" {
                    self.bump();
                    let forms = self.parse_until_rparen()?;
                    return Ok(Expr::Try { forms, loc });
                }
                if self.cur.literal == "switch" {
                    self.bump();
                    let forms = self.parse_until_rparen()?;
                    return Ok(Expr::Switch { forms, loc });
                }
                let tok = self.bump();
                let callee = Box::new(ident_expr(&tok)?);
                let args = self.parse_until_rparen()?;
                Ok(Expr::Call { callee, args, loc })
            }
            TokenKind::Accessor => {
                let tok = self.bump();
                let path: Vec<String> = tok
                    .literal
                    .trim_start_matches('.')
                    .split('.')
                    .map(str::to_string)
                    .collect();
                let target = Box::new(self.parse_form()?);
                if self.cur.kind != TokenKind::RParen {
                    return Err(self.malformed("accessor", "takes exactly one operand"));
                }
                self.bump();
                Ok(Expr::Accessor { path, target, loc })
            }
            TokenKind::LParen => {
                let first = self.parse_form()?;
                if matches!(first, Expr::Fn { name: None, .. }) {
                    let args = self.parse_until_rparen()?;
                    return Ok(Expr::Call {
                        callee: Box::new(first),
                        args,
                        loc,
                    });
                }
                let mut forms = vec![first];
                forms.extend(self.parse_until_rparen()?);
                Ok(Expr::Block { forms, loc })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof),
            // Literal-led sequence: a block
            _ => {
                let forms = self.parse_until_rparen()?;
                Ok(Expr::Block { forms, loc })
            }
        }
    }

    fn parse_until_rparen(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut forms = Vec::new();
        while self.cur.kind != TokenKind::RParen {
            if self.cur.kind == TokenKind::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            forms.push(self.parse_form()?);
        }
        self.bump();
        Ok(forms)
    }

    fn parse_operator(&mut self, loc: Location) -> Result<Expr, ParseError> {
        let op = match self.cur.kind {
            TokenKind::Plus => Oper::Add,
            TokenKind::Minus => Oper::Sub,
            TokenKind::Star => Oper::Mul,
            TokenKind::Slash => Oper::Div,
            TokenKind::Percent => Oper::Mod,
            TokenKind::Eq => Oper::Eql,
            TokenKind::NotEq => Oper::NotEql,
            TokenKind::Lt => Oper::Lt,
            TokenKind::LtEq => Oper::LtEq,
            TokenKind::Gt => Oper::Gt,
            TokenKind::GtEq => Oper::GtEq,
            TokenKind::Amp | TokenKind::And => Oper::And,
            TokenKind::Pipe | TokenKind::Or => Oper::Or,
            TokenKind::Bang | TokenKind::Not => Oper::Not,
            _ => return Err(self.unexpected()),
        };
        self.bump();
        let operands = self.parse_until_rparen()?;
        Ok(Expr::Oper { op, operands, loc })
    }

    fn parse_fn(&mut self, loc: Location) -> Result<Expr, ParseError> {
        self.bump();

        let name = if self.cur.kind == TokenKind::Ident {
            let tok = self.bump();
            if tok.literal.contains(':') {
                return Err(ParseError::MalformedForm {
                    form: "fn",
                    reason: "function name must not be qualified".to_string(),
                    line: tok.loc.line,
                    col: tok.loc.col,
                });
            }
            Some(tok.literal)
        } else {
            None
        };

        self.expect(TokenKind::LBracket)?;
        let mut params = Vec::new();
        while self.cur.kind == TokenKind::Ident {
            let tok = self.bump();
            if tok.literal.contains(':') {
                return Err(ParseError::MalformedForm {
                    form: "fn",
                    reason: "parameter must not be qualified".to_string(),
                    line: tok.loc.line,
                    col: tok.loc.col,
                });
            }
            params.push(tok.literal);
        }
        self.expect(TokenKind::RBracket)?;

        let body = self.parse_until_rparen()?;
        Ok(Expr::Fn {
            name,
            params,
            body,
            loc,
        })
    }

    fn parse_let(&mut self, loc: Location) -> Result<Expr, ParseError> {
        self.bump();
        let tok = self.expect(TokenKind::Ident)?;
        let (module, name) = split_qualified(&tok)?;
        let value = Box::new(self.parse_form()?);
        if self.cur.kind != TokenKind::RParen {
            return Err(self.malformed("let", "takes a name and one value"));
        }
        self.bump();
        Ok(Expr::Let {
            module,
            name,
            value,
            loc,
        })
    }

    fn parse_cond(&mut self, loc: Location) -> Result<Expr, ParseError> {
        self.bump();
        let cond = Box::new(self.parse_form()?);
        let then = Box::new(self.parse_form()?);
        let alt = if self.cur.kind != TokenKind::RParen {
            Some(Box::new(self.parse_form()?))
        } else {
            None
        };
        if self.cur.kind != TokenKind::RParen {
            return Err(self.malformed("cond", "takes at most three operands"));
        }
        self.bump();
        Ok(Expr::Cond {
            cond,
            then,
            alt,
            loc,
        })
    }

    fn parse_import(&mut self, loc: Location) -> Result<Expr, ParseError> {
        self.bump();
        let path = self.expect(TokenKind::Str)?.literal;

        let alias = if self.cur.kind == TokenKind::As {
            self.bump();
            let tok = self.expect(TokenKind::Ident)?;
            if tok.literal.contains(':') {
                return Err(ParseError::MalformedForm {
                    form: "import",
                    reason: "alias must not be qualified".to_string(),
                    line: tok.loc.line,
                    col: tok.loc.col,
                });
            }
            Some(tok.literal)
        } else {
            None
        };

        let mut symbols = Vec::new();
        if self.cur.kind == TokenKind::LBracket {
            self.bump();
            while self.cur.kind == TokenKind::Str {
                symbols.push(self.bump().literal);
            }
            self.expect(TokenKind::RBracket)?;
        }

        self.expect(TokenKind::RParen)?;
        Ok(Expr::Import {
            path,
            alias,
            symbols,
            loc,
        })
    }
}

/// True when the lexeme is an optional sign followed only by digits.
fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Build an identifier expression, splitting one `module:name` qualifier.
fn ident_expr(tok: &Token) -> Result<Expr, ParseError> {
    let parts: Vec<&str> = tok.literal.split(':').collect();
    match parts.as_slice() {
        [name] => Ok(Expr::Ident {
            module: None,
            name: (*name).to_string(),
            loc: tok.loc,
        }),
        [module, name] if !module.is_empty() && !name.is_empty() => Ok(Expr::Ident {
            module: Some((*module).to_string()),
            name: (*name).to_string(),
            loc: tok.loc,
        }),
        _ => Err(ParseError::BadQualifier {
            name: tok.literal.clone(),
            line: tok.loc.line,
            col: tok.loc.col,
        }),
    }
}

fn split_qualified(tok: &Token) -> Result<(Option<String>, String), ParseError> {
    match ident_expr(tok)? {
        Expr::Ident { module, name, .. } => Ok((module, name)),
        _ => unreachable!("ident_expr returns Ident"),
    }
}
