//! Recursive-descent parser for operator schemas.
//!
//! ```text
//! schema  := opname '(' args? ')' '->' returns
//! opname  := (ident '::')? ident ('.' ident)?
//! arg     := '*' | type ident ('=' default)?
//! type    := ident alias? suffix*
//!          | 'Dict' '(' type ',' type ')' suffix*
//!          | 'Future' '(' type ')' suffix*
//! alias   := '(' letter '!'? ('->' '*')? ')'
//! suffix  := '[' int? ']' | '?'
//! returns := '(' (type ident? (',' type ident?)*)? ')' | type ident?
//! ```
use super::error::ParseError;
use super::lexer::{tokenize, Token, TokenKind};
use super::types::{ArgumentDescriptor, OperatorName, SchemaSignature, SchemaType};
use crate::alias::AliasAnnotation;

pub(crate) struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self, ParseError> {
        Ok(Self { src, tokens: tokenize(src)?, pos: 0 })
    }

    pub fn parse_schema(mut self) -> Result<SchemaSignature, ParseError> {
        let name = self.parse_operator_name()?;
        self.expect(TokenKind::LParen, "`(` to open the argument list")?;
        let inputs = self.parse_arguments()?;
        self.expect(TokenKind::RParen, "`)` to close the argument list")?;
        self.expect(TokenKind::Arrow, "`->` before the return list")?;
        let outputs = self.parse_returns()?;
        self.expect(TokenKind::Eof, "end of schema")?;
        Ok(SchemaSignature { name, inputs, outputs })
    }

    // --- Token helpers ---

    fn peek(&self) -> Token<'a> {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        Self::error_at(self.peek(), message)
    }

    fn error_at(tok: Token<'_>, message: impl Into<String>) -> ParseError {
        ParseError::new(message, tok.offset, tok.display())
    }

    // --- Grammar ---

    fn parse_operator_name(&mut self) -> Result<OperatorName, ParseError> {
        let first = self.expect(TokenKind::Ident, "operator name")?;
        let (namespace, name) = if self.eat(TokenKind::DoubleColon) {
            let name = self.expect(TokenKind::Ident, "operator name after `::`")?;
            (Some(first.text.to_string()), name.text.to_string())
        } else {
            (None, first.text.to_string())
        };
        let overload = if self.eat(TokenKind::Dot) {
            Some(self.expect(TokenKind::Ident, "overload name after `.`")?.text.to_string())
        } else {
            None
        };
        Ok(OperatorName { namespace, name, overload })
    }

    fn parse_arguments(&mut self) -> Result<Vec<ArgumentDescriptor>, ParseError> {
        let mut args: Vec<ArgumentDescriptor> = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(args);
        }

        let mut kwarg_only = false;
        loop {
            if self.at(TokenKind::Star) {
                let star = self.bump();
                if kwarg_only {
                    let message = "keyword-only marker `*` appears more than once";
                    return Err(Self::error_at(star, message));
                }
                kwarg_only = true;
            } else {
                let (arg, name_tok) = self.parse_argument(args.len(), kwarg_only)?;
                if args.iter().any(|a| a.name == arg.name) {
                    return Err(Self::error_at(name_tok, "duplicate input argument name"));
                }
                args.push(arg);
            }

            if !self.eat(TokenKind::Comma) {
                if self.at(TokenKind::RParen) {
                    return Ok(args);
                }
                return Err(self.error("expected `,` or `)` after argument"));
            }
        }
    }

    fn parse_argument(
        &mut self,
        position: usize,
        kwarg_only: bool,
    ) -> Result<(ArgumentDescriptor, Token<'a>), ParseError> {
        let (ty, alias) = self.parse_type()?;
        let name_tok = self.expect(TokenKind::Ident, "argument name")?;
        let default = if self.eat(TokenKind::Equals) {
            Some(self.parse_default()?)
        } else {
            None
        };
        let arg = ArgumentDescriptor {
            name: Some(name_tok.text.to_string()),
            position,
            ty,
            alias,
            default,
            kwarg_only,
        };
        Ok((arg, name_tok))
    }

    /// Captures the raw text of a default value, stopping at the first `,` or
    /// `)` that is not nested inside brackets.
    fn parse_default(&mut self) -> Result<String, ParseError> {
        let first = self.peek();
        let mut depth = 0usize;
        let mut end = None;

        loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Eof => return Err(self.error("unterminated default value")),
                TokenKind::Comma | TokenKind::RParen if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("unbalanced bracket in default value"))?;
                }
                _ => {}
            }
            end = Some(tok.end());
            self.bump();
        }

        match end {
            Some(end) => Ok(self.src[first.offset..end].to_string()),
            None => Err(Self::error_at(first, "expected default value after `=`")),
        }
    }

    fn parse_type(&mut self) -> Result<(SchemaType, Option<AliasAnnotation>), ParseError> {
        let base = self.expect(TokenKind::Ident, "type")?;

        let (mut ty, alias) = match base.text {
            "Dict" if self.at(TokenKind::LParen) => {
                self.bump();
                let (key, key_alias) = self.parse_type()?;
                self.expect(TokenKind::Comma, "`,` between dict key and value types")?;
                let (value, value_alias) = self.parse_type()?;
                self.expect(TokenKind::RParen, "`)` to close `Dict(`")?;
                let ty = SchemaType::Dict { key: Box::new(key), value: Box::new(value) };
                (ty, self.merge_aliases(key_alias, value_alias)?)
            }
            "Future" if self.at(TokenKind::LParen) => {
                self.bump();
                let (inner, alias) = self.parse_type()?;
                self.expect(TokenKind::RParen, "`)` to close `Future(`")?;
                (SchemaType::Future { inner: Box::new(inner) }, alias)
            }
            name => {
                let alias = if self.at(TokenKind::LParen) {
                    Some(self.parse_alias()?)
                } else {
                    None
                };
                (SchemaType::named(name), alias)
            }
        };

        loop {
            if self.eat(TokenKind::LBracket) {
                let size = if self.at(TokenKind::Number) {
                    let tok = self.bump();
                    let n = tok
                        .text
                        .parse::<usize>()
                        .map_err(|_| Self::error_at(tok, "list size must be an integer"))?;
                    Some(n)
                } else {
                    None
                };
                self.expect(TokenKind::RBracket, "`]` to close list type")?;
                ty = SchemaType::List { element: Box::new(ty), size };
            } else if self.eat(TokenKind::Question) {
                ty = SchemaType::Optional { inner: Box::new(ty) };
            } else {
                break;
            }
        }

        Ok((ty, alias))
    }

    fn merge_aliases(
        &self,
        a: Option<AliasAnnotation>,
        b: Option<AliasAnnotation>,
    ) -> Result<Option<AliasAnnotation>, ParseError> {
        match (a, b) {
            (Some(_), Some(_)) => Err(self.error("type carries more than one alias annotation")),
            (a, b) => Ok(a.or(b)),
        }
    }

    fn parse_alias(&mut self) -> Result<AliasAnnotation, ParseError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let label_tok = self.expect(TokenKind::Ident, "alias set label")?;
        let label = match label_tok.text.as_bytes() {
            [c] if c.is_ascii_lowercase() => *c as char,
            _ => {
                let message = "alias set label must be a single lowercase letter";
                return Err(Self::error_at(label_tok, message));
            }
        };
        let is_write = self.eat(TokenKind::Bang);
        let wildcard = if self.eat(TokenKind::Arrow) {
            self.expect(TokenKind::Star, "`*` after `->` in alias annotation")?;
            true
        } else {
            false
        };
        self.expect(TokenKind::RParen, "`)` to close alias annotation")?;

        Ok(if wildcard {
            AliasAnnotation::Wildcard { from_label: label, is_write }
        } else {
            AliasAnnotation::Concrete { label, is_write }
        })
    }

    fn parse_returns(&mut self) -> Result<Vec<ArgumentDescriptor>, ParseError> {
        if !self.eat(TokenKind::LParen) {
            return Ok(vec![self.parse_return(0)?]);
        }

        let mut outputs: Vec<ArgumentDescriptor> = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(outputs);
        }
        loop {
            let name_tok = self.peek();
            let ret = self.parse_return(outputs.len())?;
            if ret.name.is_some() && outputs.iter().any(|o| o.name == ret.name) {
                return Err(Self::error_at(name_tok, "duplicate return name"));
            }
            outputs.push(ret);

            if self.eat(TokenKind::RParen) {
                return Ok(outputs);
            }
            self.expect(TokenKind::Comma, "`,` or `)` after return type")?;
        }
    }

    fn parse_return(&mut self, position: usize) -> Result<ArgumentDescriptor, ParseError> {
        let (ty, alias) = self.parse_type()?;
        let name = if self.at(TokenKind::Ident) {
            Some(self.bump().text.to_string())
        } else {
            None
        };
        Ok(ArgumentDescriptor { name, position, ty, alias, default: None, kwarg_only: false })
    }
}
