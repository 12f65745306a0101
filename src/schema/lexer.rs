//! Tokenizer for the operator-schema mini-language.
use super::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Number,
    Str,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Question,
    Bang,
    Star,
    Equals,
    DoubleColon,
    Dot,
    Arrow,
    Pipe,
    Minus,
    Eof,
}

/// A token borrowing its text from the schema string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// The text to show in error messages.
    pub fn display(&self) -> &'a str {
        if self.kind == TokenKind::Eof { "end of input" } else { self.text }
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Splits `src` into tokens. The returned vector always ends with `Eof`.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if let Some(kind) = punctuation(c) {
            i += 1;
            tokens.push(Token { kind, text: &src[start..i], offset: start });
            continue;
        }

        let kind = match c {
            b':' => {
                if bytes.get(i + 1) != Some(&b':') {
                    return Err(ParseError::new("expected `::`", start, &src[start..start + 1]));
                }
                i += 2;
                TokenKind::DoubleColon
            }
            b'-' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    i += 2;
                    TokenKind::Arrow
                } else {
                    i += 1;
                    TokenKind::Minus
                }
            }
            b'"' | b'\'' => {
                i = scan_string(src, start)?;
                TokenKind::Str
            }
            c if c.is_ascii_digit() => {
                i = scan_number(bytes, start);
                TokenKind::Number
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                TokenKind::Ident
            }
            _ => {
                // Report the whole (possibly multi-byte) character.
                let ch = src[start..].chars().next().map_or(1, char::len_utf8);
                let text = &src[start..start + ch];
                return Err(ParseError::new("unexpected character", start, text));
            }
        };

        tokens.push(Token { kind, text: &src[start..i], offset: start });
    }

    tokens.push(Token { kind: TokenKind::Eof, text: "", offset: src.len() });
    Ok(tokens)
}

fn punctuation(c: u8) -> Option<TokenKind> {
    let kind = match c {
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b',' => TokenKind::Comma,
        b'?' => TokenKind::Question,
        b'!' => TokenKind::Bang,
        b'*' => TokenKind::Star,
        b'=' => TokenKind::Equals,
        b'.' => TokenKind::Dot,
        b'|' => TokenKind::Pipe,
        _ => return None,
    };
    Some(kind)
}

/// Returns the index one past the closing quote.
fn scan_string(src: &str, start: usize) -> Result<usize, ParseError> {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(ParseError::new("unterminated string literal", start, &src[start..]))
}

/// Accepts integers, decimals and exponents such as `1e-05`.
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' | b'.' => i += 1,
            b'e' | b'E' => {
                i += 1;
                if matches!(bytes.get(i), Some(b'-') | Some(b'+')) {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    i
}
