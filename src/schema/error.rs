//! Defines the error type raised while reading schema text.
use thiserror::Error;

/// A schema string that does not follow the operator-schema grammar.
///
/// Carries the byte offset and text of the token the parser stopped on so a
/// caller can point at the exact spot in the declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset} (near `{token}`)")]
pub struct ParseError {
    /// A human-readable description of what was expected.
    pub message: String,
    /// Byte offset of the offending token within the schema text.
    pub offset: usize,
    /// The offending token, or `end of input`.
    pub token: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize, token: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset,
            token: token.into(),
        }
    }
}
