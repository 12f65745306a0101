//! Reads operator schema strings such as
//! `aten::sub_.Tensor(Tensor(a!) self, Tensor other, *, Scalar alpha=1) -> (Tensor(a!))`
//! into a typed `SchemaSignature`.

pub use self::error::ParseError;
pub use self::types::{ArgumentDescriptor, OperatorName, SchemaSignature, SchemaType};

// --- MODULE DECLARATIONS ---
mod error;
mod lexer;
mod parser;
mod types;

use tracing::trace;

/// Parses a schema string into an immutable signature.
pub fn parse(text: &str) -> Result<SchemaSignature, ParseError> {
    let signature = parser::Parser::new(text)?.parse_schema()?;
    trace!(
        operator = %signature.name,
        inputs = signature.inputs.len(),
        outputs = signature.outputs.len(),
        "parsed schema"
    );
    Ok(signature)
}
