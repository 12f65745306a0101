//! Defines the query-time error type.
use super::argument::SchemaArgType;
use thiserror::Error;

/// A query addressed an argument that does not exist. Recoverable: the
/// engine is left untouched and later queries behave normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("{kind} index {index} is out of range, expected 0 <= index < {len}")]
    IndexOutOfRange { kind: SchemaArgType, index: i64, len: usize },
    #[error("schema has no input argument named '{name}'")]
    UnknownName { name: String },
    #[error("{given} positional values supplied but the schema declares {len} inputs")]
    TooManyValues { given: usize, len: usize },
}
