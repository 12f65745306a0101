//! Ways of addressing an argument in a query.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaArgType {
    Input,
    Output,
}

impl fmt::Display for SchemaArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// An input or output slot by position. The index is signed so that negative
/// positions coming from callers are reported rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaArgument {
    pub kind: SchemaArgType,
    pub index: i64,
}

impl SchemaArgument {
    pub fn new(kind: SchemaArgType, index: i64) -> Self {
        Self { kind, index }
    }

    pub fn input(index: i64) -> Self {
        Self::new(SchemaArgType::Input, index)
    }

    pub fn output(index: i64) -> Self {
        Self::new(SchemaArgType::Output, index)
    }
}

/// An input argument addressed by position or by declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKey<'a> {
    Index(i64),
    Name(&'a str),
}

impl From<i32> for ArgumentKey<'_> {
    fn from(index: i32) -> Self {
        Self::Index(index.into())
    }
}

impl From<i64> for ArgumentKey<'_> {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<usize> for ArgumentKey<'_> {
    fn from(index: usize) -> Self {
        Self::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl<'a> From<&'a str> for ArgumentKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for ArgumentKey<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}
