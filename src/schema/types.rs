//! The structured form of an operator schema.
use crate::alias::AliasAnnotation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ParseError;

/// `namespace::name.overload`, e.g. `aten::sub_.Tensor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorName {
    pub namespace: Option<String>,
    pub name: String,
    pub overload: Option<String>,
}

impl OperatorName {
    /// The name without its overload, e.g. `aten::sub_`.
    pub fn qualified(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}::{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// The name including the overload when there is one, e.g. `aten::sub_.Tensor`.
    pub fn full(&self) -> String {
        match &self.overload {
            Some(overload) => format!("{}.{}", self.qualified(), overload),
            None => self.qualified(),
        }
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

/// A declared argument or return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaType {
    /// `Tensor`, `int`, `Scalar`, ...
    Named { name: String },
    /// `T[]` or the fixed-size `T[N]`.
    List { element: Box<SchemaType>, size: Option<usize> },
    /// `T?`
    Optional { inner: Box<SchemaType> },
    /// `Dict(K, V)`
    Dict { key: Box<SchemaType>, value: Box<SchemaType> },
    /// `Future(T)`
    Future { inner: Box<SchemaType> },
}

impl SchemaType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    /// True for types that hold other values (lists and dicts, possibly optional).
    pub fn is_container(&self) -> bool {
        match self {
            Self::List { .. } | Self::Dict { .. } => true,
            Self::Optional { inner } => inner.is_container(),
            Self::Named { .. } | Self::Future { .. } => false,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name } => f.write_str(name),
            Self::List { element, size: Some(n) } => write!(f, "{}[{}]", element, n),
            Self::List { element, size: None } => write!(f, "{}[]", element),
            Self::Optional { inner } => write!(f, "{}?", inner),
            Self::Dict { key, value } => write!(f, "Dict({}, {})", key, value),
            Self::Future { inner } => write!(f, "Future({})", inner),
        }
    }
}

/// One input argument or one output of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    /// Always present for inputs; outputs may be unnamed.
    pub name: Option<String>,
    /// Zero-based position within its list.
    pub position: usize,
    pub ty: SchemaType,
    pub alias: Option<AliasAnnotation>,
    /// The default value exactly as written in the schema.
    pub default: Option<String>,
    /// Declared after the `*` marker.
    pub kwarg_only: bool,
}

impl ArgumentDescriptor {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_write(&self) -> bool {
        self.alias.map_or(false, |a| a.is_write())
    }

    pub fn name_is(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// A parsed operator schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSignature {
    pub name: OperatorName,
    pub inputs: Vec<ArgumentDescriptor>,
    pub outputs: Vec<ArgumentDescriptor>,
}

impl SchemaSignature {
    /// Position of the input argument called `name`.
    pub fn input_position(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|a| a.name_is(name))
    }

    pub fn input(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.inputs.iter().find(|a| a.name_is(name))
    }
}

impl FromStr for SchemaSignature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_name_forms() {
        let name = OperatorName {
            namespace: Some("aten".into()),
            name: "sub_".into(),
            overload: Some("Tensor".into()),
        };
        assert_eq!(name.qualified(), "aten::sub_");
        assert_eq!(name.full(), "aten::sub_.Tensor");
        assert_eq!(name.to_string(), "aten::sub_.Tensor");

        let bare = OperatorName { namespace: None, name: "foo".into(), overload: None };
        assert_eq!(bare.full(), "foo");
    }

    #[test]
    fn test_container_detection() {
        let list = SchemaType::List { element: Box::new(SchemaType::named("Tensor")), size: None };
        assert!(list.is_container());
        assert!(SchemaType::Optional { inner: Box::new(list.clone()) }.is_container());
        assert!(!SchemaType::named("Tensor").is_container());
        assert_eq!(SchemaType::Optional { inner: Box::new(list) }.to_string(), "Tensor[]?");
    }
}
