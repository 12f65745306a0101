//! The alias annotation algebra written inside schema types, e.g. `Tensor(a!)`.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-argument marker describing how its storage may be shared.
///
/// `Wildcard` is kept as its own variant rather than a flag on `Concrete` so
/// that a finer-grained resolution can be added later as another variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AliasAnnotation {
    /// `(a)` or `(a!)`: the argument belongs to alias set `label`.
    Concrete { label: char, is_write: bool },
    /// `(a -> *)`: after the call the argument may alias anything.
    Wildcard { from_label: char, is_write: bool },
}

impl AliasAnnotation {
    pub fn concrete(label: char) -> Self {
        Self::Concrete { label, is_write: false }
    }

    pub fn written(label: char) -> Self {
        Self::Concrete { label, is_write: true }
    }

    pub fn wildcard(from_label: char) -> Self {
        Self::Wildcard { from_label, is_write: false }
    }

    /// The alias set letter the annotation is rooted at.
    pub fn label(&self) -> char {
        match *self {
            Self::Concrete { label, .. } => label,
            Self::Wildcard { from_label, .. } => from_label,
        }
    }

    /// Whether the annotation carries the `!` write marker.
    pub fn is_write(&self) -> bool {
        match *self {
            Self::Concrete { is_write, .. } | Self::Wildcard { is_write, .. } => is_write,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }
}

impl fmt::Display for AliasAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bang = if self.is_write() { "!" } else { "" };
        match self {
            Self::Concrete { label, .. } => write!(f, "{}{}", label, bang),
            Self::Wildcard { from_label, .. } => write!(f, "{}{} -> *", from_label, bang),
        }
    }
}
