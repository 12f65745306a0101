//! Nondeterminism rules: which operators may return different results for
//! identical inputs.
use crate::info::values::{flag_may_be_set, ArgumentValue};
use serde::{Deserialize, Serialize};

/// When an operator listed in the registry is nondeterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NondeterminismRule {
    /// On every call.
    #[default]
    Always,
    /// Only when the boolean argument `argument` is true (e.g. `train` for dropout).
    WhenTrue { argument: String },
}

impl NondeterminismRule {
    /// The argument the rule depends on, if any.
    pub fn condition(&self) -> Option<&str> {
        match self {
            Self::Always => None,
            Self::WhenTrue { argument } => Some(argument),
        }
    }

    /// Evaluates the rule given the value of its condition argument.
    /// An unknown value is treated as nondeterministic.
    pub fn holds(&self, condition_value: Option<&ArgumentValue>) -> bool {
        match self {
            Self::Always => true,
            Self::WhenTrue { .. } => flag_may_be_set(condition_value),
        }
    }
}

/// One deny-list entry. `name` is either `ns::op` (every overload) or `ns::op.overload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NondeterministicOp {
    pub name: String,
    #[serde(default)]
    pub rule: NondeterminismRule,
}

impl NondeterministicOp {
    pub fn always(name: &str) -> Self {
        Self { name: name.to_string(), rule: NondeterminismRule::Always }
    }

    pub fn when_true(name: &str, argument: &str) -> Self {
        Self {
            name: name.to_string(),
            rule: NondeterminismRule::WhenTrue { argument: argument.to_string() },
        }
    }
}
