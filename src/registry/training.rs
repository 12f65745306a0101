//! Operators that update buffers in place only in training mode, without a
//! write annotation in their schema (e.g. batch norm running statistics).
use crate::info::values::{flag_may_be_set, ArgumentValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOp {
    /// `ns::op` or `ns::op.overload`.
    pub name: String,
    /// The boolean argument that switches training mode on.
    pub flag: String,
    /// Arguments written while the flag is set.
    pub mutated: Vec<String>,
}

impl TrainingOp {
    pub fn new(name: &str, flag: &str, mutated: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            flag: flag.to_string(),
            mutated: mutated.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether `argument` may be written given the value of the training flag.
    pub fn may_mutate(&self, argument: &str, flag_value: Option<&ArgumentValue>) -> bool {
        self.mutated.iter().any(|m| m == argument) && flag_may_be_set(flag_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_mutate() {
        let op = TrainingOp::new("aten::batch_norm", "training", &["running_mean", "running_var"]);
        assert!(op.may_mutate("running_mean", None));
        assert!(op.may_mutate("running_var", Some(&ArgumentValue::Bool(true))));
        assert!(!op.may_mutate("running_var", Some(&ArgumentValue::Bool(false))));
        assert!(!op.may_mutate("input", None));
    }
}
