//! Serializable description of the registry tables, with the built-in defaults.
use super::determinism::NondeterministicOp;
use super::training::TrainingOp;
use super::RegistryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The full contents of an operator registry.
///
/// ```json
/// {
///   "nondeterministic": [
///     { "name": "aten::rand" },
///     { "name": "aten::dropout", "rule": { "kind": "when_true", "argument": "train" } }
///   ],
///   "training_ops": [
///     {
///       "name": "aten::batch_norm",
///       "flag": "training",
///       "mutated": ["running_mean", "running_var"]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub nondeterministic: Vec<NondeterministicOp>,
    #[serde(default)]
    pub training_ops: Vec<TrainingOp>,
}

impl RegistryConfig {
    /// The tables used when nothing else is installed.
    pub fn builtin() -> Self {
        let always = [
            "aten::_fused_dropout",
            "aten::_standard_gamma",
            "aten::bernoulli",
            "aten::bernoulli_",
            "aten::binomial",
            "aten::cauchy_",
            "aten::exponential_",
            "aten::geometric_",
            "aten::log_normal_",
            "aten::multinomial",
            "aten::normal",
            "aten::normal_",
            "aten::poisson",
            "aten::rand",
            "aten::rand_like",
            "aten::randint",
            "aten::randint_like",
            "aten::randn",
            "aten::randn_like",
            "aten::random_",
            "aten::randperm",
            "aten::uniform_",
        ];
        let train_dependent = [
            ("aten::dropout", "train"),
            ("aten::feature_dropout", "train"),
            ("aten::alpha_dropout", "train"),
            ("aten::feature_alpha_dropout", "train"),
            ("aten::native_dropout", "train"),
            ("aten::rrelu", "training"),
            ("aten::rrelu_with_noise", "training"),
        ];

        let mut nondeterministic: Vec<NondeterministicOp> =
            always.iter().map(|name| NondeterministicOp::always(name)).collect();
        nondeterministic.extend(
            train_dependent.iter().map(|(name, arg)| NondeterministicOp::when_true(name, arg)),
        );

        let training_ops = vec![
            TrainingOp::new("aten::batch_norm", "training", &["running_mean", "running_var"]),
            TrainingOp::new(
                "aten::instance_norm",
                "use_input_stats",
                &["running_mean", "running_var"],
            ),
            TrainingOp::new("aten::rrelu_with_noise", "training", &["noise"]),
        ];

        Self { nondeterministic, training_ops }
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, RegistryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
