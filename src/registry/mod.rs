//! Process-wide, read-only operator tables: the determinism deny-list and the
//! training-mode mutation table.
//!
//! The tables live in a `OnceLock`. They are filled with the built-in
//! defaults on first lookup unless `install` ran before that; after that they
//! never change.

pub use self::config::RegistryConfig;
pub use self::determinism::{NondeterminismRule, NondeterministicOp};
pub use self::training::TrainingOp;

// --- MODULE DECLARATIONS ---
mod config;
mod determinism;
mod training;

use crate::schema::OperatorName;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry config '{path}': {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Invalid registry config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Operator registry is already initialized")]
    AlreadyInitialized,
}

/// Lookup tables keyed by operator name.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    nondeterministic: HashMap<String, NondeterminismRule>,
    training: HashMap<String, TrainingOp>,
}

impl OperatorRegistry {
    pub fn builtin() -> Self {
        Self::from(RegistryConfig::builtin())
    }

    /// The nondeterminism rule for `name`, preferring an overload-specific entry.
    pub fn nondeterminism_rule(&self, name: &OperatorName) -> Option<&NondeterminismRule> {
        lookup(&self.nondeterministic, name)
    }

    pub fn training_op(&self, name: &OperatorName) -> Option<&TrainingOp> {
        lookup(&self.training, name)
    }

    pub fn len(&self) -> usize {
        self.nondeterministic.len() + self.training.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RegistryConfig> for OperatorRegistry {
    fn from(config: RegistryConfig) -> Self {
        let mut registry = Self::default();
        for op in config.nondeterministic {
            if registry.nondeterministic.insert(op.name.clone(), op.rule).is_some() {
                warn!(operator = %op.name, "duplicate nondeterminism entry, keeping the last one");
            }
        }
        for op in config.training_ops {
            let name = op.name.clone();
            if registry.training.insert(name.clone(), op).is_some() {
                warn!(operator = %name, "duplicate training op entry, keeping the last one");
            }
        }
        registry
    }
}

fn lookup<'a, T>(table: &'a HashMap<String, T>, name: &OperatorName) -> Option<&'a T> {
    if name.overload.is_some() {
        if let Some(entry) = table.get(&name.full()) {
            return Some(entry);
        }
    }
    table.get(&name.qualified())
}

static REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();

/// The process-wide registry, built from the defaults if nothing was installed.
pub fn global() -> &'static OperatorRegistry {
    REGISTRY.get_or_init(|| {
        let registry = OperatorRegistry::builtin();
        debug!(entries = registry.len(), "initialized built-in operator registry");
        registry
    })
}

/// Installs custom tables. Must run before the first `global()` call, i.e.
/// before any `SchemaInfo` is built.
pub fn install(config: RegistryConfig) -> Result<(), RegistryError> {
    let registry = OperatorRegistry::from(config);
    let entries = registry.len();
    REGISTRY.set(registry).map_err(|_| RegistryError::AlreadyInitialized)?;
    debug!(entries, "installed custom operator registry");
    Ok(())
}
