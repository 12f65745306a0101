//! The public query engine over a parsed schema.
//!
//! `SchemaInfo` answers three questions for downstream optimizers: which
//! inputs an operator writes, which arguments may share storage, and whether
//! the operator is deterministic.

pub use self::argument::{ArgumentKey, SchemaArgType, SchemaArgument};
pub use self::error::InvalidArgument;
pub use self::schema_info::SchemaInfo;
pub use self::values::{ArgumentValue, StorageId};

// --- MODULE DECLARATIONS ---
mod argument;
mod error;
mod schema_info;
pub(crate) mod values;
