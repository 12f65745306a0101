// Static analysis of operator schemas: mutation, aliasing and determinism
// queries over declarations such as
// `aten::sub_.Tensor(Tensor(a!) self, Tensor other, *, Scalar alpha=1) -> (Tensor(a!))`.

pub mod alias;
pub mod info;
pub mod registry;
pub mod schema;

#[cfg(feature = "python")]
mod bindings {
    pub mod python;
}

pub use alias::AliasAnnotation;
pub use info::{
    ArgumentKey, ArgumentValue, InvalidArgument, SchemaArgType, SchemaArgument, SchemaInfo,
    StorageId,
};
pub use registry::{RegistryConfig, RegistryError};
pub use schema::{
    parse, ArgumentDescriptor, OperatorName, ParseError, SchemaSignature, SchemaType,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

// --- Module Definition ---
/// Reports the crate version to Python callers.
#[cfg(feature = "python")]
#[pyfunction]
fn schema_info_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// This function defines the `_core` Python module.
/// The name `_core` is chosen to indicate it's an internal, compiled component.
#[cfg(feature = "python")]
#[pymodule]
fn _core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(schema_info_version, m)?)?;
    m.add_class::<bindings::python::PySchemaInfo>()?;
    Ok(())
}
