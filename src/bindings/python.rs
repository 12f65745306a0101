use crate::info::{ArgumentValue, InvalidArgument, SchemaArgType, SchemaArgument, SchemaInfo};
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBool;

fn to_py_err(e: InvalidArgument) -> PyErr {
    PyIndexError::new_err(e.to_string())
}

fn to_schema_argument((kind, index): (String, i64)) -> PyResult<SchemaArgument> {
    let kind = match kind.as_str() {
        "input" => SchemaArgType::Input,
        "output" => SchemaArgType::Output,
        other => {
            return Err(PyValueError::new_err(format!("Invalid argument kind '{}'", other)));
        }
    };
    Ok(SchemaArgument::new(kind, index))
}

fn to_argument_value(value: &Bound<'_, PyAny>) -> PyResult<ArgumentValue> {
    // `bool` is a subclass of `int` in Python, so it must be tried first.
    if value.is_none() {
        Ok(ArgumentValue::None)
    } else if let Ok(b) = value.extract::<bool>() {
        Ok(ArgumentValue::Bool(b))
    } else if let Ok(i) = value.extract::<i64>() {
        Ok(ArgumentValue::Int(i))
    } else if let Ok(f) = value.extract::<f64>() {
        Ok(ArgumentValue::Float(f))
    } else {
        Ok(ArgumentValue::Str(value.extract::<String>()?))
    }
}

#[pyclass(name = "_SchemaInfo")]
#[derive(Debug, Clone)]
pub struct PySchemaInfo {
    inner: SchemaInfo,
}

#[pymethods]
impl PySchemaInfo {
    #[new]
    pub fn new(schema: &str) -> PyResult<Self> {
        SchemaInfo::new(schema)
            .map(|inner| Self { inner })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Accepts either an input position or an input name.
    pub fn is_mutating(&self, argument: &Bound<'_, PyAny>) -> PyResult<bool> {
        // `bool` would otherwise extract as the index 0 or 1.
        if argument.is_instance_of::<PyBool>() {
            let message = "argument must be an int index or a str name, not bool";
            return Err(PyTypeError::new_err(message));
        }
        let result = if let Ok(index) = argument.extract::<i64>() {
            self.inner.is_mutating(index)
        } else {
            let name: String = argument.extract()?;
            self.inner.is_mutating(name.as_str())
        };
        result.map_err(to_py_err)
    }

    /// Each side is a `(kind, index)` tuple with kind `"input"` or `"output"`.
    pub fn are_aliasing(&self, first: (String, i64), second: (String, i64)) -> PyResult<bool> {
        let first = to_schema_argument(first)?;
        let second = to_schema_argument(second)?;
        self.inner.are_aliasing(first, second).map_err(to_py_err)
    }

    pub fn is_deterministic(&self) -> bool {
        self.inner.is_deterministic()
    }

    pub fn is_mutable(&self) -> bool {
        self.inner.is_mutable()
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.inner.has_argument(name)
    }

    pub fn add_argument_value(&mut self, name: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = to_argument_value(value)?;
        self.inner.add_argument_value(name, value).map_err(to_py_err)
    }

    pub fn signature_json(&self) -> PyResult<String> {
        self.inner
            .signature_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    pub fn num_inputs(&self) -> usize {
        self.inner.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.inner.num_outputs()
    }
}
