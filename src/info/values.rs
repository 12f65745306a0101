//! Concrete argument values a caller may attach to a query engine.
use smallvec::SmallVec;

/// Identifies the storage backing a tensor. Two tensors with the same id share memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(pub u64);

/// A runtime value for one input argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tensor(StorageId),
    List(Vec<ArgumentValue>),
}

impl ArgumentValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Every tensor storage reachable from this value, including through lists.
    pub fn storages(&self) -> SmallVec<[StorageId; 4]> {
        let mut out = SmallVec::new();
        self.collect_storages(&mut out);
        out
    }

    fn collect_storages(&self, out: &mut SmallVec<[StorageId; 4]>) {
        match self {
            Self::Tensor(id) => out.push(*id),
            Self::List(items) => items.iter().for_each(|v| v.collect_storages(out)),
            _ => {}
        }
    }
}

impl From<bool> for ArgumentValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ArgumentValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ArgumentValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for ArgumentValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<StorageId> for ArgumentValue {
    fn from(id: StorageId) -> Self {
        Self::Tensor(id)
    }
}

/// Whether a boolean flag may be set given what is known about its value.
/// Anything but a known `false` counts as possibly set.
pub(crate) fn flag_may_be_set(value: Option<&ArgumentValue>) -> bool {
    !matches!(value, Some(ArgumentValue::Bool(false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storages_walks_nested_lists() {
        let value = ArgumentValue::List(vec![
            StorageId(1).into(),
            ArgumentValue::List(vec![StorageId(2).into(), ArgumentValue::Int(3)]),
            ArgumentValue::None,
        ]);
        assert_eq!(value.storages().as_slice(), &[StorageId(1), StorageId(2)]);
        assert!(ArgumentValue::Float(0.5).storages().is_empty());
    }

    #[test]
    fn test_flag_may_be_set() {
        assert!(flag_may_be_set(None));
        assert!(flag_may_be_set(Some(&ArgumentValue::Bool(true))));
        assert!(flag_may_be_set(Some(&ArgumentValue::None)));
        assert!(!flag_may_be_set(Some(&ArgumentValue::Bool(false))));
        assert_eq!(ArgumentValue::from(true).as_bool(), Some(true));
        assert_eq!(ArgumentValue::from("x").as_bool(), None);
    }
}
