//! Alias annotations and the alias-set model the query engine consults.
pub use self::annotation::AliasAnnotation;
pub use self::model::AliasModel;

mod annotation;
mod model;
