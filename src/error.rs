//! Configuration error types.
//!
//! Only configuration problems are typed: they are recoverable and collapse
//! to "no component" at the factory boundary. Everything else (missing files,
//! unreadable artifacts, failed model writes) travels as `anyhow::Error`.

use thiserror::Error;

/// A problem with one parameter of a [`ParameterSet`](crate::params::ParameterSet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter {path} not present")]
    Missing { path: String },

    #[error("parameter {path}: cannot parse {value:?} as {expected}")]
    Malformed {
        path: String,
        value: String,
        expected: &'static str,
    },

    #[error("configuration line has no name")]
    EmptyName,
}

impl ParamError {
    /// Full dotted path of the offending parameter, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Missing { path } | Self::Malformed { path, .. } => Some(path),
            Self::EmptyName => None,
        }
    }
}
