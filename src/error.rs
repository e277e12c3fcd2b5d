//! Failures reported by [`Store::update`](crate::Store::update) and the
//! draft operations.

use crate::value::{Path, Value};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Why an update did not go through.
///
/// Whenever one of these comes back from an update, the published
/// snapshot is exactly what it was before the call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A merge was handed something other than an object.
    #[error("invalid updater: expected an object or a recipe, found {found}")]
    InvalidUpdaterKind { found: &'static str },

    #[error("path not found: {path}")]
    PathNotFound { path: Path },

    /// A write addressed an array slot past its end. Writing at exactly
    /// `len` appends and is not an error.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },

    /// A key was used on something that is not an object, or an index on
    /// something that is not an array. `path` stops at the offending node.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    #[error("merge requires object value at {path}")]
    MergeRequiresObject { path: Path },

    #[error("append requires array value at {path}")]
    AppendRequiresArray { path: Path },

    /// Raised by recipes through [`StoreError::aborted`].
    #[error("update aborted: {message}")]
    Aborted { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Reject `value` as a merge payload.
    pub fn invalid_updater(value: &Value) -> Self {
        StoreError::InvalidUpdaterKind {
            found: value.type_name(),
        }
    }

    pub fn path_not_found(path: Path) -> Self {
        StoreError::PathNotFound { path }
    }

    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        StoreError::IndexOutOfBounds { path, index, len }
    }

    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        StoreError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    pub fn merge_requires_object(path: Path) -> Self {
        StoreError::MergeRequiresObject { path }
    }

    pub fn append_requires_array(path: Path) -> Self {
        StoreError::AppendRequiresArray { path }
    }

    /// Abort the current update from inside a recipe.
    ///
    /// Nothing from the aborted cycle is published.
    pub fn aborted(message: impl Into<String>) -> Self {
        StoreError::Aborted {
            message: message.into(),
        }
    }
}
