//! Immutable state trees and the paths that address them.
//!
//! A [`Value`] is a JSON-shaped tree whose containers are shared behind
//! `Arc`. Once published, a tree is never written to again; writers get a
//! copy of only the nodes they touch.

mod path;
mod value;

pub use path::{Path, Seg};
pub use value::{Map, Value};

/// Build a [`Value`] from JSON-like syntax.
///
/// ```
/// use icebox::value;
///
/// let state = value!({"count": 0, "todos": []});
/// assert_eq!(state["count"].as_i64(), Some(0));
/// ```
#[macro_export]
macro_rules! value {
    ($($json:tt)+) => {
        $crate::Value::from($crate::__private::serde_json::json!($($json)+))
    };
}
