//! # Icebox
//!
//! An immutable state container with copy-on-write drafts.
//!
//! Application state lives in a [`Store`] as a tree of [`Value`]s. The
//! published tree is never modified. To change it, an update receives a
//! mutable [`Draft`], edits it like ordinary data, and the store folds the
//! result back onto the old tree:
//!
//! - subtrees the update did not change stay the same allocation, so
//!   [`Value::ptr_eq`] tells a consumer what it can skip;
//! - an update that changes nothing publishes nothing and notifies no one;
//! - subscribers are called once per effective update, in registration
//!   order.
//!
//! [`ScopedStore`] narrows a store to one path of the tree for code that
//! only cares about part of the state.
//!
//! ```
//! use icebox::{path, value, Store};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let store = Store::new(value!({"a": {"b": 1}, "c": 2}));
//! let renders = Arc::new(AtomicUsize::new(0));
//! let renders_clone = renders.clone();
//! store.subscribe(move || {
//!     renders_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let prev = store.get_state();
//! store.mutate(|draft| draft.set("c", 3)).unwrap();
//!
//! let next = store.get_state();
//! assert!(next["a"].ptr_eq(&prev["a"]));
//! assert_eq!(next["c"].as_i64(), Some(3));
//! assert_eq!(renders.load(Ordering::SeqCst), 1);
//! ```

pub mod draft;
pub mod error;
pub mod scoped;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use draft::{Draft, Updater};
pub use error::{StoreError, StoreResult};
pub use scoped::ScopedStore;
pub use store::{Store, StoreConfig, SubscriberPanic, Subscription};
pub use value::{Map, Path, Seg, Value};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
