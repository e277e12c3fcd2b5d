//! The state container.
//!
//! A [`Store`] owns the current snapshot, runs updates against drafts,
//! publishes the reconciled result and tells subscribers about it.

mod config;
mod store;
mod subscription;

pub use config::{StoreConfig, SubscriberPanic};
pub(crate) use store::Shared;
pub use store::Store;
pub use subscription::Subscription;
