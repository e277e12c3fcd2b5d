use crate::draft::Draft;
use crate::error::{StoreError, StoreResult};
use crate::value::Value;
use std::fmt;

type Recipe = Box<dyn FnOnce(&mut Draft<'_>) -> StoreResult<Option<Value>> + Send>;

/// What an update does to the state.
///
/// Plain values convert into [`Updater::Merge`], so `store.update(value!({..}))`
/// merges an object into the root.
pub enum Updater {
    /// Shallow-merge the members of an object into the target.
    Merge(Value),
    /// Run a closure against the draft. `Some(value)` replaces the target
    /// wholesale once the closure returns.
    Recipe(Recipe),
}

impl Updater {
    /// Shallow-merge `value`, which must be an object.
    pub fn merge(value: impl Into<Value>) -> Self {
        Updater::Merge(value.into())
    }

    /// Mutate the draft in place.
    pub fn mutate<F>(f: F) -> Self
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<()> + Send + 'static,
    {
        Updater::Recipe(Box::new(move |draft: &mut Draft<'_>| f(draft).map(|()| None)))
    }

    /// Mutate the draft and optionally hand back a replacement.
    pub fn produce<F>(f: F) -> Self
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<Option<Value>> + Send + 'static,
    {
        Updater::Recipe(Box::new(f))
    }

    /// Reject merges of anything but an object before any work starts.
    pub(crate) fn validate(&self) -> StoreResult<()> {
        match self {
            Updater::Merge(value) if !value.is_object() => Err(StoreError::invalid_updater(value)),
            _ => Ok(()),
        }
    }
}

impl From<Value> for Updater {
    fn from(value: Value) -> Self {
        Updater::Merge(value)
    }
}

impl From<serde_json::Value> for Updater {
    fn from(json: serde_json::Value) -> Self {
        Updater::Merge(json.into())
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Updater::Merge(value) => f.debug_tuple("Merge").field(value).finish(),
            Updater::Recipe(_) => f.debug_tuple("Recipe").field(&"<closure>").finish(),
        }
    }
}
