use std::fmt;

use tracing::trace;

use crate::draft::Updater;
use crate::error::{StoreError, StoreResult};
use crate::store::Shared;
use crate::value::{Path, Value};

/// Mutable working copy of the state for the duration of one update.
///
/// A draft starts out sharing every node with the published snapshot.
/// Writes copy only the nodes on the way to the written location; the
/// snapshot itself is never touched. All paths are relative to the
/// draft's base, which is the root for drafts handed out by
/// [`Store::update`](crate::Store::update).
///
/// Updates started with [`Store::update`](crate::Store::update) while a
/// recipe is running land in this draft at the point they were issued:
/// the next draft operation sees their writes.
///
/// ```
/// use icebox::{path, value, Store, Updater};
///
/// let store = Store::new(value!({"todos": [], "filter": "all"}));
/// store
///     .update(Updater::mutate(|draft| {
///         draft.push("todos", value!({"title": "write docs", "done": false}))?;
///         draft.set(path!("todos", 0, "done"), true)
///     }))
///     .unwrap();
/// assert_eq!(store.get_state()["todos"][0]["done"].as_bool(), Some(true));
/// ```
pub struct Draft<'a> {
    root: &'a mut Value,
    base: Path,
    cycle: Option<&'a Shared>,
}

impl<'a> Draft<'a> {
    #[cfg(test)]
    pub(crate) fn new(root: &'a mut Value) -> Self {
        Self {
            root,
            base: Path::root(),
            cycle: None,
        }
    }

    /// A root draft tied to the store's in-flight update.
    pub(crate) fn in_cycle(root: &'a mut Value, shared: &'a Shared) -> Self {
        Self {
            root,
            base: Path::root(),
            cycle: Some(shared),
        }
    }

    fn full(&self, path: impl Into<Path>) -> Path {
        self.base.join(&path.into())
    }

    /// Apply updates queued by re-entrant `Store::update` calls, oldest
    /// first. Updates they queue in turn run inside them. A failure is
    /// recorded on the cycle, which then publishes nothing.
    fn apply_deferred(&mut self) {
        let Some(shared) = self.cycle else {
            return;
        };
        for updater in shared.take_deferred() {
            trace!(store = %shared.label(), "applying deferred update");
            let mut root = Draft {
                root: &mut *self.root,
                base: Path::root(),
                cycle: self.cycle,
            };
            if let Err(err) = root.update(updater) {
                shared.fail_cycle(err);
                return;
            }
        }
    }

    /// Where this draft sits in the state tree.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The value at the draft's base, as edited so far.
    pub fn current(&mut self) -> Option<&Value> {
        self.apply_deferred();
        self.root.pointer(&self.base)
    }

    pub fn get(&mut self, path: impl Into<Path>) -> Option<&Value> {
        self.apply_deferred();
        let full = self.full(path);
        self.root.pointer(&full)
    }

    /// Mutable access to a nested value. Only the nodes along `path` are
    /// copied; writes through the returned reference stay in the draft.
    pub fn get_mut(&mut self, path: impl Into<Path>) -> Option<&mut Value> {
        self.apply_deferred();
        let full = self.full(path);
        self.root.pointer_mut(&full)
    }

    /// Like [`Draft::get_mut`], but a missing path is an error.
    pub fn require(&mut self, path: impl Into<Path>) -> StoreResult<&mut Value> {
        self.apply_deferred();
        let full = self.full(path);
        if self.root.pointer(&full).is_none() {
            return Err(StoreError::path_not_found(full));
        }
        self.root
            .pointer_mut(&full)
            .ok_or_else(|| StoreError::path_not_found(full.clone()))
    }

    /// Assign `value` at `path`.
    ///
    /// Missing object members along the way are created, `null` is
    /// promoted to an object, and an index equal to the array length
    /// appends.
    pub fn set(&mut self, path: impl Into<Path>, value: impl Into<Value>) -> StoreResult<()> {
        self.apply_deferred();
        let full = self.full(path);
        self.root.set_path(&full, value.into())
    }

    /// Remove the value at `path`, returning it. Absent paths are a no-op.
    pub fn delete(&mut self, path: impl Into<Path>) -> Option<Value> {
        self.apply_deferred();
        let full = self.full(path);
        self.root.remove_path(&full)
    }

    /// Shallow-merge the members of `object` into the object at `path`.
    ///
    /// An absent or `null` target becomes an empty object first.
    pub fn merge(&mut self, path: impl Into<Path>, object: impl Into<Value>) -> StoreResult<()> {
        let members = match object.into() {
            Value::Object(members) => members,
            other => return Err(StoreError::invalid_updater(&other)),
        };
        self.apply_deferred();
        let full = self.full(path);
        if self.root.pointer(&full).map_or(true, Value::is_null) {
            self.root.set_path(&full, Value::object())?;
        }
        let target = self
            .root
            .pointer_mut(&full)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StoreError::merge_requires_object(full.clone()))?;
        for (key, value) in members.iter() {
            target.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Append to the array at `path`, creating it if absent.
    pub fn push(&mut self, path: impl Into<Path>, value: impl Into<Value>) -> StoreResult<()> {
        self.apply_deferred();
        let full = self.full(path);
        if self.root.pointer(&full).map_or(true, Value::is_null) {
            self.root.set_path(&full, Value::array())?;
        }
        self.root
            .pointer_mut(&full)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| StoreError::append_requires_array(full.clone()))?
            .push(value.into());
        Ok(())
    }

    /// Replace everything under the draft's base.
    pub fn replace(&mut self, value: impl Into<Value>) -> StoreResult<()> {
        self.apply_deferred();
        self.root.set_path(&self.base, value.into())
    }

    /// A draft rooted at `path` below this one.
    pub fn at(&mut self, path: impl Into<Path>) -> Draft<'_> {
        self.apply_deferred();
        let base = self.full(path);
        Draft {
            root: &mut *self.root,
            base,
            cycle: self.cycle,
        }
    }

    /// Apply a nested update to this draft immediately.
    ///
    /// Its changes become part of the enclosing update and are published
    /// and announced together with it.
    pub fn update(&mut self, updater: impl Into<Updater>) -> StoreResult<()> {
        match updater.into() {
            Updater::Merge(value) => self.merge(Path::root(), value),
            Updater::Recipe(recipe) => {
                let replacement = recipe(&mut *self)?;
                self.apply_deferred();
                if let Some(replacement) = replacement {
                    self.replace(replacement)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Draft<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("base", &self.base)
            .field("root", &self.root)
            .finish()
    }
}
