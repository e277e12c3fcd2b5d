use crate::draft::{Draft, Updater};
use crate::error::StoreResult;
use crate::store::{Store, Subscription};
use crate::value::{Path, Value};

/// A store seen through a path.
///
/// Holds no state of its own: every read resolves the path against the
/// owning store's current snapshot, and every update runs through the
/// owning store confined to the sub-draft at the path. A path that no
/// longer resolves simply reads as `None`.
///
/// ```
/// use icebox::{path, value, Store};
///
/// let store = Store::new(value!({"user": {"name": "ann"}}));
/// let user = store.store_for("user");
///
/// user.merge(value!({"age": 31})).unwrap();
/// assert_eq!(store.select(path!("user", "age")), Some(value!(31)));
/// assert_eq!(store.store_for("missing").get_state(), None);
/// ```
#[derive(Clone, Debug)]
pub struct ScopedStore {
    store: Store,
    path: Path,
}

impl ScopedStore {
    pub(crate) fn new(store: Store, path: Path) -> Self {
        Self { store, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The owning store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The value at the path in the current snapshot.
    pub fn get_state(&self) -> Option<Value> {
        self.store.select(&self.path)
    }

    /// Update the value at the path.
    ///
    /// Merges go into the object at the path, which is created if absent.
    /// Recipes get a draft rooted at the path; a returned replacement
    /// replaces only the value at the path.
    pub fn update(&self, updater: impl Into<Updater>) -> StoreResult<()> {
        let updater = updater.into();
        updater.validate()?;
        let path = self.path.clone();
        self.store
            .update(Updater::mutate(move |draft| draft.at(path).update(updater)))
    }

    pub fn merge(&self, object: impl Into<Value>) -> StoreResult<()> {
        self.update(Updater::merge(object))
    }

    pub fn mutate<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<()> + Send + 'static,
    {
        self.update(Updater::mutate(f))
    }

    pub fn produce<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<Option<Value>> + Send + 'static,
    {
        self.update(Updater::produce(f))
    }

    /// Subscribe to changes anywhere in the owning store.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// A narrower view below this one.
    pub fn store_for(&self, path: impl Into<Path>) -> ScopedStore {
        ScopedStore::new(self.store.clone(), self.path.join(&path.into()))
    }
}
