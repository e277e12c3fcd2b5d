use super::config::{StoreConfig, SubscriberPanic};
use super::subscription::{Listener, Subscription};
use crate::draft::{reconcile, Draft, Updater};
use crate::error::{StoreError, StoreResult};
use crate::scoped::ScopedStore;
use crate::value::{Path, Value};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

/// An update in flight, owned by the thread running it.
struct Cycle {
    owner: ThreadId,
    deferred: VecDeque<Updater>,
    failure: Option<StoreError>,
}

struct Inner {
    snapshot: Value,
    listeners: Vec<Listener>,
    cycle: Option<Cycle>,
}

pub(crate) struct Shared {
    inner: Mutex<Inner>,
    idle: Condvar,
    next_id: AtomicUsize,
    config: StoreConfig,
}

impl Shared {
    // No user code ever runs under this lock, so poisoning carries no
    // meaning here.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remove_listener(&self, id: usize) {
        self.lock().listeners.retain(|listener| listener.id != id);
    }

    pub(crate) fn label(&self) -> &str {
        &self.config.label
    }

    /// Everything queued on the current cycle so far. Empty once the cycle
    /// has failed.
    pub(crate) fn take_deferred(&self) -> VecDeque<Updater> {
        match self.lock().cycle.as_mut() {
            Some(cycle) if cycle.failure.is_none() => std::mem::take(&mut cycle.deferred),
            _ => VecDeque::new(),
        }
    }

    /// Mark the current cycle as failed. The first failure wins.
    pub(crate) fn fail_cycle(&self, err: StoreError) {
        if let Some(cycle) = self.lock().cycle.as_mut() {
            cycle.failure.get_or_insert(err);
        }
    }

    fn take_failure(&self) -> Option<StoreError> {
        self.lock().cycle.as_mut().and_then(|cycle| cycle.failure.take())
    }
}

/// Closes the current cycle on every way out of `update`, unwinding included.
struct CycleGuard<'a> {
    shared: &'a Shared,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().cycle = None;
        self.shared.idle.notify_all();
    }
}

/// A container for an immutable state tree.
///
/// Readers get the current snapshot in O(1) and may hold on to it for as
/// long as they like; it never changes. Writers go through
/// [`Store::update`], which hands them a [`Draft`], folds the result back
/// onto the previous snapshot and publishes a new one only if something
/// actually changed. Every subtree the update did not change is the very
/// same allocation as before, so consumers can skip work with
/// [`Value::ptr_eq`].
///
/// Handles are cheap to clone and all refer to the same state.
///
/// ```
/// use icebox::{value, Store};
///
/// let store = Store::new(value!({"count": 0, "user": {"name": "ann"}}));
/// let before = store.get_state();
///
/// store.merge(value!({"count": 1})).unwrap();
///
/// let after = store.get_state();
/// assert_eq!(after["count"].as_i64(), Some(1));
/// assert!(after["user"].ptr_eq(&before["user"]));
/// ```
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// Create a new store with the given initial state.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    pub fn with_config(initial: impl Into<Value>, config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    snapshot: initial.into(),
                    listeners: Vec::new(),
                    cycle: None,
                }),
                idle: Condvar::new(),
                next_id: AtomicUsize::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// The current snapshot.
    pub fn get_state(&self) -> Value {
        self.shared.lock().snapshot.clone()
    }

    /// Read the current snapshot without keeping it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Value) -> R,
    {
        let snapshot = self.get_state();
        f(&snapshot)
    }

    /// The current value at `path`, if it resolves.
    pub fn select(&self, path: impl Into<Path>) -> Option<Value> {
        let path = path.into();
        self.read(|state| state.pointer(&path).cloned())
    }

    /// Apply an update and publish the result.
    ///
    /// Subscribers are called once, in registration order, if and only if
    /// the published snapshot differs from the previous one. If the updater
    /// fails or panics nothing is published.
    ///
    /// Called from inside a recipe on the same thread, the update joins the
    /// one in flight: its changes land in the running draft before the
    /// recipe's next draft operation, and everything is published and
    /// announced once. Such a call returns `Ok(())` right away; if the
    /// nested update fails, the outer update returns its error.
    ///
    /// Other threads wait for the store to go idle. A recipe must therefore
    /// never block on another thread that updates the same store: joining
    /// such a thread from inside a recipe deadlocks.
    pub fn update(&self, updater: impl Into<Updater>) -> StoreResult<()> {
        let updater = updater.into();
        updater.validate()?;
        let label = &self.shared.config.label;
        let me = thread::current().id();

        let base = {
            let mut inner = self.shared.lock();
            loop {
                match inner.cycle.as_ref().map(|cycle| cycle.owner) {
                    Some(owner) if owner == me => {
                        if let Some(cycle) = inner.cycle.as_mut() {
                            cycle.deferred.push_back(updater);
                            trace!(store = %label, queued = cycle.deferred.len(), "deferring re-entrant update");
                        }
                        return Ok(());
                    }
                    Some(_) => {
                        inner = self
                            .shared
                            .idle
                            .wait(inner)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    None => break,
                }
            }
            inner.cycle = Some(Cycle {
                owner: me,
                deferred: VecDeque::new(),
                failure: None,
            });
            inner.snapshot.clone()
        };
        let guard = CycleGuard {
            shared: &self.shared,
        };

        let mut working = base.clone();
        if let Err(err) = self.run(&mut working, updater) {
            debug!(store = %label, error = %err, "update failed, snapshot unchanged");
            return Err(err);
        }

        let next = reconcile(&base, working);
        if next.ptr_eq(&base) {
            drop(guard);
            debug!(store = %label, "update produced no changes");
            return Ok(());
        }

        let listeners = {
            let mut inner = self.shared.lock();
            inner.snapshot = next;
            inner.listeners.clone()
        };
        drop(guard);
        debug!(store = %label, subscribers = listeners.len(), "update committed");
        self.notify(&listeners);
        Ok(())
    }

    /// Run the updater, including every nested update it issues.
    fn run(&self, working: &mut Value, updater: Updater) -> StoreResult<()> {
        let mut draft = Draft::in_cycle(working, &self.shared);
        let outcome = draft.update(updater);
        match self.shared.take_failure() {
            Some(err) => Err(err),
            None => outcome,
        }
    }

    fn notify(&self, listeners: &[Listener]) {
        let label = &self.shared.config.label;
        trace!(store = %label, subscribers = listeners.len(), "notifying subscribers");
        match self.shared.config.subscriber_panic {
            SubscriberPanic::Abort => listeners.iter().for_each(Listener::call),
            SubscriberPanic::Deliver => {
                let mut first_panic = None;
                for (position, listener) in listeners.iter().enumerate() {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener.call())) {
                        warn!(store = %label, position, "subscriber panicked, finishing notification pass");
                        first_panic.get_or_insert(payload);
                    }
                }
                if let Some(payload) = first_panic {
                    panic::resume_unwind(payload);
                }
            }
        }
    }

    /// Shallow-merge an object into the root.
    pub fn merge(&self, object: impl Into<Value>) -> StoreResult<()> {
        self.update(Updater::merge(object))
    }

    /// Update by mutating the draft in place.
    pub fn mutate<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<()> + Send + 'static,
    {
        self.update(Updater::mutate(f))
    }

    /// Update with a recipe that may return a replacement for the whole state.
    pub fn produce<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Draft<'_>) -> StoreResult<Option<Value>> + Send + 'static,
    {
        self.update(Updater::produce(f))
    }

    /// Subscribe to state changes.
    ///
    /// The callback runs after every update that changed the state. A
    /// subscriber added while a notification pass is running is first called
    /// on the next change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Listener::new(id, Arc::new(callback));
        let subscription = Subscription::new(&listener, Arc::downgrade(&self.shared));
        self.shared.lock().listeners.push(listener);
        subscription
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().listeners.len()
    }

    /// A view of the state below `path`.
    pub fn store_for(&self, path: impl Into<Path>) -> ScopedStore {
        ScopedStore::new(self.clone(), path.into())
    }

    /// An update function confined to the state below `path`.
    ///
    /// The function takes an [`Updater`] rather than `impl Into<Updater>`,
    /// so plain values need an `.into()`:
    ///
    /// ```
    /// use icebox::{value, Store};
    ///
    /// let store = Store::new(value!({"settings": {}}));
    /// let update_settings = store.updater_for("settings");
    /// update_settings(value!({"theme": "dark"}).into()).unwrap();
    /// assert_eq!(store.get_state()["settings"]["theme"].as_str(), Some("dark"));
    /// ```
    pub fn updater_for(
        &self,
        path: impl Into<Path>,
    ) -> impl Fn(Updater) -> StoreResult<()> + Clone + Send + Sync + 'static {
        let scoped = self.store_for(path);
        move |updater| scoped.update(updater)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.shared.config.label)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
