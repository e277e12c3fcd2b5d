use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::store::Shared;

pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

/// A registered subscriber as kept by the store.
#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: usize,
    active: Arc<AtomicBool>,
    callback: Callback,
}

impl Listener {
    pub(crate) fn new(id: usize, callback: Callback) -> Self {
        Self {
            id,
            active: Arc::new(AtomicBool::new(true)),
            callback,
        }
    }

    /// Invoke unless it was unsubscribed earlier in the same pass.
    pub(crate) fn call(&self) {
        if self.active.load(Ordering::Acquire) {
            (self.callback)();
        }
    }
}

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Dropping the handle keeps the subscriber registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: usize,
    active: Arc<AtomicBool>,
    shared: Weak<Shared>,
}

impl Subscription {
    pub(crate) fn new(listener: &Listener, shared: Weak<Shared>) -> Self {
        Self {
            id: listener.id,
            active: Arc::clone(&listener.active),
            shared,
        }
    }

    /// Remove the subscriber. Calling this more than once is a no-op.
    ///
    /// Inside a notification pass the subscriber is skipped if it has not
    /// run yet; everyone else in the pass is unaffected.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_listener(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
