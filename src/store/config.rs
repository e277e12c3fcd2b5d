use serde::{Deserialize, Serialize};

/// What a notification pass does when a subscriber panics.
///
/// The policy is store-wide; a panic is never swallowed under either one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberPanic {
    /// Unwind out of `update` at once. Later subscribers miss this change.
    #[default]
    Abort,
    /// Run every remaining subscriber, then resume the first panic.
    Deliver,
}

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name attached to the store's log events.
    pub label: String,

    /// Panic policy for notification passes.
    pub subscriber_panic: SubscriberPanic,
}

impl StoreConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_subscriber_panic(mut self, policy: SubscriberPanic) -> Self {
        self.subscriber_panic = policy;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: "store".to_string(),
            subscriber_panic: SubscriberPanic::Abort,
        }
    }
}
