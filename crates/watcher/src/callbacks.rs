//! Idle callback registry

use idlewatch_core::InteractionEvent;
use std::sync::Arc;

/// Callback invoked when the watched element goes idle
///
/// Receives the triggering event for immediate notifications (mouse leave,
/// explicit `call` with an event) and `None` for idle-timer and focus-loss
/// notifications.
pub type IdleCallback = Arc<dyn Fn(Option<&InteractionEvent>) + Send + Sync>;

/// Wrap a closure as an `IdleCallback`
///
/// Registration deduplicates on the identity of the returned value, so keep
/// it (or a clone of it) to register the same callback elsewhere.
pub fn callback<F>(f: F) -> IdleCallback
where
    F: Fn(Option<&InteractionEvent>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered set of callbacks keyed by identity
#[derive(Default, Clone)]
pub struct CallbackRegistry {
    callbacks: Vec<IdleCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` unless it is already registered
    ///
    /// Returns true if it was added.
    pub fn register(&mut self, callback: IdleCallback) -> bool {
        if self.contains(&callback) {
            return false;
        }
        self.callbacks.push(callback);
        true
    }

    /// Whether this exact callback is registered
    pub fn contains(&self, callback: &IdleCallback) -> bool {
        self.callbacks.iter().any(|c| same_callback(c, callback))
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Callbacks in registration order
    ///
    /// Callers take a snapshot and invoke outside any lock.
    pub fn snapshot(&self) -> Vec<IdleCallback> {
        self.callbacks.clone()
    }
}

/// Identity comparison on the data pointer only
fn same_callback(a: &IdleCallback, b: &IdleCallback) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
