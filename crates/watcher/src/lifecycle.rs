//! Target removal detection
//!
//! Observes the target's parent and runs a teardown hook once the target
//! shows up among the removed children. Removal through any other route
//! (an ancestor further up being detached) is not seen here.

use idlewatch_core::{Document, MutationRecord, NodeId, ObserverId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Child-list observation on a target's parent
pub struct RemovalObserver {
    document: Arc<dyn Document>,
    /// Observed parent
    parent: NodeId,
    /// Active observation, `None` once disconnected
    observer: Mutex<Option<ObserverId>>,
}

impl RemovalObserver {
    /// Watch `parent` for removal of `target`
    ///
    /// `on_removed` runs at most once.
    pub fn observe<F>(document: Arc<dyn Document>, parent: NodeId, target: NodeId, on_removed: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let fired = AtomicBool::new(false);
        let id = document.observe_child_list(
            parent,
            Arc::new(move |records: &[MutationRecord]| {
                let removed = records.iter().any(|r| r.removed.contains(&target));
                if removed && !fired.swap(true, Ordering::SeqCst) {
                    debug!("Target {} removed from {}", target, parent);
                    on_removed();
                }
            }),
        );

        Self {
            document,
            parent,
            observer: Mutex::new(Some(id)),
        }
    }

    /// The observed parent
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Whether the observation is still active
    pub fn is_connected(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// Stop observing. Safe to call more than once.
    pub fn disconnect(&self) {
        let id = self.observer.lock().take();
        if let Some(id) = id {
            self.document.disconnect(id);
        }
    }
}
