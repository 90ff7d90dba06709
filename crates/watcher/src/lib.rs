//! Interaction idle watching
//!
//! This crate provides:
//! - A debounce primitive with optional leading invocation
//! - `InteractionWatcher`: two chained debounce stages turning bursts of
//!   interaction on one element into a single idle notification
//! - Immediate notification on focus loss and pointer leave
//! - Automatic teardown when the element is removed from its parent
//!
//! Host access (selector resolution, listeners, structural observation,
//! timers) is injected through `idlewatch_core::Host`.
//!
//! ```no_run
//! use idlewatch::{callback, watch, WatcherConfig};
//! use idlewatch_core::{Host, VirtualClock, VirtualDocument};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(VirtualClock::new());
//! let doc = Arc::new(VirtualDocument::new());
//! doc.append_element(doc.root(), "textarea", Some("editor")).unwrap();
//!
//! let watcher = watch(
//!     WatcherConfig::for_selector("#editor"),
//!     Host::new(doc, clock),
//!     callback(|_| println!("editor idle")),
//! )
//! .unwrap();
//! # watcher.release();
//! ```

pub mod callbacks;
pub mod config;
pub mod debounce;
pub mod error;
pub mod lifecycle;
pub mod watcher;

// Re-exports
pub use callbacks::{callback, CallbackRegistry, IdleCallback};
pub use config::WatcherConfig;
pub use debounce::Debouncer;
pub use error::WatchError;
pub use lifecycle::RemovalObserver;
pub use watcher::InteractionWatcher;

use idlewatch_core::Host;

/// Build a watcher and register `callback` on it
pub fn watch(config: WatcherConfig, host: Host, callback: IdleCallback) -> Result<InteractionWatcher, WatchError> {
    let watcher = InteractionWatcher::new(config, host)?;
    watcher.register(callback);
    Ok(watcher)
}
