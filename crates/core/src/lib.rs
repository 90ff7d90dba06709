//! Host capabilities for idle watching
//!
//! This crate provides:
//! - The event model (`EventKind`, `InteractionEvent`)
//! - Host capability traits (`Document`, `Scheduler`)
//! - An in-memory element tree (`VirtualDocument`)
//! - Schedulers: manual virtual time (`VirtualClock`) and tokio-backed (`TokioScheduler`)

pub mod dom;
pub mod error;
pub mod event;
pub mod host;
pub mod scheduler;

// Re-exports
pub use dom::VirtualDocument;
pub use error::HostError;
pub use event::{EventKind, InteractionEvent};
pub use host::{
    Document, Host, Listener, ListenerId, ListenerOptions, ListenerTarget, MutationCallback,
    MutationRecord, NodeId, ObserverId,
};
pub use scheduler::{Scheduler, Task, TimerId, TokioScheduler, VirtualClock};

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;
