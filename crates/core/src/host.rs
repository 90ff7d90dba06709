//! Host capability traits
//!
//! The watcher never touches a global document. Everything it needs from the
//! environment (selector resolution, listener registration, structural change
//! observation, timers) is reached through these traits.

use crate::event::{EventKind, InteractionEvent};
use crate::scheduler::Scheduler;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Handle to an element in a document
///
/// A plain identifier: holding one never keeps the element alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle returned by `Document::add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle returned by `Document::observe_child_list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// A single element
    Node(NodeId),
    /// The whole document
    Document,
}

/// Listener registration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Run during the capture phase, before target and bubbling listeners
    pub capture: bool,
}

impl ListenerOptions {
    pub const CAPTURE: ListenerOptions = ListenerOptions { capture: true };
}

/// Event listener callback
pub type Listener = Arc<dyn Fn(&InteractionEvent) + Send + Sync>;

/// One structural change to a parent's child list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node whose child list changed
    pub parent: NodeId,
    /// Children appended
    pub added: Vec<NodeId>,
    /// Children removed
    pub removed: Vec<NodeId>,
}

/// Child-list observer callback
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// DOM-like document capability
///
/// Implementations must not hold internal locks while invoking listeners or
/// observers: callbacks are free to call back into the document.
pub trait Document: Send + Sync {
    /// All elements matching `selector`, in document order
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// Value of the element's id attribute
    fn id_of(&self, node: NodeId) -> Option<String>;

    /// Parent element, `None` for the root or detached nodes
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Whether `node` is attached to the document tree
    fn is_connected(&self, node: NodeId) -> bool;

    /// Subscribe `listener` to `kind` events on `target`
    fn add_listener(
        &self,
        target: ListenerTarget,
        kind: EventKind,
        options: ListenerOptions,
        listener: Listener,
    ) -> ListenerId;

    /// Unsubscribe a listener. Returns false if it was already removed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Observe additions and removals among `parent`'s direct children
    fn observe_child_list(&self, parent: NodeId, callback: MutationCallback) -> ObserverId;

    /// Stop an observation. Returns false if it was already disconnected.
    fn disconnect(&self, id: ObserverId) -> bool;
}

/// Capabilities a watcher is constructed with
#[derive(Clone)]
pub struct Host {
    pub document: Arc<dyn Document>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl Host {
    pub fn new(document: Arc<dyn Document>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            document,
            scheduler,
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
