//! In-memory document
//!
//! `VirtualDocument` is a small element tree implementing the `Document`
//! capability: selector queries, listener registration with capture and
//! bubbling, child-list observation and focus tracking. Events are
//! dispatched explicitly, which makes interaction sequences scriptable.

use crate::error::HostError;
use crate::event::{EventKind, InteractionEvent};
use crate::host::{
    Document, Listener, ListenerId, ListenerOptions, ListenerTarget, MutationCallback,
    MutationRecord, NodeId, ObserverId,
};
use crate::scheduler::VirtualClock;
use crate::Result;
use ahash::AHashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// In-memory element tree
pub struct VirtualDocument {
    state: Mutex<DomState>,
    /// Time source for event timestamps
    clock: Option<Arc<VirtualClock>>,
}

struct Element {
    /// Lowercase tag name
    tag: String,
    /// id attribute
    id: Option<String>,
    /// class list
    classes: SmallVec<[String; 2]>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Registered {
    id: ListenerId,
    target: ListenerTarget,
    kind: EventKind,
    capture: bool,
    listener: Listener,
}

struct DomState {
    nodes: AHashMap<NodeId, Element>,
    /// Document element
    root: NodeId,
    /// Element holding focus
    active: Option<NodeId>,
    /// Listeners in registration order
    listeners: Vec<Registered>,
    /// Child-list observers in registration order
    observers: Vec<(ObserverId, NodeId, MutationCallback)>,
    next_node: u64,
    next_listener: u64,
    next_observer: u64,
}

impl VirtualDocument {
    /// Create a document holding a single `body` root element
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = AHashMap::new();
        nodes.insert(root, Element::new("body"));

        Self {
            state: Mutex::new(DomState {
                nodes,
                root,
                active: None,
                listeners: Vec::new(),
                observers: Vec::new(),
                next_node: 1,
                next_listener: 1,
                next_observer: 1,
            }),
            clock: None,
        }
    }

    /// Stamp dispatched events with `clock`'s current time
    pub fn with_clock(mut self, clock: Arc<VirtualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The document element
    pub fn root(&self) -> NodeId {
        self.state.lock().root
    }

    /// Element currently holding focus
    pub fn active_element(&self) -> Option<NodeId> {
        self.state.lock().active
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut state = self.state.lock();
        let node = NodeId(state.next_node);
        state.next_node += 1;
        state.nodes.insert(node, Element::new(tag));
        node
    }

    /// Create an element, give it an optional id and append it to `parent`
    pub fn append_element(&self, parent: NodeId, tag: &str, id: Option<&str>) -> Result<NodeId> {
        let node = self.create_element(tag);
        if let Some(id) = id {
            self.set_id(node, id)?;
        }
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Set the id attribute
    pub fn set_id(&self, node: NodeId, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.element_mut(node)?.id = Some(id.to_string());
        Ok(())
    }

    /// Add a class to the class list
    pub fn add_class(&self, node: NodeId, class: &str) -> Result<()> {
        let mut state = self.state.lock();
        let element = state.element_mut(node)?;
        if !element.classes.iter().any(|c| c == class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Children of `node` in order
    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let state = self.state.lock();
        Ok(state.element(node)?.children.clone())
    }

    /// Append `child` as the last child of `parent`
    ///
    /// A child that already has a parent is moved: its old parent's
    /// observers see a removal, the new parent's observers an addition.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut records = Vec::new();
        let notify = {
            let mut state = self.state.lock();
            state.element(parent)?;
            state.element(child)?;
            if state.contains(child, parent) {
                return Err(HostError::HierarchyRequest { parent, child });
            }

            let old_parent = state.element(child)?.parent;
            if let Some(old_parent) = old_parent {
                state.detach(old_parent, child)?;
                records.push(MutationRecord {
                    parent: old_parent,
                    added: Vec::new(),
                    removed: vec![child],
                });
            }

            state.element_mut(parent)?.children.push(child);
            state.element_mut(child)?.parent = Some(parent);
            records.push(MutationRecord {
                parent,
                added: vec![child],
                removed: Vec::new(),
            });

            state.observers_for(&records)
        };

        trace!("Appended {} to {}", child, parent);
        deliver(notify);
        Ok(())
    }

    /// Remove `child` from `parent`
    ///
    /// The removed subtree stays valid as a detached tree. Focus inside it
    /// is cleared.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let notify = {
            let mut state = self.state.lock();
            state.element(parent)?;
            state.element(child)?;
            state.detach(parent, child)?;

            let active = state.active;
            if active.is_some_and(|node| state.contains(child, node)) {
                state.active = None;
            }

            let records = [MutationRecord {
                parent,
                added: Vec::new(),
                removed: vec![child],
            }];
            state.observers_for(&records)
        };

        trace!("Removed {} from {}", child, parent);
        deliver(notify);
        Ok(())
    }

    /// Dispatch an event of `kind` on `node`
    ///
    /// Listener order: capture listeners on the document, then capture
    /// listeners from the root down to `node`, then non-capture listeners on
    /// `node`; for bubbling kinds, non-capture listeners on each ancestor up
    /// to the root and finally on the document. Events on detached nodes
    /// never reach document listeners.
    pub fn dispatch(&self, node: NodeId, kind: EventKind) -> Result<InteractionEvent> {
        let event = InteractionEvent::new(kind, node, self.timestamp());

        let listeners = {
            let state = self.state.lock();
            state.element(node)?;
            state.propagation_path(node, kind)
        };

        trace!("Dispatching {} on {} to {} listeners", kind, node, listeners.len());
        for listener in listeners {
            listener(&event);
        }
        Ok(event)
    }

    /// Move focus to `node` and dispatch `focusin` on it
    ///
    /// Focusing the element that already holds focus dispatches nothing and
    /// returns `None`.
    pub fn focus(&self, node: NodeId) -> Result<Option<InteractionEvent>> {
        {
            let mut state = self.state.lock();
            state.element(node)?;
            if state.active == Some(node) {
                return Ok(None);
            }
            state.active = Some(node);
        }
        self.dispatch(node, EventKind::FocusIn).map(Some)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Number of active child-list observers
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    fn timestamp(&self) -> Duration {
        self.clock
            .as_ref()
            .map(|clock| clock.now())
            .unwrap_or_default()
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: SmallVec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl DomState {
    fn element(&self, node: NodeId) -> Result<&Element> {
        self.nodes.get(&node).ok_or(HostError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element> {
        self.nodes.get_mut(&node).ok_or(HostError::UnknownNode(node))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|e| e.parent)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node) && self.contains(self.root, node)
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let children = &mut self.element_mut(parent)?.children;
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return Err(HostError::NotAChild { parent, child });
        };
        children.remove(pos);
        self.element_mut(child)?.parent = None;
        Ok(())
    }

    /// Observer callbacks to run for `records`, paired with their records
    fn observers_for(&self, records: &[MutationRecord]) -> Vec<(MutationCallback, Vec<MutationRecord>)> {
        self.observers
            .iter()
            .filter_map(|(_, observed, callback)| {
                let matching: Vec<MutationRecord> = records
                    .iter()
                    .filter(|r| r.parent == *observed)
                    .cloned()
                    .collect();
                (!matching.is_empty()).then(|| (Arc::clone(callback), matching))
            })
            .collect()
    }

    fn listeners_on(&self, target: ListenerTarget, kind: EventKind, capture: bool) -> impl Iterator<Item = Listener> + '_ {
        self.listeners
            .iter()
            .filter(move |r| r.target == target && r.kind == kind && r.capture == capture)
            .map(|r| Arc::clone(&r.listener))
    }

    fn propagation_path(&self, node: NodeId, kind: EventKind) -> Vec<Listener> {
        // Ancestors from node up to its root
        let mut ancestry = vec![node];
        while let Some(parent) = self.parent(*ancestry.last().unwrap_or(&node)) {
            ancestry.push(parent);
        }
        let connected = self.is_connected(node);

        let mut path = Vec::new();
        if connected {
            path.extend(self.listeners_on(ListenerTarget::Document, kind, true));
        }
        for &n in ancestry.iter().rev() {
            path.extend(self.listeners_on(ListenerTarget::Node(n), kind, true));
        }

        path.extend(self.listeners_on(ListenerTarget::Node(node), kind, false));
        if kind.bubbles() {
            for &n in ancestry.iter().skip(1) {
                path.extend(self.listeners_on(ListenerTarget::Node(n), kind, false));
            }
            if connected {
                path.extend(self.listeners_on(ListenerTarget::Document, kind, false));
            }
        }
        path
    }

    /// Matching connected nodes in document order
    fn query(&self, chain: &[Compound]) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if self.matches_chain(node, chain) {
                found.push(node);
            }
            if let Some(element) = self.nodes.get(&node) {
                stack.extend(element.children.iter().rev());
            }
        }
        found
    }

    fn matches_chain(&self, node: NodeId, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }

        // Descendant combinators only: nearest matching ancestor is always a valid choice
        let mut current = self.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current else {
                    return false;
                };
                current = self.parent(candidate);
                if self.matches_compound(candidate, compound) {
                    break;
                }
            }
        }
        true
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(element) = self.nodes.get(&node) else {
            return false;
        };
        if let Some(tag) = &compound.tag {
            if *tag != element.tag {
                return false;
            }
        }
        if let Some(id) = &compound.id {
            if element.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        compound
            .classes
            .iter()
            .all(|class| element.classes.iter().any(|c| c == class))
    }
}

fn deliver(notify: Vec<(MutationCallback, Vec<MutationRecord>)>) {
    for (callback, records) in notify {
        callback(&records);
    }
}

/// One compound selector: optional tag, optional id, any number of classes
#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// Parse a descendant-combinator chain of compound selectors
fn parse_selector(selector: &str) -> Result<Vec<Compound>> {
    let invalid = |reason: &str| HostError::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    let chain = selector
        .split_whitespace()
        .map(|token| parse_compound(token).map_err(|reason| invalid(&reason)))
        .collect::<Result<Vec<_>>>()?;

    if chain.is_empty() {
        return Err(invalid("empty selector"));
    }
    Ok(chain)
}

fn parse_compound(token: &str) -> std::result::Result<Compound, String> {
    let mut compound = Compound::default();
    let mut rest = token;

    if let Some(stripped) = rest.strip_prefix('*') {
        rest = stripped;
    } else {
        let (tag, remainder) = split_ident(rest);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = remainder;
    }

    while let Some(sigil) = rest.chars().next() {
        let (name, remainder) = split_ident(&rest[sigil.len_utf8()..]);
        if name.is_empty() {
            return Err(format!("expected a name after {sigil:?} in {token:?}"));
        }
        match sigil {
            '#' if compound.id.is_none() => compound.id = Some(name.to_string()),
            '#' => return Err(format!("more than one id in {token:?}")),
            '.' => compound.classes.push(name.to_string()),
            other => return Err(format!("unsupported character {other:?} in {token:?}")),
        }
        rest = remainder;
    }

    Ok(compound)
}

/// Split a leading identifier (`[A-Za-z0-9_-]*`) off `s`
fn split_ident(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(end)
}

impl Document for VirtualDocument {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let chain = parse_selector(selector)?;
        Ok(self.state.lock().query(&chain))
    }

    fn id_of(&self, node: NodeId) -> Option<String> {
        self.state.lock().nodes.get(&node).and_then(|e| e.id.clone())
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.state.lock().parent(node)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.state.lock().contains(ancestor, node)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.state.lock().is_connected(node)
    }

    fn add_listener(
        &self,
        target: ListenerTarget,
        kind: EventKind,
        options: ListenerOptions,
        listener: Listener,
    ) -> ListenerId {
        let mut state = self.state.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push(Registered {
            id,
            target,
            kind,
            capture: options.capture,
            listener,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|r| r.id != id);
        state.listeners.len() != before
    }

    fn observe_child_list(&self, parent: NodeId, callback: MutationCallback) -> ObserverId {
        let mut state = self.state.lock();
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        state.observers.push((id, parent, callback));
        id
    }

    fn disconnect(&self, id: ObserverId) -> bool {
        let mut state = self.state.lock();
        let before = state.observers.len();
        state.observers.retain(|(observer, _, _)| *observer != id);
        state.observers.len() != before
    }
}
