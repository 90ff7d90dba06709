//! Interaction idle watcher
//!
//! Binds interaction listeners to one target element and turns the end of
//! a stream of interaction into a single idle notification:
//!
//! ```text
//! raw events ──► event-stage debounce ──► pulse ──► idle-stage debounce ──► callbacks
//! ```
//!
//! Focus moving outside the target and the pointer leaving the target
//! bypass both stages and notify immediately. Removal of the target from
//! its parent tears the watcher down.
//!
//! Subscriptions hold the watcher alive until `release`; the debounce
//! stages refer back to it weakly.

use crate::callbacks::{CallbackRegistry, IdleCallback};
use crate::config::WatcherConfig;
use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::lifecycle::RemovalObserver;
use idlewatch_core::{
    Document, EventKind, Host, InteractionEvent, ListenerId, ListenerOptions, ListenerTarget,
    NodeId,
};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Watches one element for the end of user interaction
///
/// Cheap to clone; clones share the same watcher.
#[derive(Clone)]
pub struct InteractionWatcher {
    inner: Arc<Inner>,
}

struct Inner {
    host: Host,
    /// Watched element
    target: NodeId,
    /// Selector given or synthesized from the target's id
    selector: String,
    config: WatcherConfig,
    /// Interaction kinds subscribed on the target, deduplicated
    watched: Vec<EventKind>,
    callbacks: Mutex<CallbackRegistry>,
    /// Absorbs bursts of raw events into pulses
    pulses: Debouncer<InteractionEvent>,
    /// Owns the single pending idle timer
    idle: Debouncer<()>,
    subscriptions: Mutex<Subscriptions>,
    released: AtomicBool,
}

#[derive(Default)]
struct Subscriptions {
    interaction: SmallVec<[ListenerId; 4]>,
    focus: Option<ListenerId>,
    leave: Option<ListenerId>,
    lifecycle: Option<RemovalObserver>,
}

impl InteractionWatcher {
    /// Resolve the target and subscribe to it
    ///
    /// Fails without subscribing anything if the configuration names no
    /// usable target, the target does not resolve to exactly one live
    /// element, or the interactive event list is invalid.
    pub fn new(config: WatcherConfig, host: Host) -> Result<Self, WatchError> {
        let watched = config.watched_events()?;
        let (target, selector) = resolve_target(&config, host.document.as_ref())?;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let owner = weak.clone();
            let pulses = Debouncer::new(
                config.event_window(),
                Arc::clone(&host.scheduler),
                move |event: InteractionEvent| {
                    if let Some(inner) = owner.upgrade() {
                        inner.on_pulse(&event);
                    }
                },
            );

            let owner = weak.clone();
            let idle = Debouncer::new(
                config.callback_window(),
                Arc::clone(&host.scheduler),
                move |()| {
                    if let Some(inner) = owner.upgrade() {
                        inner.on_idle();
                    }
                },
            );

            Inner {
                host,
                target,
                selector,
                config,
                watched,
                callbacks: Mutex::new(CallbackRegistry::new()),
                pulses,
                idle,
                subscriptions: Mutex::new(Subscriptions::default()),
                released: AtomicBool::new(false),
            }
        });

        inner.subscribe();
        info!(
            "Watching {} ({}) for {:?}, idle after {:?} + {:?}",
            inner.selector,
            inner.target,
            inner.watched,
            inner.config.event_window(),
            inner.config.callback_window()
        );

        Ok(Self { inner })
    }

    /// Add `callback` unless it is already registered
    pub fn register(&self, callback: IdleCallback) -> &Self {
        if !self.inner.callbacks.lock().register(callback) {
            trace!("Callback already registered on {}", self.inner.selector);
        }
        self
    }

    /// Cancel pending timers and invoke every callback now with `event`
    pub fn call(&self, event: Option<&InteractionEvent>) -> &Self {
        self.inner.call(event);
        self
    }

    /// Cancel pending timers without invoking callbacks
    pub fn cancel_pending(&self) -> &Self {
        self.inner.cancel_timers();
        self
    }

    /// Remove every subscription and cancel pending timers
    ///
    /// Safe to call more than once. `register` and `call` keep working
    /// afterwards but nothing fires on its own any more.
    pub fn release(&self) -> &Self {
        self.inner.release();
        self
    }

    /// Watched element
    pub fn target(&self) -> NodeId {
        self.inner.target
    }

    /// Selector given or synthesized from the target's id
    pub fn selector(&self) -> &str {
        &self.inner.selector
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.inner.config
    }

    /// Interaction kinds subscribed on the target
    pub fn watched_events(&self) -> &[EventKind] {
        &self.inner.watched
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    /// Whether a pulse or an idle notification is waiting to fire
    pub fn has_pending(&self) -> bool {
        self.inner.pulses.is_pending() || self.inner.idle.is_pending()
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Whether the selector still resolves to exactly the target
    ///
    /// Read-only: a stale selector does not release the watcher.
    pub fn selector_matches(&self) -> bool {
        match self.inner.host.document.query_selector_all(&self.inner.selector) {
            Ok(matches) => matches == [self.inner.target],
            Err(e) => {
                debug!("Selector {} no longer parses: {}", self.inner.selector, e);
                false
            }
        }
    }
}

impl fmt::Debug for InteractionWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionWatcher")
            .field("selector", &self.inner.selector)
            .field("target", &self.inner.target)
            .field("watched", &self.inner.watched)
            .field("callbacks", &self.callback_count())
            .field("released", &self.is_released())
            .finish()
    }
}

impl Inner {
    fn document(&self) -> &Arc<dyn Document> {
        &self.host.document
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn subscribe(self: &Arc<Self>) {
        let document = self.document();
        let target = ListenerTarget::Node(self.target);
        let mut subs = self.subscriptions.lock();

        for &kind in &self.watched {
            let owner = Arc::clone(self);
            let id = document.add_listener(
                target,
                kind,
                ListenerOptions::default(),
                Arc::new(move |event: &InteractionEvent| owner.on_interaction(event)),
            );
            subs.interaction.push(id);
        }

        if self.config.notify_on_focus_loss {
            let owner = Arc::clone(self);
            subs.focus = Some(document.add_listener(
                ListenerTarget::Document,
                EventKind::FocusIn,
                ListenerOptions::CAPTURE,
                Arc::new(move |event: &InteractionEvent| owner.on_focus(event)),
            ));
        }

        if self.config.notify_on_mouse_leave {
            let owner = Arc::clone(self);
            subs.leave = Some(document.add_listener(
                target,
                EventKind::PointerLeave,
                ListenerOptions::default(),
                Arc::new(move |event: &InteractionEvent| owner.on_leave(event)),
            ));
        }

        match document.parent_of(self.target) {
            Some(parent) => {
                let owner = Arc::clone(self);
                subs.lifecycle = Some(RemovalObserver::observe(
                    Arc::clone(document),
                    parent,
                    self.target,
                    move || {
                        info!("{} removed from the document, releasing", owner.selector);
                        owner.release();
                    },
                ));
            }
            None => warn!(
                "{} has no parent; removal will not be detected",
                self.selector
            ),
        }
    }

    fn on_interaction(&self, event: &InteractionEvent) {
        if self.is_released() {
            return;
        }
        trace!("{} on {} at {:?}", event.kind, self.selector, event.timestamp);
        self.pulses.call(event.clone());
    }

    fn on_pulse(&self, event: &InteractionEvent) {
        if self.is_released() {
            return;
        }
        debug!("Interaction pulse ({}) on {}, idle timer restarted", event.kind, self.selector);
        self.idle.call(());
    }

    fn on_idle(&self) {
        if self.is_released() {
            return;
        }
        debug!("{} idle", self.selector);
        self.notify(None);
    }

    fn on_focus(&self, event: &InteractionEvent) {
        if self.is_released() || self.document().contains(self.target, event.target) {
            return;
        }
        debug!("Focus moved from {} to {}", self.selector, event.target);
        self.call(None);
    }

    fn on_leave(&self, event: &InteractionEvent) {
        if self.is_released() {
            return;
        }
        debug!("Pointer left {}", self.selector);
        self.call(Some(event));
    }

    fn call(&self, event: Option<&InteractionEvent>) {
        self.cancel_timers();
        self.notify(event);
    }

    fn cancel_timers(&self) {
        self.pulses.cancel();
        self.idle.cancel();
    }

    fn notify(&self, event: Option<&InteractionEvent>) {
        let callbacks = self.callbacks.lock().snapshot();
        trace!("Notifying {} callbacks for {}", callbacks.len(), self.selector);
        for callback in callbacks {
            callback(event);
        }
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let subs = std::mem::take(&mut *self.subscriptions.lock());
        if let Some(lifecycle) = subs.lifecycle {
            lifecycle.disconnect();
        }

        let document = self.document();
        for id in subs
            .interaction
            .into_iter()
            .chain(subs.focus)
            .chain(subs.leave)
        {
            document.remove_listener(id);
        }

        self.cancel_timers();
        info!("Released watcher on {}", self.selector);
    }
}

/// Pick the target element and its selector
///
/// An element handle wins over a selector. Without a selector one is
/// synthesized from the element's id attribute.
fn resolve_target(config: &WatcherConfig, document: &dyn Document) -> Result<(NodeId, String), WatchError> {
    let selector = config
        .selector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(element) = config.element {
        let id = document.id_of(element).filter(|id| !id.is_empty());
        if !document.is_connected(element) {
            let selector = selector
                .map(str::to_string)
                .or_else(|| id.map(|id| format!("#{id}")))
                .unwrap_or_else(|| element.to_string());
            return Err(WatchError::Resolution { selector, matches: 0 });
        }
        let selector = match (selector, id) {
            (Some(s), _) => s.to_string(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => {
                return Err(WatchError::Configuration(format!(
                    "{element} has no id attribute and no selector was given"
                )))
            }
        };
        return Ok((element, selector));
    }

    let Some(selector) = selector else {
        return Err(WatchError::Configuration(
            "either a selector or an element with an id is required".to_string(),
        ));
    };

    let matches = document.query_selector_all(selector)?;
    match matches.as_slice() {
        [target] => Ok((*target, selector.to_string())),
        _ => Err(WatchError::Resolution {
            selector: selector.to_string(),
            matches: matches.len(),
        }),
    }
}
