//! Scripted page on virtual time
//!
//! A small document driven by a `VirtualClock`, plus a callback recorder
//! that notes when each notification happened and what event it carried.

use idlewatch::{callback, IdleCallback, InteractionWatcher, WatcherConfig};
use idlewatch_core::{EventKind, Host, NodeId, Scheduler, VirtualClock, VirtualDocument};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Route watcher logs to the test output; first caller wins
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Layout:
///
/// ```text
/// body
/// ├── section#main
/// │   └── form#compose.card
/// │       ├── textarea#editor
/// │       └── button#send
/// └── input#search
/// ```
pub struct Page {
    pub clock: Arc<VirtualClock>,
    pub doc: Arc<VirtualDocument>,
    pub host: Host,
    pub main: NodeId,
    pub form: NodeId,
    pub editor: NodeId,
    pub send: NodeId,
    pub search: NodeId,
}

impl Page {
    pub fn new() -> Self {
        init_tracing();
        let clock = Arc::new(VirtualClock::new());
        let doc = Arc::new(VirtualDocument::new().with_clock(Arc::clone(&clock)));
        let root = doc.root();

        let main = doc.append_element(root, "section", Some("main")).unwrap();
        let form = doc.append_element(main, "form", Some("compose")).unwrap();
        doc.add_class(form, "card").unwrap();
        let editor = doc.append_element(form, "textarea", Some("editor")).unwrap();
        let send = doc.append_element(form, "button", Some("send")).unwrap();
        let search = doc.append_element(root, "input", Some("search")).unwrap();

        let host = Host::new(doc.clone(), clock.clone() as Arc<dyn Scheduler>);
        Self {
            clock,
            doc,
            host,
            main,
            form,
            editor,
            send,
            search,
        }
    }

    /// Watcher on `#compose` with the given windows
    pub fn watch_form(&self, event_ms: u64, callback_ms: u64) -> InteractionWatcher {
        self.watcher(
            WatcherConfig::for_selector("#compose")
                .event_debounce(ms(event_ms))
                .callback_debounce(ms(callback_ms)),
        )
    }

    pub fn watcher(&self, config: WatcherConfig) -> InteractionWatcher {
        InteractionWatcher::new(config, self.host.clone()).unwrap()
    }

    pub fn fire(&self, node: NodeId, kind: EventKind) {
        self.doc.dispatch(node, kind).unwrap();
    }

    pub fn click(&self, node: NodeId) {
        self.fire(node, EventKind::Click);
    }

    /// Advance virtual time to `t` ms
    pub fn at(&self, t: u64) -> &Self {
        self.clock.advance_to(ms(t));
        self
    }

    /// Advance virtual time by `d` ms
    pub fn wait(&self, d: u64) -> &Self {
        self.clock.advance(ms(d));
        self
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Virtual time of the notification
    pub at: Duration,
    /// Kind of the forwarded event, if any
    pub event: Option<EventKind>,
}

/// Records notifications through a single `IdleCallback`
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    callback: IdleCallback,
}

impl Recorder {
    pub fn new(clock: &Arc<VirtualClock>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let clock = Arc::clone(clock);
        let callback = callback(move |event| {
            sink.lock().push(Call {
                at: clock.now(),
                event: event.map(|e| e.kind),
            });
        });
        Self { calls, callback }
    }

    /// The recorder's callback; every clone has the same identity
    pub fn callback(&self) -> IdleCallback {
        Arc::clone(&self.callback)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Times of every notification
    pub fn times(&self) -> Vec<Duration> {
        self.calls.lock().iter().map(|c| c.at).collect()
    }
}
