//! Watcher configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! selector = "#editor"
//! event_debounce_ms = 500
//! callback_debounce_ms = 1000
//! notify_on_focus_loss = false
//! notify_on_mouse_leave = true
//! interactive_events = ["mousemove", "keydown", "click", "change"]
//! ```
//!
//! The camelCase option names (`eventDebounceTimeout`, `notifyOnFocusLoss`,
//! ...) are accepted as aliases.

use crate::error::WatchError;
use anyhow::{Context, Result};
use idlewatch_core::{EventKind, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default burst-coalescing window for raw interaction events
pub const DEFAULT_EVENT_DEBOUNCE_MS: u64 = 500;

/// Default idle window before callbacks fire
pub const DEFAULT_CALLBACK_DEBOUNCE_MS: u64 = 1000;

/// Watcher construction options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// CSS selector identifying the target
    pub selector: Option<String>,

    /// Direct target handle; wins over `selector`
    #[serde(skip)]
    pub element: Option<NodeId>,

    /// Burst-coalescing window for raw interaction events (ms)
    #[serde(alias = "eventDebounceTimeout")]
    pub event_debounce_ms: u64,

    /// Idle window before firing callbacks (ms)
    #[serde(alias = "callbackDebounceTimeout")]
    pub callback_debounce_ms: u64,

    /// Fire immediately when focus moves outside the target
    #[serde(alias = "notifyOnFocusLoss")]
    pub notify_on_focus_loss: bool,

    /// Fire immediately when the pointer leaves the target
    #[serde(alias = "notifyOnMouseLeave")]
    pub notify_on_mouse_leave: bool,

    /// Event kinds that count as interaction
    #[serde(alias = "interactiveEvents")]
    pub interactive_events: Vec<EventKind>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            selector: None,
            element: None,
            event_debounce_ms: DEFAULT_EVENT_DEBOUNCE_MS,
            callback_debounce_ms: DEFAULT_CALLBACK_DEBOUNCE_MS,
            notify_on_focus_loss: false,
            notify_on_mouse_leave: true,
            interactive_events: EventKind::DEFAULT_INTERACTIVE.to_vec(),
        }
    }
}

impl WatcherConfig {
    /// Default options targeting `selector`
    pub fn for_selector(selector: impl Into<String>) -> Self {
        Self::default().with_selector(selector)
    }

    /// Default options targeting `element`
    pub fn for_element(element: NodeId) -> Self {
        Self::default().with_element(element)
    }

    /// Parse from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse watcher configuration")
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read watcher config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse watcher config {}", path.display()))
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize watcher configuration")
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_element(mut self, element: NodeId) -> Self {
        self.element = Some(element);
        self
    }

    /// Event-stage window, rounded up to whole milliseconds
    pub fn event_debounce(mut self, window: Duration) -> Self {
        self.event_debounce_ms = ceil_millis(window);
        self
    }

    /// Idle-stage window, rounded up to whole milliseconds
    pub fn callback_debounce(mut self, window: Duration) -> Self {
        self.callback_debounce_ms = ceil_millis(window);
        self
    }

    pub fn notify_on_focus_loss(mut self, enabled: bool) -> Self {
        self.notify_on_focus_loss = enabled;
        self
    }

    pub fn notify_on_mouse_leave(mut self, enabled: bool) -> Self {
        self.notify_on_mouse_leave = enabled;
        self
    }

    pub fn interactive_events(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.interactive_events = kinds.into_iter().collect();
        self
    }

    /// Set the interactive events from DOM event names
    pub fn with_event_names(self, names: &[&str]) -> std::result::Result<Self, WatchError> {
        let kinds = names
            .iter()
            .map(|name| name.parse::<EventKind>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self.interactive_events(kinds))
    }

    /// Event-stage window
    pub fn event_window(&self) -> Duration {
        Duration::from_millis(self.event_debounce_ms)
    }

    /// Idle-stage window
    pub fn callback_window(&self) -> Duration {
        Duration::from_millis(self.callback_debounce_ms)
    }

    /// Interactive kinds with duplicates removed, first occurrence kept
    ///
    /// Auxiliary kinds (`mouseleave`, `focusin`) are rejected: they drive
    /// immediate notification through their own flags.
    pub fn watched_events(&self) -> std::result::Result<Vec<EventKind>, WatchError> {
        let mut kinds = Vec::with_capacity(self.interactive_events.len());
        for &kind in &self.interactive_events {
            if !kind.is_interaction() {
                return Err(WatchError::InvalidArgument(format!(
                    "{kind} is not an interaction event"
                )));
            }
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

fn ceil_millis(window: Duration) -> u64 {
    u64::try_from(window.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}
