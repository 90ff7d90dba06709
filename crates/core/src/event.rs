//! Interaction event model

use crate::error::HostError;
use crate::host::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Kind of event delivered by the document
///
/// Serialized as the DOM event name (`"mousemove"`, `"keydown"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Pointer moved over the element
    #[serde(rename = "mousemove")]
    PointerMove,
    /// Alphanumeric key press
    #[serde(rename = "keypress")]
    KeyPress,
    /// Any key pressed down
    #[serde(rename = "keydown")]
    KeyDown,
    /// Pointer click
    #[serde(rename = "click")]
    Click,
    /// Form control value committed
    #[serde(rename = "change")]
    Change,
    /// Pointer left the element
    #[serde(rename = "mouseleave")]
    PointerLeave,
    /// Focus moved to a node
    #[serde(rename = "focusin")]
    FocusIn,
}

impl EventKind {
    /// Every kind, interaction kinds first
    pub const ALL: [EventKind; 7] = [
        EventKind::PointerMove,
        EventKind::KeyPress,
        EventKind::KeyDown,
        EventKind::Click,
        EventKind::Change,
        EventKind::PointerLeave,
        EventKind::FocusIn,
    ];

    /// Default set of kinds that count as user interaction
    pub const DEFAULT_INTERACTIVE: [EventKind; 4] = [
        EventKind::PointerMove,
        EventKind::KeyDown,
        EventKind::Click,
        EventKind::Change,
    ];

    /// DOM event name
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PointerMove => "mousemove",
            EventKind::KeyPress => "keypress",
            EventKind::KeyDown => "keydown",
            EventKind::Click => "click",
            EventKind::Change => "change",
            EventKind::PointerLeave => "mouseleave",
            EventKind::FocusIn => "focusin",
        }
    }

    /// Whether this kind counts as user interaction with an element
    ///
    /// `PointerLeave` and `FocusIn` are auxiliary: they trigger immediate
    /// notification, never the idle timer.
    pub fn is_interaction(self) -> bool {
        !matches!(self, EventKind::PointerLeave | EventKind::FocusIn)
    }

    /// Whether the event propagates from the target up through its ancestors
    pub fn bubbles(self) -> bool {
        self != EventKind::PointerLeave
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| HostError::UnknownEventKind(s.to_string()))
    }
}

/// A single event delivered to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    /// Kind of event
    pub kind: EventKind,
    /// Node the event was dispatched on
    pub target: NodeId,
    /// Host time at dispatch
    pub timestamp: Duration,
}

impl InteractionEvent {
    pub fn new(kind: EventKind, target: NodeId, timestamp: Duration) -> Self {
        Self {
            kind,
            target,
            timestamp,
        }
    }
}
