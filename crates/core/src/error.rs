//! Host error types

use crate::host::NodeId;
use thiserror::Error;

/// Errors raised by host capabilities
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Event name does not map to a known `EventKind`
    #[error("unknown event kind: {0:?}")]
    UnknownEventKind(String),

    /// Selector could not be parsed
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Node handle does not belong to this document
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// `child` is not a direct child of `parent`
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Insertion would make a node its own ancestor
    #[error("cannot insert {child} under its own descendant {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// No tokio runtime is available on the current thread
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}
