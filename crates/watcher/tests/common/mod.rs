//! Common utilities for integration tests

#![allow(dead_code)]

pub mod page;

// Re-export commonly used items
pub use page::{ms, Call, Page, Recorder};
