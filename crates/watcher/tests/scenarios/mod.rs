//! Scenario tests
//!
//! Each module drives a page through a timed interaction script and checks
//! when notifications arrive.

pub mod immediate_triggers;
pub mod lifecycle;
