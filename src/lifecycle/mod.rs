//! Lifecycle module
//!
//! Startup, the wait for a termination request, and the bounded shutdown
//! sequence that follows it.

pub mod coordinator;
pub mod phase;

// Re-export main types
pub use coordinator::Coordinator;
pub use phase::{Phase, ShutdownKind, ShutdownReport};
