//! Utility functions module
//!
//! Process-wide plumbing: logging setup and termination signals.

pub mod logging;
pub mod signals;

// Re-export main functions
pub use logging::init_tracing;
pub use signals::{ShutdownSignals, Termination};
