//! Orders - service entry point
//!
//! Brings up structured logging and an optional HTTP listener, waits for
//! SIGINT or SIGTERM, then shuts the listener down within a grace period,
//! forcing it closed when in-flight requests take too long.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::LifecycleError;
pub use lifecycle::{Coordinator, Phase, ShutdownKind, ShutdownReport};
pub use utils::signals::{ShutdownSignals, Termination};
