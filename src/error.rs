//! Error types for the service lifecycle

use std::io;

use thiserror::Error;

/// Terminal errors. Every variant ends the process with a non-zero status.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("failed to bind listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("http listener failed: {0}")]
    Serve(#[source] io::Error),

    #[error("http listener exited without reporting a result")]
    ListenerExited,

    #[error("could not stop http listener: {0}")]
    ForceClose(String),
}

impl LifecycleError {
    /// Whether the error came from the listener rather than from startup
    pub fn is_listener_failure(&self) -> bool {
        matches!(
            self,
            LifecycleError::Bind { .. } | LifecycleError::Serve(_) | LifecycleError::ListenerExited
        )
    }
}
