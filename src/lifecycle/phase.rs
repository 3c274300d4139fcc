//! Lifecycle phases and shutdown outcomes

use std::{fmt, net::SocketAddr, time::Duration};

use crate::utils::Termination;

/// Where the coordinator is in its lifecycle.
///
/// ```text
/// Starting -> Serving -> ShuttingDownGraceful -> Stopped
///                |                |
///                |                +-> ShuttingDownForced -> Stopped | FatalError
///                +-> FatalError
/// ```
///
/// `Starting` also goes straight to `FatalError` when the bind fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Starting,
    /// `local_addr` is `None` when running without a listener
    Serving { local_addr: Option<SocketAddr> },
    ShuttingDownGraceful,
    ShuttingDownForced,
    Stopped,
    FatalError,
}

impl Phase {
    /// Whether the phase ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Stopped | Phase::FatalError)
    }

    /// Whether the phase belongs to the shutdown sequence
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Phase::ShuttingDownGraceful | Phase::ShuttingDownForced)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Starting => "starting",
            Phase::Serving { .. } => "serving",
            Phase::ShuttingDownGraceful => "shutting_down_graceful",
            Phase::ShuttingDownForced => "shutting_down_forced",
            Phase::Stopped => "stopped",
            Phase::FatalError => "fatal_error",
        };
        f.write_str(name)
    }
}

/// How the listener was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    /// In-flight requests finished within the grace period
    Graceful,
    /// The grace period ran out and connections were aborted
    Forced,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub termination: Termination,
    pub kind: ShutdownKind,
    /// Time from receiving the termination request to the listener being closed
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn is_graceful(&self) -> bool {
        self.kind == ShutdownKind::Graceful
    }
}
