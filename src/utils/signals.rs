//! Signal handling for graceful shutdown

use std::{fmt, io};

use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use tracing::{debug, info};

/// The termination request that started shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl Termination {
    /// Map a raw signal number to a termination request
    pub fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGINT => Some(Termination::Interrupt),
            SIGTERM => Some(Termination::Terminate),
            _ => None,
        }
    }

    /// Conventional signal name
    pub fn name(&self) -> &'static str {
        match self {
            Termination::Interrupt => "SIGINT",
            Termination::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registered SIGINT/SIGTERM stream.
///
/// Registration happens in [`ShutdownSignals::register`], so a signal that
/// arrives before anyone awaits [`ShutdownSignals::recv`] is queued rather
/// than lost. While this value is alive the default "terminate the process"
/// action is replaced, which turns repeated deliveries during shutdown into
/// no-ops.
pub struct ShutdownSignals {
    signals: Signals,
    handle: Handle,
}

impl ShutdownSignals {
    /// Register interest in SIGTERM and SIGINT
    pub fn register() -> io::Result<Self> {
        let signals = Signals::new([SIGTERM, SIGINT])?;
        let handle = signals.handle();
        debug!("Registered handlers for SIGTERM and SIGINT");
        Ok(Self { signals, handle })
    }

    /// Wait for the next termination signal
    pub async fn recv(&mut self) -> Termination {
        while let Some(signal) = self.signals.next().await {
            if let Some(termination) = Termination::from_signal(signal) {
                info!(signal = %termination, "Received termination signal");
                return termination;
            }
        }

        // The stream only ends once `close` runs, which needs `self` by value
        std::future::pending().await
    }

    /// Unregister the handlers
    pub fn close(self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_termination_signals() {
        assert_eq!(Termination::from_signal(SIGINT), Some(Termination::Interrupt));
        assert_eq!(Termination::from_signal(SIGTERM), Some(Termination::Terminate));
        assert_eq!(Termination::from_signal(signal_hook::consts::SIGHUP), None);
    }

    #[test]
    fn displays_signal_name() {
        assert_eq!(Termination::Interrupt.to_string(), "SIGINT");
        assert_eq!(Termination::Terminate.name(), "SIGTERM");
    }
}
