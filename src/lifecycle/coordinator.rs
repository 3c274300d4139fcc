//! Lifecycle coordinator: serve until terminated, then shut down within a deadline

use std::{
    future::Future,
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::Router;
use tokio::{sync::broadcast, time::timeout};
use tracing::{debug, error, info, warn};

use super::{Phase, ShutdownKind, ShutdownReport};
use crate::{
    config::Config,
    error::LifecycleError,
    server::{HttpServer, ServerHandle},
    utils::Termination,
};

/// The first event observed while serving
enum Event {
    ListenerFailed(LifecycleError),
    Terminated(Termination),
}

/// Drives the optional listener from startup to shutdown
#[derive(Debug)]
pub struct Coordinator {
    bind_address: Option<String>,
    grace_period: Duration,
    phase_tx: broadcast::Sender<Phase>,
}

impl Coordinator {
    /// Create a coordinator. Without a bind address no listener is started.
    pub fn new(bind_address: Option<String>, grace_period: Duration) -> Result<Self, LifecycleError> {
        if grace_period.is_zero() {
            return Err(LifecycleError::InvalidConfig(
                "grace period must be positive".to_string(),
            ));
        }

        let bind_address = bind_address
            .as_deref()
            .map(normalize_address)
            .transpose()?;

        let (phase_tx, _) = broadcast::channel(16);

        Ok(Self {
            bind_address,
            grace_period,
            phase_tx,
        })
    }

    /// Create a coordinator from CLI configuration
    pub fn from_config(config: &Config) -> Result<Self, LifecycleError> {
        Self::new(config.address(), config.grace_period())
    }

    /// Subscribe to phase transitions
    pub fn subscribe(&self) -> broadcast::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    pub fn bind_address(&self) -> Option<&str> {
        self.bind_address.as_deref()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Serve `router` until `termination` resolves or the listener fails.
    ///
    /// `termination` must come from signal handlers that are already
    /// registered. On every return path the listener is closed.
    pub async fn run<T>(&self, router: Router, termination: T) -> Result<ShutdownReport, LifecycleError>
    where
        T: Future<Output = Termination>,
    {
        let server = self.start(router).await?;
        self.serve(server.map(HttpServer::spawn), termination).await
    }

    /// Bind the configured listener, if any
    async fn start(&self, router: Router) -> Result<Option<HttpServer>, LifecycleError> {
        self.transition(Phase::Starting);

        match &self.bind_address {
            Some(address) => match HttpServer::bind(address, router).await {
                Ok(server) => Ok(Some(server)),
                Err(e) => Err(self.fatal(e)),
            },
            None => {
                info!("No listener configured, waiting for a termination signal");
                Ok(None)
            }
        }
    }

    /// Wait for the first of listener failure or termination, then shut down
    async fn serve<T>(
        &self,
        mut server: Option<ServerHandle>,
        termination: T,
    ) -> Result<ShutdownReport, LifecycleError>
    where
        T: Future<Output = Termination>,
    {
        self.transition(Phase::Serving {
            local_addr: server.as_ref().map(ServerHandle::local_addr),
        });

        let event = tokio::select! {
            error = wait_for_failure(server.as_mut()) => Event::ListenerFailed(error),
            termination = termination => Event::Terminated(termination),
        };

        let termination = match event {
            // Nothing to drain: dropping the handle aborts the accept task
            Event::ListenerFailed(e) => return Err(self.fatal(e)),
            Event::Terminated(termination) => termination,
        };

        info!(
            signal = %termination,
            grace_period = ?self.grace_period,
            "Shutdown started"
        );
        let started = Instant::now();
        self.transition(Phase::ShuttingDownGraceful);

        let kind = match server {
            Some(server) => match self.shutdown(server).await {
                Ok(kind) => kind,
                Err(e) => return Err(self.fatal(e)),
            },
            None => ShutdownKind::Graceful,
        };

        let elapsed = started.elapsed();
        self.transition(Phase::Stopped);
        info!(
            signal = %termination,
            forced = kind == ShutdownKind::Forced,
            elapsed = ?elapsed,
            "Listener stopped"
        );

        Ok(ShutdownReport {
            termination,
            kind,
            elapsed,
        })
    }

    /// Drain within the grace period, then force the listener closed
    async fn shutdown(&self, server: ServerHandle) -> Result<ShutdownKind, LifecycleError> {
        let mut draining = server.stop_accepting();

        let drained = timeout(self.grace_period, draining.drained()).await;
        match drained {
            Ok(result) => {
                result?;
                Ok(ShutdownKind::Graceful)
            }
            Err(_) => {
                warn!(
                    grace_period = ?self.grace_period,
                    "Graceful shutdown did not complete in time"
                );
                self.transition(Phase::ShuttingDownForced);
                draining.force_close().await?;
                Ok(ShutdownKind::Forced)
            }
        }
    }

    fn transition(&self, phase: Phase) {
        debug!(phase = %phase, "Lifecycle transition");
        // No subscribers is fine
        let _ = self.phase_tx.send(phase);
    }

    fn fatal(&self, e: LifecycleError) -> LifecycleError {
        error!(error = %e, "Lifecycle failed");
        self.transition(Phase::FatalError);
        e
    }
}

/// Resolve when the listener fails; never resolves without a listener
async fn wait_for_failure(server: Option<&mut ServerHandle>) -> LifecycleError {
    match server {
        Some(server) => server.failed().await,
        None => std::future::pending().await,
    }
}

/// Validate a `host:port` pair. An empty host means all interfaces.
fn normalize_address(address: &str) -> Result<String, LifecycleError> {
    if address.parse::<SocketAddr>().is_ok() {
        return Ok(address.to_string());
    }

    let invalid = |reason: &str| {
        LifecycleError::InvalidConfig(format!("bind address {:?}: {}", address, reason))
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    port.parse::<u16>().map_err(|_| invalid("port must be 0-65535"))?;

    if host.is_empty() {
        return Ok(format!("0.0.0.0:{}", port));
    }
    // Bracketed IPv6 literals that are valid already parsed above
    if host.contains(':') || host.contains('[') || host.contains(']') {
        return Err(invalid("IPv6 hosts must be a bracketed address literal"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(invalid("host contains whitespace"));
    }

    Ok(address.to_string())
}
