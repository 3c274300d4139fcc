//! Accept loop with graceful drain and forced close
//!
//! The listener moves through three owned states:
//!
//! ```text
//! HttpServer --spawn--> ServerHandle --stop_accepting--> DrainingServer --force_close--> (gone)
//! ```
//!
//! Each transition consumes the previous value, so the socket can only be
//! stopped once and closed once. Dropping any of the running states aborts the
//! accept task, and with it every connection task it owns.

use std::{
    future::Future,
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    server::graceful::GracefulShutdown,
    service::TowerToHyperService,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::{JoinError, JoinHandle, JoinSet},
    time::sleep,
};
use tracing::{debug, info, warn};

use crate::error::LifecycleError;

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// A bound listener that is not accepting yet
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Bind the listener. Failure here is a fatal listener error.
    pub async fn bind(address: &str, router: Router) -> Result<Self, LifecycleError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| LifecycleError::Bind {
                address: address.to_string(),
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| LifecycleError::Bind {
            address: address.to_string(),
            source,
        })?;

        Ok(Self {
            listener,
            router,
            local_addr,
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start accepting connections on a separate task
    pub fn spawn(self) -> ServerHandle {
        let Self {
            listener,
            router,
            local_addr,
        } = self;

        let handle = spawn_serving(local_addr, move |stop_rx| accept_loop(listener, router, stop_rx));
        info!(address = %local_addr, "HTTP listener accepting connections");
        handle
    }

    /// Spawn a serving task that ends with `result` instead of accepting
    #[cfg(test)]
    pub(crate) fn spawn_ending_with(self, result: io::Result<()>) -> ServerHandle {
        let Self {
            listener,
            local_addr,
            ..
        } = self;

        spawn_serving(local_addr, move |_stop_rx| async move {
            let _listener = listener;
            result
        })
    }
}

/// Run `serve` on its own task, forwarding its error over a single-slot channel
fn spawn_serving<F, Fut>(local_addr: SocketAddr, serve: F) -> ServerHandle
where
    F: FnOnce(watch::Receiver<bool>) -> Fut,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    // Single slot: only the first serving failure matters, and sending
    // never blocks the accept task.
    let (failure_tx, failure_rx) = oneshot::channel();
    let serving = serve(stop_rx);

    let task = tokio::spawn(async move {
        if let Err(e) = serving.await {
            let _ = failure_tx.send(e);
        }
    });

    ServerHandle {
        local_addr,
        stop_tx,
        failure_rx,
        task: ServeTask(task),
    }
}

/// A listener that is accepting connections
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    failure_rx: oneshot::Receiver<io::Error>,
    task: ServeTask,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolve once the accept loop has failed. Cancel safe.
    pub async fn failed(&mut self) -> LifecycleError {
        match (&mut self.failure_rx).await {
            Ok(e) => LifecycleError::Serve(e),
            // The task ended before being stopped without reporting an error
            Err(_) => LifecycleError::ListenerExited,
        }
    }

    /// Stop accepting new connections and ask open ones to finish
    pub fn stop_accepting(self) -> DrainingServer {
        // The receiver lives as long as the accept task; if it is gone there
        // is nothing left to stop.
        let _ = self.stop_tx.send(true);
        debug!(address = %self.local_addr, "Stopped accepting connections");

        DrainingServer {
            local_addr: self.local_addr,
            task: self.task,
        }
    }
}

/// A listener that no longer accepts and is waiting for in-flight requests
pub struct DrainingServer {
    local_addr: SocketAddr,
    task: ServeTask,
}

impl DrainingServer {
    /// Wait until every open connection has finished. Cancel safe.
    pub async fn drained(&mut self) -> Result<(), LifecycleError> {
        (&mut self.task)
            .await
            .map_err(|e| {
                debug!(error = %e, "Serving task failed while draining");
                LifecycleError::ListenerExited
            })
    }

    /// Abort the accept task and every connection it owns
    pub async fn force_close(mut self) -> Result<(), LifecycleError> {
        warn!(address = %self.local_addr, "Aborting in-flight connections");
        self.task.0.abort();

        match (&mut self.task).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(LifecycleError::ForceClose(e.to_string())),
        }
    }
}

/// Accept task handle that aborts the task when dropped
struct ServeTask(JoinHandle<()>);

impl Future for ServeTask {
    type Output = Result<(), JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl Drop for ServeTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Accept connections until told to stop, then drain them.
///
/// Connection tasks live in a `JoinSet` owned by this future, so aborting the
/// task running it also aborts every connection.
async fn accept_loop(
    listener: TcpListener,
    router: Router,
    mut stop_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    let mut retry_delay = MIN_ACCEPT_BACKOFF;

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = stop_rx.changed() => break,
        };

        match accepted {
            Ok((stream, peer)) => {
                retry_delay = MIN_ACCEPT_BACKOFF;
                debug!(peer = %peer, "Accepted connection");

                let service = TowerToHyperService::new(router.clone());
                let connection = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .serve_connection(TokioIo::new(stream), service);
                let connection = graceful.watch(connection);

                connections.spawn(async move {
                    if let Err(e) = connection.await {
                        debug!(peer = %peer, error = %e, "Connection closed with error");
                    }
                });
            }
            Err(e) if is_connection_error(&e) => {
                debug!(error = %e, "Skipping failed accept");
            }
            Err(e) if is_resource_exhaustion(&e) => {
                warn!(error = %e, retry_in = ?retry_delay, "Accept failed, retrying");
                // A stop request still wins while backing off
                tokio::select! {
                    _ = sleep(retry_delay) => {}
                    _ = stop_rx.changed() => break,
                }
                retry_delay = next_accept_backoff(retry_delay);
            }
            Err(e) => return Err(e),
        }

        // Reap finished connections so the set does not grow unbounded
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    debug!(open = connections.len(), "Draining open connections");

    graceful.shutdown().await;
    while connections.join_next().await.is_some() {}

    Ok(())
}

/// Errors that concern a single pending connection, not the listener
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
    )
}

/// Out of descriptors or buffers: the listener is fine, the process is busy
fn is_resource_exhaustion(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::OutOfMemory
        || matches!(
            e.raw_os_error(),
            Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
        )
}

fn next_accept_backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_ACCEPT_BACKOFF)
}
