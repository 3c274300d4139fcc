//! Shared utilities for lifecycle integration tests.
#![allow(dead_code)]

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use orders::{Phase, Termination};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{broadcast, oneshot, Notify},
    time::timeout,
};

/// A termination future driven by the returned sender.
///
/// Dropping the sender leaves the future pending, like a signal that never
/// arrives.
pub fn termination_channel() -> (oneshot::Sender<Termination>, impl Future<Output = Termination>) {
    let (tx, rx) = oneshot::channel();
    let termination = async move {
        match rx.await {
            Ok(termination) => termination,
            Err(_) => std::future::pending().await,
        }
    };
    (tx, termination)
}

/// Router with a `/slow` route that signals `started` and then takes `delay`.
pub fn slow_router(delay: Duration, started: Arc<Notify>) -> Router {
    Router::new().route(
        "/slow",
        get(move || {
            let started = Arc::clone(&started);
            async move {
                started.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

/// Send a single `Connection: close` GET and read the raw response.
pub async fn send_request(addr: SocketAddr, path: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Wait for the `Serving` phase and return its address.
pub async fn wait_for_serving(phases: &mut broadcast::Receiver<Phase>) -> Option<SocketAddr> {
    timeout(Duration::from_secs(5), async {
        loop {
            match phases.recv().await {
                Ok(Phase::Serving { local_addr }) => return local_addr,
                Ok(_) => continue,
                Err(e) => panic!("phase channel failed before serving: {}", e),
            }
        }
    })
    .await
    .expect("coordinator did not start serving")
}

/// Collect phases until a terminal one arrives.
pub async fn collect_until_terminal(phases: &mut broadcast::Receiver<Phase>) -> Vec<Phase> {
    let mut seen = Vec::new();
    timeout(Duration::from_secs(5), async {
        while let Ok(phase) = phases.recv().await {
            let terminal = phase.is_terminal();
            seen.push(phase);
            if terminal {
                break;
            }
        }
    })
    .await
    .expect("coordinator did not reach a terminal phase");
    seen
}
