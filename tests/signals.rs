//! Real signal delivery. Kept in its own test binary so raised signals
//! cannot reach other tests.

use std::time::Duration;

use axum::Router;
use orders::{Coordinator, Phase, ShutdownSignals, Termination};
use signal_hook::{consts::SIGTERM, low_level::raise};
use tokio::time::timeout;

#[tokio::test]
async fn repeated_sigterm_shuts_down_once() {
    let mut signals = ShutdownSignals::register().unwrap();
    let coordinator = Coordinator::new(None, Duration::from_secs(1)).unwrap();
    let mut phases = coordinator.subscribe();

    // Delivered before anyone waits: must be queued, not lost
    raise(SIGTERM).unwrap();
    raise(SIGTERM).unwrap();

    let report = timeout(Duration::from_secs(5), coordinator.run(Router::new(), signals.recv()))
        .await
        .expect("registered signal should end the run")
        .unwrap();
    assert_eq!(report.termination, Termination::Terminate);

    let mut shutdowns = 0;
    while let Ok(phase) = phases.try_recv() {
        if phase == Phase::ShuttingDownGraceful {
            shutdowns += 1;
        }
    }
    assert_eq!(shutdowns, 1);

    signals.close();
}
