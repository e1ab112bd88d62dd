use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use crate::shutdown::Trigger;

/// Wires OS signals to the shutdown trigger. SIGINT and SIGTERM are
/// both a request for graceful termination; the first one received
/// fires the trigger and the watcher task ends.
pub fn watch(trigger: Trigger) {
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to set up SIGINT handle");
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to set up SIGTERM handle");

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!(message = "Signal received", signal = "SIGINT"),
            _ = sigterm.recv() => info!(message = "Signal received", signal = "SIGTERM"),
        }

        trigger.cancel();
    });
}
