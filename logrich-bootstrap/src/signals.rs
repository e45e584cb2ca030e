// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Listens for SIGTERM/SIGINT (and SIGHUP on Unix) and feeds them into a
//! [`crate::shutdown::ShutdownCoordinator`], so an embedding application can
//! opt a `logrich` runtime into "shut down gracefully on process signal"
//! without wiring the tokio signal plumbing itself.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a task that waits for a termination signal and calls
/// `coordinator.initiate_shutdown()` exactly once when one arrives.
pub fn install(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!(target: "bootstrap", "received shutdown signal");
        coordinator.initiate_shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
        _ = sighup.recv() => {}
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn install_wires_up_without_panicking() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        install(coordinator.clone());
        // Nothing signals the process in this test; just confirm the task
        // spawned without immediately tripping the coordinator.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!coordinator.is_shutting_down());
    }
}
