//! OS signal listening.
//!
//! SIGINT and SIGTERM are translated into shutdown broadcasts, so an
//! externally delivered termination request takes the same path as
//! `Shutdowner::shutdown`.

use std::sync::Arc;

use tracing::warn;

use super::broadcaster::{Broadcaster, ShutdownSignal};

/// Wait for the first interrupt or terminate signal from the OS.
#[cfg(unix)]
async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            warn!(%err, "failed to install SIGTERM handler, listening for interrupt only");
            None
        }
    };

    tokio::select! {
        _ = interrupt() => ShutdownSignal::Interrupt,
        _ = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending().await,
            }
        } => ShutdownSignal::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownSignal {
    interrupt().await;
    ShutdownSignal::Interrupt
}

async fn interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to install interrupt handler");
        std::future::pending::<()>().await;
    }
}

/// Spawn the relay that forwards the first OS termination signal into the
/// broadcaster. The relay runs for the rest of the process.
pub(crate) fn spawn_relay(hub: Arc<Broadcaster>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        if let Err(err) = hub.broadcast(signal) {
            warn!(%err, "some shutdown listeners missed the termination signal");
        }
    })
}
