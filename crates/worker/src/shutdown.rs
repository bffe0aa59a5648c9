//! Process shutdown signals.

use std::future::Future;
use std::io;

use tracing::warn;

/// Wait for SIGINT or SIGTERM.
///
/// A handler that cannot be installed never fires; the other one still
/// can. With neither available this never resolves.
pub async fn shutdown_signal() {
    let ctrl_c = signal_or_pending("SIGINT", tokio::signal::ctrl_c());

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "failed to register SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}

/// Resolve when `signal` does; stay pending forever if it fails.
async fn signal_or_pending<F>(name: &str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(signal = name, error = %e, "failed to listen for signal");
        std::future::pending::<()>().await;
    }
}
