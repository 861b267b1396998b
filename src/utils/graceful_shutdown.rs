use tokio::signal;

/// Signal that ends the serve loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    /// Ctrl+C
    Interrupt,
    /// SIGTERM, as sent by container runtimes
    Terminate,
}

/// Resolve once the process is asked to stop, after logging which signal
/// arrived. In-flight requests are drained by the server afterwards.
pub async fn shutdown_signal() {
    let reason = tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            ShutdownReason::Interrupt
        }
        _ = wait_for_sigterm() => ShutdownReason::Terminate,
    };

    tracing::info!("Received {:?}, draining in-flight requests", reason);
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // Only Ctrl+C is available off Unix
    std::future::pending::<()>().await;
}
