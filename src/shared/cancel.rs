use crate::errors::{RestoreBrowserError, Result};
use std::future::Future;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Process-wide cancellation token, tripped once on interrupt
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Owning side of a `CancelToken`
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (handle, token) = cancel_pair();
        // The sender is dropped, so `cancelled` parks forever
        drop(handle);
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` unless the token trips first
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(RestoreBrowserError::Cancelled(operation.to_string()));
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RestoreBrowserError::Cancelled(operation.to_string())),
            result = fut => result,
        }
    }
}

/// Trip `handle` on Ctrl+C or SIGTERM
pub fn spawn_signal_listener(handle: CancelHandle) {
    tokio::spawn(async move {
        shutdown_signal().await;
        handle.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, cancelling in-flight AWS calls"),
        _ = terminate => info!("Received SIGTERM, cancelling in-flight AWS calls"),
    }
}
