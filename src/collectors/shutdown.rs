//! Cooperative stop signal for the scheduler
//!
//! The flag lives in a `watch` channel so the scheduler can both poll it
//! between cycles and wake up from its inter-cycle wait when it flips.

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct StopSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn request_stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once a stop has been requested (immediately if it already was)
    pub async fn stopped(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = receiver.wait_for(|stop| *stop).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a task that requests a stop on Ctrl+C or SIGTERM
pub fn spawn_signal_listener(stop: StopSignal) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Failed to register SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, stopping after the current cycle"),
            _ = terminate => info!("Received terminate signal, stopping after the current cycle"),
        }

        stop.request_stop();
    });
}
