//! Periodic purge of expired sessions.
//!
//! Lazy expiry already hides expired sessions from every accessor; the
//! sweeper reclaims memory for sessions nobody looks up again.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::session::manager::SessionManager;

pub struct SessionSweeper {
    managers: Vec<Arc<SessionManager>>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(managers: Vec<Arc<SessionManager>>, interval: Duration) -> Self {
        Self { managers, interval }
    }

    /// Sweep every manager once. Returns the total number purged.
    pub fn sweep_once(&self) -> usize {
        self.managers.iter().map(|m| m.sweep_expired()).sum()
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            namespaces = self.managers.len(),
            "Session sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = self.sweep_once();
                    if purged > 0 {
                        tracing::info!(purged, "Expired sessions swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
