//! Fixed-interval polling with a shared latest-snapshot slot.
//!
//! Each poller owns one background task. The first fetch fires immediately on
//! spawn; after that the interval drives retries unconditionally. There is no
//! backoff, a failed tick just waits for the next one. A failed fetch never
//! clears the last good snapshot, it only flips the health flag, so consumers
//! keep showing stale-but-present data through transient outages.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Anything that can produce a fresh snapshot on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Snapshot: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Self::Snapshot>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Handle to a background polling task. Dropping the handle does NOT stop the
/// task; call [`Poller::shutdown`] for deterministic teardown.
pub struct Poller<S: SnapshotSource> {
    snapshot: Arc<RwLock<Option<S::Snapshot>>>,
    healthy: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl<S: SnapshotSource> Poller<S> {
    pub fn spawn(source: S, interval: Duration) -> Self {
        let snapshot: Arc<RwLock<Option<S::Snapshot>>> = Arc::new(RwLock::new(None));
        let healthy = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(poll_loop(
            source,
            interval,
            Arc::clone(&snapshot),
            Arc::clone(&healthy),
            shutdown_rx,
        ));

        Poller {
            snapshot,
            healthy,
            shutdown_tx,
            handle,
        }
    }

    /// Latest successful snapshot, if any fetch has succeeded yet.
    pub async fn latest(&self) -> Option<S::Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Whether the most recent fetch attempt succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Stop the polling task and wait for it to finish. No timer survives.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn poll_loop<S: SnapshotSource>(
    source: S,
    interval: Duration,
    snapshot: Arc<RwLock<Option<S::Snapshot>>>,
    healthy: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("[{}] poller started (interval={:?})", source.name(), interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.fetch().await {
                    Ok(snap) => {
                        *snapshot.write().await = Some(snap);
                        healthy.store(true, Ordering::Relaxed);
                        debug!("[{}] snapshot refreshed", source.name());
                    }
                    Err(e) => {
                        // Keep the stale snapshot; only the flag changes
                        healthy.store(false, Ordering::Relaxed);
                        warn!("[{}] poll failed (will retry next tick): {}", source.name(), e);
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                info!("[{}] poller stopped", source.name());
                return;
            }
        }
    }
}
