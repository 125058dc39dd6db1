//! Periodic expiry sweep for the fallback cache.
//!
//! The sweeper owns one background task that calls
//! [`FallbackCache::cleanup_expired`] on a fixed interval until stopped. Join
//! handles are tracked and cancellation is explicit.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pms_core::{CacheSweeper, FallbackCache};
//!
//! # async fn example() -> Result<(), String> {
//! let cache = FallbackCache::new(Duration::from_secs(600));
//! let mut sweeper = CacheSweeper::new(cache, Duration::from_secs(60));
//!
//! sweeper.start()?;
//! // ... application runs ...
//! sweeper.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::FallbackCache;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Background task removing expired cache entries.
pub struct CacheSweeper {
    cache: FallbackCache,
    interval: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    pub fn new(cache: FallbackCache, interval: Duration) -> Self {
        Self { cache, interval, cancellation: CancellationToken::new(), task_handle: None }
    }

    /// Spawn the sweep loop. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("Sweeper already running".to_string());
        }
        if self.interval.is_zero() {
            return Err("Sweep interval must be greater than zero".to_string());
        }

        self.cancellation = CancellationToken::new();
        let cache = self.cache.clone();
        let interval = self.interval;
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::sweep_loop(cache, interval, cancel).await;
        }));

        info!(interval_secs = interval.as_secs(), "Fallback cache sweeper started");
        Ok(())
    }

    /// Cancel the loop and wait for it to finish.
    pub async fn stop(&mut self) -> Result<(), String> {
        let Some(handle) = self.task_handle.take() else {
            return Err("Sweeper not running".to_string());
        };

        self.cancellation.cancel();
        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Sweeper task panicked: {}", e);
                return Err("Sweeper task panicked".to_string());
            }
            Err(_) => {
                warn!("Sweeper task did not complete within timeout");
                return Err("Sweeper task timeout".to_string());
            }
        }

        info!("Fallback cache sweeper stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn sweep_loop(cache: FallbackCache, interval: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sweep loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let removed = cache.cleanup_expired();
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "Swept expired fallback entries");
                    }
                }
            }
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        if self.is_running() {
            debug!("CacheSweeper dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
