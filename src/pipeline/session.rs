//! Browser session manager: one lazily launched, health-checked browser
//! shared by every conversion.
//!
//! Launching Chrome costs hundreds of milliseconds; opening a tab on a live
//! process costs a few. The manager therefore keeps a single process and
//! hands out `Arc` clones of it. Each conversion opens its own surface on
//! that process, so sharing the browser never means sharing a page.
//!
//! ## Locking
//!
//! The handle sits behind an `RwLock`: callers clone it under a read lock
//! and run their liveness probes in parallel, each bounded by
//! [`LIVENESS_TIMEOUT`]. Only the launch path is serialised, by a separate
//! mutex. A caller that finds no browser, or a dead one, takes that mutex,
//! re-reads the slot (another caller may have relaunched meanwhile) and
//! launches only if the slot still holds nothing or the same dead handle.
//! A failed launch stores nothing, so the next caller simply tries again.

use crate::config::RenderConfig;
use crate::error::MdPressError;
use crate::pipeline::surface::{Browser, BrowserLauncher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Upper bound on one liveness probe. A browser that does not answer in
/// time is treated as dead and replaced.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner of the process-wide browser handle.
pub struct BrowserSessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    config: RenderConfig,
    liveness_timeout: Duration,
    current: RwLock<Option<Arc<dyn Browser>>>,
    launch_lock: Mutex<()>,
}

impl BrowserSessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: RenderConfig) -> Self {
        Self {
            launcher,
            config,
            liveness_timeout: LIVENESS_TIMEOUT,
            current: RwLock::new(None),
            launch_lock: Mutex::new(()),
        }
    }

    /// Override [`LIVENESS_TIMEOUT`].
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Return the live browser, launching (or relaunching) it if needed.
    ///
    /// # Errors
    /// [`MdPressError::BrowserLaunchFailed`] if a new process cannot start.
    pub async fn acquire(&self) -> Result<Arc<dyn Browser>, MdPressError> {
        let seen = self.current.read().await.clone();

        if let Some(browser) = &seen {
            if self.is_alive(browser).await {
                return Ok(Arc::clone(browser));
            }
        }

        let _launching = self.launch_lock.lock().await;

        // Someone else may have launched or replaced the browser while this
        // caller waited for the lock.
        if let Some(current) = self.current.read().await.as_ref() {
            let replaced = seen.as_ref().map_or(true, |old| !Arc::ptr_eq(old, current));
            if replaced {
                return Ok(Arc::clone(current));
            }
        }

        if seen.is_some() {
            warn!("Browser connection lost; relaunching");
            // Drop the dead handle before launching so its process is reaped.
            *self.current.write().await = None;
        }
        drop(seen);

        let start = Instant::now();
        let launcher = Arc::clone(&self.launcher);
        let config = self.config.clone();
        let browser = tokio::task::spawn_blocking(move || launcher.launch(&config))
            .await
            .map_err(|e| MdPressError::Internal(format!("Launch task panicked: {}", e)))??;

        info!("Browser ready in {}ms", start.elapsed().as_millis());
        *self.current.write().await = Some(Arc::clone(&browser));
        Ok(browser)
    }

    async fn is_alive(&self, browser: &Arc<dyn Browser>) -> bool {
        let probe = Arc::clone(browser);
        let check = tokio::task::spawn_blocking(move || probe.is_connected());
        match tokio::time::timeout(self.liveness_timeout, check).await {
            Ok(joined) => joined.unwrap_or(false),
            Err(_) => {
                warn!(
                    "Browser did not answer liveness check within {}ms",
                    self.liveness_timeout.as_millis()
                );
                false
            }
        }
    }

    /// `true` once a browser has been launched and not yet found dead.
    pub async fn is_initialised(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}
