//! Pre-warmed Chrome browser pool
//!
//! Executors borrow a browser for one item at a time and open their own page
//! on it. The pool keeps `min_pool_size` browsers warm, launches more on
//! demand up to `max_pool_size`, and health-checks idle browsers in the
//! background.

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the browser pool
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Browsers kept warm while idle (default: 1)
    pub min_pool_size: usize,
    /// Maximum browsers alive at once (default: 5, one per executor)
    pub max_pool_size: usize,
    /// Interval between keepalive pings (default: 30s)
    pub keepalive_interval: Duration,
    /// Run browsers in headless mode (default: true)
    pub headless: bool,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: 1,
            max_pool_size: 5,
            keepalive_interval: Duration::from_secs(30),
            headless: true,
        }
    }
}

/// A launched browser with its CDP handler task and profile directory.
///
/// Dropping it aborts the handler and removes the profile.
#[derive(Debug)]
pub struct PooledBrowser {
    pub id: u64,
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    pub last_used: Instant,
}

impl PooledBrowser {
    fn cleanup_profile(&mut self) {
        if let Some(path) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            warn!("Failed to clean up profile {}: {}", path.display(), e);
        }
    }
}

impl Drop for PooledBrowser {
    fn drop(&mut self) {
        debug!("Dropping pooled browser {} - aborting handler task", self.id);
        self.handler.abort();
        self.cleanup_profile();
    }
}

#[derive(Debug)]
pub struct BrowserPool {
    config: BrowserPoolConfig,
    available: Arc<Mutex<VecDeque<PooledBrowser>>>,
    in_use_count: AtomicUsize,
    next_id: AtomicU64,
    keepalive_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl BrowserPool {
    /// Create a new browser pool (does NOT start background tasks)
    pub fn new(config: BrowserPoolConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            available: Arc::new(Mutex::new(VecDeque::new())),
            in_use_count: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            keepalive_handle: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Pre-warm to `min_pool_size` and start the keepalive task.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        info!("Starting browser pool with config: {:?}", self.config);

        if let Err(e) = crate::browser_profile::cleanup_stale_profiles_in(&std::env::temp_dir()) {
            warn!("Stale profile cleanup failed: {e:#}");
        }

        for _ in 0..self.config.min_pool_size {
            let browser = self.launch().await?;
            self.available.lock().await.push_back(browser);
        }

        let pool = Arc::clone(self);
        let keepalive = tokio::spawn(async move {
            keepalive_loop(pool).await;
        });
        *self.keepalive_handle.lock().await = Some(keepalive);

        info!(
            "Browser pool started with {} pre-warmed browsers",
            self.available.lock().await.len()
        );
        Ok(())
    }

    /// Borrow a browser. The guard returns it to the pool on drop.
    ///
    /// Waits when `max_pool_size` browsers are already checked out.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledBrowserGuard> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                anyhow::bail!("Browser pool is shut down");
            }

            let mut available = self.available.lock().await;
            if let Some(mut browser) = available.pop_front() {
                drop(available);
                match browser.browser.version().await {
                    Ok(_) => {
                        browser.last_used = Instant::now();
                        self.in_use_count.fetch_add(1, Ordering::Relaxed);
                        debug!("Acquired browser {} from pool", browser.id);
                        return Ok(self.guard(browser));
                    }
                    Err(e) => {
                        warn!(
                            "Browser {} failed health check during acquire: {}",
                            browser.id, e
                        );
                        continue;
                    }
                }
            }
            let idle = available.len();
            drop(available);

            let total = self.in_use_count.load(Ordering::Relaxed) + idle;
            if total < self.config.max_pool_size {
                // Reserve the slot before launching so concurrent acquires
                // cannot overshoot the cap
                self.in_use_count.fetch_add(1, Ordering::Relaxed);
                match self.launch().await {
                    Ok(browser) => {
                        debug!("Launched browser {} for acquire", browser.id);
                        return Ok(self.guard(browser));
                    }
                    Err(e) => {
                        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            debug!(
                "Browser pool at max capacity ({}), waiting...",
                self.config.max_pool_size
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    fn guard(self: &Arc<Self>, browser: PooledBrowser) -> PooledBrowserGuard {
        PooledBrowserGuard {
            browser_ref: Arc::clone(&browser.browser),
            id: browser.id,
            entry: Some(browser),
            pool: Arc::clone(self),
        }
    }

    fn release(&self, mut browser: PooledBrowser) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        browser.last_used = Instant::now();

        let available = Arc::clone(&self.available);
        let id = browser.id;
        tokio::spawn(async move {
            available.lock().await.push_back(browser);
            debug!("Released browser {} back to pool", id);
        });
    }

    /// Gracefully shutdown the pool, closing idle browsers.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down browser pool");
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.keepalive_handle.lock().await.take() {
            handle.abort();
        }

        let mut available = self.available.lock().await;
        while let Some(mut browser) = available.pop_front() {
            if let Some(b) = Arc::get_mut(&mut browser.browser) {
                if let Err(e) = b.close().await {
                    warn!("Failed to close browser {}: {}", browser.id, e);
                }
                let _ = b.wait().await;
            } else {
                warn!(
                    "Browser {} has outstanding references, skipping graceful close",
                    browser.id
                );
            }
        }

        info!("Browser pool shutdown complete");
        Ok(())
    }

    async fn launch(&self) -> Result<PooledBrowser> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let profile = crate::browser_profile::create_unique_profile()
            .context("Failed to create unique pool browser profile")?;
        let user_data_dir = profile.into_path();

        let (browser, handler, user_data_dir) =
            crate::browser_setup::launch_browser(self.config.headless, user_data_dir)
                .await
                .context("Failed to launch browser for pool")?;

        Ok(PooledBrowser {
            id,
            browser: Arc::new(browser),
            handler,
            user_data_dir: Some(user_data_dir),
            last_used: Instant::now(),
        })
    }
}

/// RAII guard that returns the browser to the pool on drop
pub struct PooledBrowserGuard {
    browser_ref: Arc<Browser>,
    id: u64,
    entry: Option<PooledBrowser>,
    pool: Arc<BrowserPool>,
}

impl PooledBrowserGuard {
    pub fn browser(&self) -> &Browser {
        &self.browser_ref
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PooledBrowserGuard {
    fn drop(&mut self) {
        if let Some(browser) = self.entry.take() {
            self.pool.release(browser);
        }
    }
}

/// Background task: ping idle browsers and drop the ones that stopped answering
async fn keepalive_loop(pool: Arc<BrowserPool>) {
    let mut interval = tokio::time::interval(pool.config.keepalive_interval);

    while !pool.shutdown.load(Ordering::Relaxed) {
        interval.tick().await;

        let mut available = pool.available.lock().await;
        let mut healthy = VecDeque::with_capacity(available.len());

        while let Some(browser) = available.pop_front() {
            match browser.browser.version().await {
                Ok(version) => {
                    debug!("Browser {} health check OK: {}", browser.id, version.product);
                    healthy.push_back(browser);
                }
                Err(e) => {
                    warn!("Browser {} failed keepalive health check: {}", browser.id, e);
                }
            }
        }

        *available = healthy;
    }

    debug!("Keepalive loop exiting");
}
