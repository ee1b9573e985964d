//! Chrome-backed sessions over the browser pool
//!
//! Each session borrows one pooled browser and opens a dedicated page on it.
//! Visibility checks and clicks run as small scripts evaluated in the page;
//! the challenge click goes through CDP input so it reaches cross-origin
//! frames.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{BrowserSession, ClickTarget, SessionFactory};
use crate::browser_pool::{BrowserPool, PooledBrowserGuard};
use crate::browser_setup::apply_stealth_measures;
use crate::utils::constants::{NAVIGATION_TIMEOUT_SECS, VISIBILITY_POLL_INTERVAL_MS};
use crate::utils::with_page_timeout;

/// Challenge widgets tried in order by `attempt_bypass`
const CHALLENGE_SELECTORS: &[&str] = &[
    "iframe[src*='challenges.cloudflare.com']",
    "#challenge-stage input[type='checkbox']",
    "#turnstile-wrapper iframe",
];

const BYPASS_TIMEOUT: Duration = Duration::from_secs(5);

fn visibility_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r"(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none';
        }})()"
    ))
}

fn click_script(target: &ClickTarget) -> Result<String> {
    let selector = serde_json::to_string(&target.selector)?;
    let text = serde_json::to_string(&target.text)?;
    Ok(format!(
        r"(() => {{
            const text = {text};
            const el = Array.from(document.querySelectorAll({selector}))
                .find(e => text === null || (e.textContent || '').includes(text));
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"
    ))
}

/// Hands out [`ChromeSession`]s backed by a shared [`BrowserPool`].
#[derive(Clone)]
pub struct ChromeSessionFactory {
    pool: Arc<BrowserPool>,
    navigation_timeout: Duration,
}

impl ChromeSessionFactory {
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self {
            pool,
            navigation_timeout: Duration::from_secs(NAVIGATION_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>> {
        let guard = self.pool.acquire().await?;
        let page = guard
            .browser()
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;

        if let Err(e) = apply_stealth_measures(&page).await {
            warn!("Stealth setup failed on browser {}: {e:#}", guard.id());
        }

        Ok(Box::new(ChromeSession {
            page: Some(page),
            guard: Some(guard),
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

/// One page on one pooled browser.
///
/// Dropping an unreleased session closes its page in the background and
/// returns the browser to the pool.
pub struct ChromeSession {
    page: Option<Page>,
    guard: Option<PooledBrowserGuard>,
    navigation_timeout: Duration,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Session already released"))
    }

    async fn eval_bool(&self, script: &str) -> Result<bool> {
        let result = self.page()?.evaluate(script).await?;
        Ok(result.into_value::<bool>()?)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        with_page_timeout(
            async {
                page.goto(url).await.context("Navigation failed")?;
                Ok(())
            },
            self.navigation_timeout,
            "page.goto",
        )
        .await
    }

    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> bool {
        let script = match visibility_script(selector) {
            Ok(script) => script,
            Err(e) => {
                warn!("Cannot encode selector {selector:?}: {e}");
                return false;
            }
        };

        let start = Instant::now();
        let poll_interval = Duration::from_millis(VISIBILITY_POLL_INTERVAL_MS);
        loop {
            match self.eval_bool(&script).await {
                Ok(true) => {
                    debug!(selector, elapsed = ?start.elapsed(), "Selector visible");
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!(selector, "Visibility probe failed: {e:#}"),
            }

            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn click(&mut self, target: &ClickTarget) -> bool {
        let script = match click_script(target) {
            Ok(script) => script,
            Err(e) => {
                warn!("Cannot encode click target {target:?}: {e}");
                return false;
            }
        };

        match self.eval_bool(&script).await {
            Ok(clicked) => clicked,
            Err(e) => {
                debug!("Click on {target:?} failed: {e:#}");
                false
            }
        }
    }

    async fn read_content(&mut self) -> Result<String> {
        let page = self.page()?;
        with_page_timeout(
            async { page.content().await.context("Failed to read page content") },
            self.navigation_timeout,
            "page.content",
        )
        .await
    }

    async fn attempt_bypass(&mut self) -> bool {
        let Ok(page) = self.page() else {
            return false;
        };

        let attempt = async {
            for selector in CHALLENGE_SELECTORS {
                if let Ok(element) = page.find_element(*selector).await {
                    element.click().await?;
                    debug!(selector, "Clicked challenge widget");
                    return Ok(true);
                }
            }
            Ok::<_, anyhow::Error>(false)
        };

        match with_page_timeout(attempt, BYPASS_TIMEOUT, "challenge bypass").await {
            Ok(clicked) => clicked,
            Err(e) => {
                debug!("Challenge bypass failed: {e:#}");
                false
            }
        }
    }

    async fn release(&mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Failed to close page: {e}");
        }
        // Dropping the guard returns the browser to the pool
        self.guard.take();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(page) = self.page.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}
