//! Test utilities for the harvest test suite
//!
//! `FakeSite` stands in for the browser: each URL maps to a scripted page
//! listing its markup, which selectors count as visible and which can be
//! clicked. Sessions record navigations and releases so tests can check that
//! every exit path gives its session back.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use trending_harvest::capability::{BrowserSession, ClickTarget, SessionFactory};
use trending_harvest::extraction::ExtractionPlan;
use trending_harvest::store::TokenStore;

pub const PRIMARY: &str = "div.custom-1oq7u8k";
pub const SECONDARY: &str = "a.custom-1hhf88o";
pub const DETAIL: &str = "img.bg-brand-background-highlight";
#[allow(dead_code)]
pub const TRENDING_ROWS: &str = "img.ds-dex-table-row-token-icon-img";

/// One scripted page.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub visible: Vec<String>,
    pub clickable: Vec<String>,
    pub panic_on_load: bool,
}

#[allow(dead_code)]
impl FakePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn visible(mut self, selector: &str) -> Self {
        self.visible.push(selector.to_string());
        self
    }

    pub fn clickable(mut self, selector: &str) -> Self {
        self.clickable.push(selector.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_load = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct SiteState {
    pages: Mutex<HashMap<String, FakePage>>,
    navigations: Mutex<Vec<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    refuse_sessions: Mutex<bool>,
}

/// Scripted site and session factory in one.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    state: Arc<SiteState>,
}

#[allow(dead_code)]
impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: impl Into<String>, page: FakePage) -> &Self {
        self.state.pages.lock().insert(url.into(), page);
        self
    }

    pub fn refuse_sessions(&self) {
        *self.state.refuse_sessions.lock() = true;
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().clone()
    }

    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SessionFactory for FakeSite {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>> {
        if *self.state.refuse_sessions.lock() {
            return Err(anyhow!("no browser available"));
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            current: None,
            released: false,
        }))
    }
}

pub struct FakeSession {
    state: Arc<SiteState>,
    current: Option<FakePage>,
    released: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.state.navigations.lock().push(url.to_string());
        let page = self.state.pages.lock().get(url).cloned();
        match page {
            Some(page) if page.panic_on_load => panic!("renderer crashed on {url}"),
            Some(page) => {
                self.current = Some(page);
                Ok(())
            }
            None => {
                self.current = None;
                Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}"))
            }
        }
    }

    async fn wait_visible(&mut self, selector: &str, _timeout: Duration) -> bool {
        self.current
            .as_ref()
            .is_some_and(|page| page.visible.iter().any(|s| s == selector))
    }

    async fn click(&mut self, target: &ClickTarget) -> bool {
        self.current
            .as_ref()
            .is_some_and(|page| page.clickable.iter().any(|s| *s == target.selector))
    }

    async fn read_content(&mut self) -> Result<String> {
        self.current
            .as_ref()
            .map(|page| page.html.clone())
            .ok_or_else(|| anyhow!("no page loaded"))
    }

    async fn attempt_bypass(&mut self) -> bool {
        false
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Default stage table without settle pauses.
#[allow(dead_code)]
pub fn quick_plan() -> ExtractionPlan {
    ExtractionPlan::default().with_settle(Duration::ZERO, Duration::ZERO)
}

#[allow(dead_code)]
pub fn token_url(address: &str) -> String {
    ExtractionPlan::default().token_url.render(address)
}

#[allow(dead_code)]
pub fn trader_url(wallet: &str) -> String {
    ExtractionPlan::default().trader_url.render(wallet)
}

/// Markup of a token page with a name heading, a logo and trader links.
#[allow(dead_code)]
pub fn token_html(name: &str, wallets: &[&str]) -> String {
    let links: String = wallets
        .iter()
        .map(|wallet| {
            format!(r#"<a class="custom-1hhf88o" href="https://solscan.io/account/{wallet}">{wallet}</a>"#)
        })
        .collect();
    format!(
        r#"<html><body>
            <div class="chakra-stack">
                <img src="https://cdn.dexscreener.com/cms/images/{name}-logo?width=64">
                <div class="chakra-stack"><h2 class="chakra-heading"><span>{name}</span></h2></div>
            </div>
            <div class="custom-1oq7u8k">pair stats</div>
            <button>Top Traders</button>
            <section>{links}</section>
        </body></html>"#
    )
}

/// A token page where every stage renders.
#[allow(dead_code)]
pub fn token_page(name: &str, wallets: &[&str]) -> FakePage {
    FakePage::new(token_html(name, wallets))
        .visible(PRIMARY)
        .visible("button")
        .clickable("button")
        .visible(SECONDARY)
}

/// A trader page whose detail stage renders.
#[allow(dead_code)]
pub fn trader_page(gross_profit: &str, win_rate: &str) -> FakePage {
    FakePage::new(format!(
        r#"<html><body>
            <img class="bg-brand-background-highlight" src="/avatar.png">
            <div><h3>Gross Profit</h3><p>{gross_profit}</p></div>
            <div><h3>Win Rate</h3><p>{win_rate}</p></div>
            <div><p>Win</p><p>12</p><p>Lose</p><p>4</p></div>
            <div><p>Trading Volume</p><p>$88.1K</p></div>
            <div><p>Trades</p><p>16</p></div>
            <div><p>Avg. Trade Size</p><p>$5.5K</p></div>
        </body></html>"#
    ))
    .visible(DETAIL)
}

/// Fresh on-disk store in a temp directory. Keep the `TempDir` alive.
#[allow(dead_code)]
pub async fn temp_store() -> Result<(TempDir, TokenStore)> {
    let dir = TempDir::new()?;
    let store = TokenStore::open(&dir.path().join("harvest.sqlite")).await?;
    Ok((dir, store))
}
