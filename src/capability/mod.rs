//! Browser capability seam
//!
//! The extraction state machine drives pages only through [`BrowserSession`]:
//! navigate, wait for a selector, click, read markup and try to clear an
//! interstitial challenge. [`SessionFactory`] hands out one session per
//! item; the Chrome-backed implementation lives in [`chrome`].

pub mod chrome;

use std::time::Duration;

use async_trait::async_trait;

pub use chrome::{ChromeSession, ChromeSessionFactory};

/// Something to click: a CSS selector, optionally narrowed to the first
/// match whose text contains `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    pub selector: String,
    pub text: Option<String>,
}

impl ClickTarget {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    pub fn with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
        }
    }
}

/// One interactive page session, scoped to a single item.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait for the navigation to commit.
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()>;

    /// Wait up to `timeout` for `selector` to be present and visible.
    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Click the target if it exists. Returns whether a click happened.
    async fn click(&mut self, target: &ClickTarget) -> bool;

    /// Current rendered markup.
    async fn read_content(&mut self) -> anyhow::Result<String>;

    /// Best-effort attempt to clear a challenge interstitial. `false` means
    /// none was found or it could not be cleared; callers carry on either way.
    async fn attempt_bypass(&mut self) -> bool;

    /// Release the underlying page. Safe to call more than once.
    async fn release(&mut self);
}

/// Source of sessions, shared by all executors.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(&self) -> anyhow::Result<Box<dyn BrowserSession>>;
}
