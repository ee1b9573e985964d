//! The stage table driving the extraction state machine
//!
//! Every wait stage is `{selector, timeout, on-timeout policy}`. Variants of
//! the flow (full harvest, overview lookup, trending capture) differ only in
//! this table, never in the sequencing code.

use std::time::Duration;

use once_cell::sync::Lazy;

use super::outcome::StageFailure;
use crate::capability::ClickTarget;
use crate::field_normalizer::LabeledField;
use crate::utils::constants::{
    DEFAULT_TRADER_LINK_CAP, DETAIL_CONTENT_TIMEOUT_SECS, PRIMARY_CONTENT_TIMEOUT_SECS,
    REVEAL_TRIGGER_TIMEOUT_SECS, SECONDARY_CONTENT_TIMEOUT_SECS, TOKEN_SETTLE_SECS,
    TRADER_SETTLE_SECS,
};

/// What a wait stage does when its selector does not become visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Stop the item with this failure
    Abort(StageFailure),
    /// Skip the derived identifier being processed, keep the item
    Skip,
    /// Carry on and parse whatever rendered
    Proceed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub selector: String,
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
}

impl StageSpec {
    pub fn new(selector: impl Into<String>, timeout: Duration, on_timeout: TimeoutPolicy) -> Self {
        Self {
            selector: selector.into(),
            timeout,
            on_timeout,
        }
    }
}

/// The reveal action: wait for the control, then click it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub target: ClickTarget,
    pub timeout: Duration,
}

/// URL with a single `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    #[must_use]
    pub fn render(&self, id: &str) -> String {
        self.0.replace("{id}", id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trader metric a labeled field feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderField {
    GrossProfit,
    WinRate,
    Wins,
    Losses,
    TradeVolume,
    Trades,
    AvgTradeSize,
}

impl TraderField {
    /// Counts are stored as integers; everything else as reals.
    #[must_use]
    pub fn is_count(self) -> bool {
        matches!(self, Self::Wins | Self::Losses | Self::Trades)
    }
}

#[derive(Debug, Clone)]
pub struct MetricLabel {
    pub field: TraderField,
    pub lookup: LabeledField,
}

static TRADER_METRIC_LABELS: Lazy<Vec<MetricLabel>> = Lazy::new(|| {
    [
        (TraderField::GrossProfit, "h3", "Gross Profit"),
        (TraderField::WinRate, "h3", "Win Rate"),
        (TraderField::Wins, "p", "Win"),
        (TraderField::Losses, "p", "Lose"),
        (TraderField::TradeVolume, "p", "Trading Volume"),
        (TraderField::Trades, "p", "Trades"),
        (TraderField::AvgTradeSize, "p", "Avg. Trade Size"),
    ]
    .into_iter()
    .map(|(field, tag, label)| MetricLabel {
        field,
        lookup: LabeledField::new(tag, label, "p").expect("Invalid trader metric label"),
    })
    .collect()
});

/// Full stage table for one deployment.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub token_url: UrlTemplate,
    pub trader_url: UrlTemplate,
    pub trending_url: String,

    /// Pause after a token page loads, before challenge handling
    pub token_settle: Duration,
    /// Pause after a trader page loads, before challenge handling
    pub trader_settle: Duration,

    pub primary: StageSpec,
    pub reveal: TriggerSpec,
    pub secondary: StageSpec,
    pub detail: StageSpec,
    pub trending_rows: StageSpec,

    /// Anchors whose last path segment is a trader wallet
    pub trader_link_selector: String,
    pub link_cap: usize,
    pub metric_labels: Vec<MetricLabel>,
}

impl Default for ExtractionPlan {
    fn default() -> Self {
        Self {
            token_url: UrlTemplate::new("https://dexscreener.com/solana/{id}"),
            trader_url: UrlTemplate::new("https://dexcheck.ai/app/wallet-analyzer/{id}"),
            trending_url: "https://dexscreener.com/solana?rankBy=trendingScoreH24&order=desc"
                .to_string(),
            token_settle: Duration::from_secs(TOKEN_SETTLE_SECS),
            trader_settle: Duration::from_secs(TRADER_SETTLE_SECS),
            primary: StageSpec::new(
                "div.custom-1oq7u8k",
                Duration::from_secs(PRIMARY_CONTENT_TIMEOUT_SECS),
                TimeoutPolicy::Abort(StageFailure::PrimaryContentTimeout),
            ),
            reveal: TriggerSpec {
                target: ClickTarget::with_text("button", "Top Traders"),
                timeout: Duration::from_secs(REVEAL_TRIGGER_TIMEOUT_SECS),
            },
            secondary: StageSpec::new(
                "a.custom-1hhf88o",
                Duration::from_secs(SECONDARY_CONTENT_TIMEOUT_SECS),
                TimeoutPolicy::Abort(StageFailure::SecondaryContentTimeout),
            ),
            detail: StageSpec::new(
                "img.bg-brand-background-highlight",
                Duration::from_secs(DETAIL_CONTENT_TIMEOUT_SECS),
                TimeoutPolicy::Skip,
            ),
            trending_rows: StageSpec::new(
                "img.ds-dex-table-row-token-icon-img",
                Duration::from_secs(DETAIL_CONTENT_TIMEOUT_SECS),
                TimeoutPolicy::Proceed,
            ),
            trader_link_selector: "a.custom-1hhf88o".to_string(),
            link_cap: DEFAULT_TRADER_LINK_CAP,
            metric_labels: TRADER_METRIC_LABELS.clone(),
        }
    }
}

impl ExtractionPlan {
    /// Primary wait used by the overview lookup: never aborts, the overview
    /// is parsed from whatever rendered.
    #[must_use]
    pub fn lookup_stage(&self) -> StageSpec {
        StageSpec {
            on_timeout: TimeoutPolicy::Proceed,
            ..self.primary.clone()
        }
    }

    #[must_use]
    pub fn with_link_cap(mut self, cap: usize) -> Self {
        self.link_cap = cap;
        self
    }

    #[must_use]
    pub fn with_settle(mut self, token: Duration, trader: Duration) -> Self {
        self.token_settle = token;
        self.trader_settle = trader;
        self
    }

    /// Override the four wait budgets: primary, trigger, secondary, detail.
    #[must_use]
    pub fn with_stage_timeouts(
        mut self,
        primary: Duration,
        trigger: Duration,
        secondary: Duration,
        detail: Duration,
    ) -> Self {
        self.primary.timeout = primary;
        self.reveal.timeout = trigger;
        self.secondary.timeout = secondary;
        self.detail.timeout = detail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_templates_render_ids() {
        let plan = ExtractionPlan::default();
        assert_eq!(
            plan.token_url.render("MintA"),
            "https://dexscreener.com/solana/MintA"
        );
        assert_eq!(
            plan.trader_url.render("Wallet1"),
            "https://dexcheck.ai/app/wallet-analyzer/Wallet1"
        );
    }

    #[test]
    fn test_default_policies() {
        let plan = ExtractionPlan::default();
        assert_eq!(
            plan.primary.on_timeout,
            TimeoutPolicy::Abort(StageFailure::PrimaryContentTimeout)
        );
        assert_eq!(
            plan.secondary.on_timeout,
            TimeoutPolicy::Abort(StageFailure::SecondaryContentTimeout)
        );
        assert_eq!(plan.detail.on_timeout, TimeoutPolicy::Skip);
        assert_eq!(plan.lookup_stage().on_timeout, TimeoutPolicy::Proceed);
        assert_eq!(plan.lookup_stage().selector, plan.primary.selector);
        assert_eq!(plan.link_cap, 10);
        assert_eq!(plan.metric_labels.len(), 7);
    }

    #[test]
    fn test_count_fields() {
        assert!(TraderField::Wins.is_count());
        assert!(TraderField::Trades.is_count());
        assert!(!TraderField::WinRate.is_count());
    }
}
