//! The per-item stage sequencer
//!
//! A token runs: acquire session, navigate, settle, await primary, reveal,
//! await secondary, collect trader links, then for each wallet navigate,
//! settle, await detail and parse. Every wait returns a [`StageVerdict`] or a
//! [`StageFailure`] according to the stage's policy, and the sequencer
//! branches on that value alone. The session is released on every path.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::outcome::{ItemStatus, StageFailure};
use super::parsers::{parse_token_overview, parse_trader_links, parse_trader_metrics};
use super::plan::{ExtractionPlan, StageSpec, TimeoutPolicy};
use crate::capability::{BrowserSession, SessionFactory};
use crate::snapshot::{TokenDescriptor, parse_trending_list};
use crate::store::{TokenRecord, TokenStore, TraderRecord};

/// Extra time allowed on top of a stage timeout before the sequencer stops
/// waiting on the adapter itself.
const STAGE_GRACE: Duration = Duration::from_secs(5);

/// Fallback name stored when no heading could be parsed
pub const UNKNOWN_NAME: &str = "Unknown";

/// Result of a wait stage that did not abort the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageVerdict {
    Visible,
    /// Timed out under a `Skip` policy
    Skip,
    /// Timed out under a `Proceed` policy
    Proceed,
}

/// Everything scraped for one token, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHarvest {
    pub token: TokenRecord,
    pub traders: Vec<TraderRecord>,
    /// Wallets whose detail stage timed out or failed to load
    pub skipped: Vec<String>,
}

/// Wait for a stage's selector and apply its timeout policy.
pub async fn await_stage(
    session: &mut dyn BrowserSession,
    stage: &StageSpec,
) -> Result<StageVerdict, StageFailure> {
    let visible = tokio::time::timeout(
        stage.timeout + STAGE_GRACE,
        session.wait_visible(&stage.selector, stage.timeout),
    )
    .await
    .unwrap_or(false);

    if visible {
        return Ok(StageVerdict::Visible);
    }

    debug!(selector = %stage.selector, timeout = ?stage.timeout, "Stage wait timed out");
    match &stage.on_timeout {
        TimeoutPolicy::Abort(failure) => Err(failure.clone()),
        TimeoutPolicy::Skip => Ok(StageVerdict::Skip),
        TimeoutPolicy::Proceed => Ok(StageVerdict::Proceed),
    }
}

/// Pause, then make one best-effort pass at a challenge interstitial.
async fn settle(session: &mut dyn BrowserSession, delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if session.attempt_bypass().await {
        debug!("Challenge widget clicked");
    } else {
        debug!("No challenge cleared; continuing");
    }
}

async fn read_content(session: &mut dyn BrowserSession) -> Result<String, StageFailure> {
    session
        .read_content()
        .await
        .map_err(|e| StageFailure::Session(format!("{e:#}")))
}

/// Run the full token flow on an acquired session.
pub async fn harvest_token(
    session: &mut dyn BrowserSession,
    plan: &ExtractionPlan,
    descriptor: &TokenDescriptor,
) -> Result<TokenHarvest, StageFailure> {
    let url = plan.token_url.render(&descriptor.address);
    session
        .navigate(&url)
        .await
        .map_err(|e| StageFailure::Navigation(format!("{e:#}")))?;
    settle(session, plan.token_settle).await;

    await_stage(session, &plan.primary).await?;

    let trigger_ready = tokio::time::timeout(
        plan.reveal.timeout + STAGE_GRACE,
        session.wait_visible(&plan.reveal.target.selector, plan.reveal.timeout),
    )
    .await
    .unwrap_or(false);
    if !trigger_ready || !session.click(&plan.reveal.target).await {
        return Err(StageFailure::TriggerNotFound);
    }

    await_stage(session, &plan.secondary).await?;

    let html = read_content(session).await?;
    let overview = parse_token_overview(&html);
    let wallets = parse_trader_links(&html, &plan.trader_link_selector, plan.link_cap);
    debug!(wallets = wallets.len(), "Collected trader links");

    let token = TokenRecord {
        address: descriptor.address.clone(),
        name: overview.name.or_else(|| descriptor.name.clone()),
        market_cap: descriptor.market_cap,
        liquidity: descriptor.liquidity,
        volume: descriptor.volume,
        thumbnail: overview.thumbnail,
    };

    let mut traders = Vec::with_capacity(wallets.len());
    let mut skipped = Vec::new();
    for wallet in wallets {
        match harvest_trader(session, plan, &descriptor.address, &wallet).await? {
            Some(trader) => traders.push(trader),
            None => skipped.push(wallet),
        }
    }

    Ok(TokenHarvest {
        token,
        traders,
        skipped,
    })
}

/// Nested sub-sequence for one wallet. `Ok(None)` skips only this wallet.
async fn harvest_trader(
    session: &mut dyn BrowserSession,
    plan: &ExtractionPlan,
    token_address: &str,
    wallet: &str,
) -> Result<Option<TraderRecord>, StageFailure> {
    let url = plan.trader_url.render(wallet);
    if let Err(e) = session.navigate(&url).await {
        warn!(wallet, "Trader page failed to load: {e:#}");
        return Ok(None);
    }
    settle(session, plan.trader_settle).await;

    match await_stage(session, &plan.detail).await? {
        StageVerdict::Visible | StageVerdict::Proceed => {}
        StageVerdict::Skip => {
            info!(wallet, "Trader detail did not render; skipping");
            return Ok(None);
        }
    }

    let html = match session.read_content().await {
        Ok(html) => html,
        Err(e) => {
            warn!(wallet, "Failed to read trader page: {e:#}");
            return Ok(None);
        }
    };

    let metrics = parse_trader_metrics(&html, &plan.metric_labels);
    Ok(Some(TraderRecord::new(
        wallet,
        Some(token_address.to_string()),
        metrics,
    )))
}

/// Reduced flow for the lookup endpoint: navigate, settle, wait for the
/// primary marker under a proceed policy, parse the overview.
pub async fn harvest_overview(
    session: &mut dyn BrowserSession,
    plan: &ExtractionPlan,
    address: &str,
) -> Result<TokenRecord, StageFailure> {
    let url = plan.token_url.render(address);
    session
        .navigate(&url)
        .await
        .map_err(|e| StageFailure::Navigation(format!("{e:#}")))?;
    settle(session, plan.token_settle).await;

    await_stage(session, &plan.lookup_stage()).await?;

    let html = read_content(session).await?;
    let overview = parse_token_overview(&html);

    let mut token = TokenRecord::new(address);
    token.name = Some(overview.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()));
    token.thumbnail = overview.thumbnail;
    Ok(token)
}

/// Capture the trending list page and parse its rows into descriptors.
pub async fn harvest_trending(
    session: &mut dyn BrowserSession,
    plan: &ExtractionPlan,
) -> Result<Vec<TokenDescriptor>, StageFailure> {
    session
        .navigate(&plan.trending_url)
        .await
        .map_err(|e| StageFailure::Navigation(format!("{e:#}")))?;
    settle(session, plan.token_settle).await;

    await_stage(session, &plan.trending_rows).await?;

    let html = read_content(session).await?;
    Ok(parse_trending_list(&html))
}

/// Write a harvest: the token first, then each trader.
///
/// A token harvested without market metrics only overwrites its scraped
/// columns, so an event-driven pass keeps metrics from earlier snapshots.
/// A trader that fails to persist marks the item failed, but later traders
/// are still attempted. A lost connection stops immediately.
pub async fn persist_harvest(
    store: &TokenStore,
    harvest: &TokenHarvest,
) -> Result<(), StageFailure> {
    if harvest.token.has_market_metrics() {
        store.upsert_token(&harvest.token).await?;
    } else {
        store.upsert_token_overview(&harvest.token).await?;
    }

    let mut first_failure = None;
    for trader in &harvest.traders {
        if let Err(e) = store.upsert_trader(trader).await {
            warn!(wallet = %trader.wallet_address, "Failed to persist trader: {e}");
            let failure = StageFailure::from(e);
            if failure.is_fatal() {
                return Err(failure);
            }
            first_failure.get_or_insert(failure);
        }
    }

    first_failure.map_or(Ok(()), Err)
}

/// Run one token end to end and return its terminal state.
///
/// Acquires a session from `factory` and releases it before persisting,
/// whatever the extraction outcome.
pub async fn process_token(
    factory: &dyn SessionFactory,
    store: &TokenStore,
    plan: &ExtractionPlan,
    descriptor: &TokenDescriptor,
) -> ItemStatus {
    let mut session = match factory.acquire().await {
        Ok(session) => session,
        Err(e) => {
            return ItemStatus::Failed {
                reason: StageFailure::Session(format!("{e:#}")),
            };
        }
    };

    let harvested = harvest_token(session.as_mut(), plan, descriptor).await;
    session.release().await;

    let harvest = match harvested {
        Ok(harvest) => harvest,
        Err(reason) => return ItemStatus::Failed { reason },
    };

    match persist_harvest(store, &harvest).await {
        Ok(()) => ItemStatus::Completed {
            traders: harvest.traders.len(),
            skipped: harvest.skipped,
        },
        Err(reason) => ItemStatus::Failed { reason },
    }
}
