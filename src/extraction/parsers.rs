//! Markup parsers for token and trader pages

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::plan::{MetricLabel, TraderField};
use crate::store::TraderMetrics;

const LOGO_CDN_FRAGMENT: &str = "cdn.dexscreener.com/cms/images/";
const MAX_NAME_CHARS: usize = 80;

/// Top-level fields read from a token page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenOverview {
    pub name: Option<String>,
    pub thumbnail: Option<String>,
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector {css:?}: {e}");
            None
        }
    }
}

fn is_stack(element: &ElementRef<'_>) -> bool {
    element.value().name() == "div" && element.value().classes().any(|c| c == "chakra-stack")
}

/// Parse the token name and logo from a rendered token page.
///
/// Name candidates are `div.chakra-stack` containers holding an
/// `h2.chakra-heading` with a `span` of 1 to 80 characters. The candidate
/// sharing a chakra-stack ancestor with the logo wins; otherwise the first.
#[must_use]
pub fn parse_token_overview(html: &str) -> TokenOverview {
    let document = Html::parse_document(html);

    let logo = selector("img[src]").and_then(|images| {
        document
            .select(&images)
            .find(|img| img.value().attr("src").is_some_and(|src| src.contains(LOGO_CDN_FRAGMENT)))
    });
    let thumbnail = logo.and_then(|img| img.value().attr("src").map(str::to_string));

    let (Some(stacks), Some(headings), Some(spans)) = (
        selector("div.chakra-stack"),
        selector("h2.chakra-heading"),
        selector("span"),
    ) else {
        return TokenOverview {
            name: None,
            thumbnail,
        };
    };

    let candidates: Vec<(ElementRef<'_>, String)> = document
        .select(&stacks)
        .filter_map(|stack| {
            let heading = stack.select(&headings).next()?;
            let span = heading.select(&spans).next()?;
            let text = span.text().collect::<String>().trim().to_string();
            let chars = text.chars().count();
            (1..=MAX_NAME_CHARS).contains(&chars).then_some((stack, text))
        })
        .collect();

    let logo_stack = logo.and_then(|img| {
        img.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| is_stack(ancestor))
    });

    let near_logo = logo_stack.and_then(|anchor| {
        candidates.iter().find(|(stack, _)| {
            stack.id() == anchor.id() || stack.ancestors().any(|node| node.id() == anchor.id())
        })
    });

    let name = near_logo
        .or_else(|| candidates.first())
        .map(|(_, text)| text.clone());

    TokenOverview { name, thumbnail }
}

/// Wallet identifiers linked from the revealed trader list.
///
/// Each href contributes its last path segment. Duplicates keep their first
/// position and the result is truncated to `cap` in document order.
#[must_use]
pub fn parse_trader_links(html: &str, link_selector: &str, cap: usize) -> Vec<String> {
    let Some(links) = selector(link_selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    document
        .select(&links)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(last_segment)
        .filter(|wallet| seen.insert(wallet.clone()))
        .take(cap)
        .collect()
}

fn last_segment(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Labeled metrics from a trader page. Missing or unparsable values are `None`.
#[must_use]
pub fn parse_trader_metrics(html: &str, labels: &[MetricLabel]) -> TraderMetrics {
    let document = Html::parse_document(html);
    let mut metrics = TraderMetrics::default();

    for label in labels {
        if label.field.is_count() {
            let value = label.lookup.count(&document);
            match label.field {
                TraderField::Wins => metrics.wins = value,
                TraderField::Losses => metrics.losses = value,
                _ => metrics.trades = value,
            }
        } else {
            let value = label.lookup.number(&document);
            match label.field {
                TraderField::GrossProfit => metrics.gross_profit = value,
                TraderField::WinRate => metrics.win_rate = value,
                TraderField::TradeVolume => metrics.trade_volume = value,
                _ => metrics.avg_trade_size = value,
            }
        }
    }

    metrics
}
