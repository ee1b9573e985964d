//! Trending list parsing for the snapshot producer
//!
//! Each table row carries a token icon whose URL embeds the mint address.
//! The row's name and metric cells follow the icon in document order.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::types::TokenDescriptor;
use crate::field_normalizer::normalize;

const ICON_CLASS: &str = "ds-dex-table-row-token-icon-img";
const NAME_CLASS: &str = "ds-dex-table-row-base-token-name-text";
const MARKET_CAP_CLASS: &str = "ds-dex-table-row-col-market-cap";
const LIQUIDITY_CLASS: &str = "ds-dex-table-row-col-liquidity";
const VOLUME_CLASS: &str = "ds-dex-table-row-col-volume";

static ICON_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/solana/([1-9A-HJ-NP-Za-km-z]{32,44})\.(?:png|jpg|jpeg|gif|webp)")
        .expect("Invalid icon address regex")
});

fn has_class(element: &ElementRef<'_>, tag: &str, class: &str) -> bool {
    element.value().name() == tag && element.value().classes().any(|c| c == class)
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First element after `start` (in document order) that matches `tag.class`.
fn find_next<'a>(
    elements: &[ElementRef<'a>],
    start: usize,
    tag: &str,
    class: &str,
) -> Option<ElementRef<'a>> {
    elements[start + 1..]
        .iter()
        .find(|element| has_class(element, tag, class))
        .copied()
}

/// Parse a rendered trending page into worklist descriptors.
///
/// Rows whose icon does not carry a recognizable address are skipped. A
/// token appearing twice keeps its first row.
#[must_use]
pub fn parse_trending_list(html: &str) -> Vec<TokenDescriptor> {
    let document = Html::parse_document(html);
    let elements: Vec<ElementRef<'_>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect();

    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        if !has_class(element, "img", ICON_CLASS) {
            continue;
        }
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Some(address) = ICON_ADDRESS
            .captures(src)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };
        if !seen.insert(address.clone()) {
            continue;
        }

        let metric = |class: &str| {
            find_next(&elements, index, "div", class)
                .map(|cell| text_of(&cell))
                .as_deref()
                .and_then(normalize)
        };

        tokens.push(TokenDescriptor {
            name: find_next(&elements, index, "span", NAME_CLASS)
                .map(|cell| text_of(&cell))
                .filter(|name| !name.is_empty()),
            market_cap: metric(MARKET_CAP_CLASS),
            liquidity: metric(LIQUIDITY_CLASS),
            volume: metric(VOLUME_CLASS),
            address,
        });
    }

    tokens
}
