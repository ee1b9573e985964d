//! Field normalization for scraped display values
//!
//! Rendered pages show metrics as display strings such as `$45.5M`, `1,204`
//! or `12.3%`. This module locates those strings next to their labels and
//! turns them into numbers. Every function here is total: anything that
//! cannot be located or parsed becomes `None` and is stored as a null field.

use regex::Regex;
use scraper::{ElementRef, Html};

/// Convert a display string into a number.
///
/// Thousands separators, `$` and `%` are stripped along with surrounding
/// whitespace. A trailing `K`, `M` or `B` scales the prefix by 1e3, 1e6 or
/// 1e9. Suffixes are case-sensitive as rendered by the source pages.
#[must_use]
pub fn normalize(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    let cleaned = cleaned.trim();

    let (number, multiplier) = match cleaned.chars().last()? {
        'K' => (&cleaned[..cleaned.len() - 1], 1e3),
        'M' => (&cleaned[..cleaned.len() - 1], 1e6),
        'B' => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned, 1.0),
    };

    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value * multiplier)
}

/// Normalize a value that is stored as an integer count (wins, trades).
#[must_use]
pub fn normalize_count(raw: &str) -> Option<i64> {
    normalize(raw).map(|value| value.round() as i64)
}

/// A label-anchored field: an element named `label_tag` whose own text
/// matches `label`, followed in document order by a `value_tag` element
/// carrying the value.
#[derive(Debug, Clone)]
pub struct LabeledField {
    pub label_tag: String,
    pub label: Regex,
    pub value_tag: String,
}

impl LabeledField {
    /// Build a field whose label matches `label` case-insensitively.
    ///
    /// The label text is matched literally, so `Avg. Trade Size` does not
    /// treat `.` as a wildcard.
    pub fn new(label_tag: &str, label: &str, value_tag: &str) -> Result<Self, regex::Error> {
        let pattern = format!("(?i){}", regex::escape(label));
        Ok(Self {
            label_tag: label_tag.to_string(),
            label: Regex::new(&pattern)?,
            value_tag: value_tag.to_string(),
        })
    }

    /// Raw value text next to the label, trimmed.
    #[must_use]
    pub fn locate(&self, document: &Html) -> Option<String> {
        let mut elements = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap);

        elements.by_ref().find(|element| {
            element.value().name() == self.label_tag
                && own_text(*element).is_some_and(|text| self.label.is_match(&text))
        })?;

        // Remaining iteration continues in document order after the label
        elements
            .find(|element| element.value().name() == self.value_tag)
            .map(|element| element.text().collect::<String>().trim().to_string())
    }

    #[must_use]
    pub fn number(&self, document: &Html) -> Option<f64> {
        self.locate(document).as_deref().and_then(normalize)
    }

    #[must_use]
    pub fn count(&self, document: &Html) -> Option<i64> {
        self.locate(document).as_deref().and_then(normalize_count)
    }
}

/// Text an element carries by itself: a single text child, or the own text
/// of a single child element. Elements with mixed content have no own text.
fn own_text(element: ElementRef<'_>) -> Option<String> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }

    if let Some(text) = only.value().as_text() {
        return Some(text.text.to_string());
    }
    ElementRef::wrap(only).and_then(own_text)
}
