// ABOUTME: Extracts per-sign predictions from a horoscope article's HTML.
// ABOUTME: Locates the content section, finds the HORÓSCOPO heading, and walks its paragraph block.

//! HTML extraction.
//!
//! Key behaviors:
//! - The content section is the first `div` whose class contains the
//!   configured marker; without one the whole document is scanned.
//! - Only `h2` elements whose text carries `HORÓSCOPO` (accent-insensitive)
//!   open a block.
//! - A block is the run of `p` siblings after the heading, up to the next `h2`.
//! - Paragraphs without a sign header are skipped, never fatal.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::signs::{sign_from_heading, split_prediction, Sign};

/// Default class marker of the article body container.
pub const DEFAULT_SECTION_MARKER: &str = "container__body";

static HEADING_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HOR[ÓO]SCOP[OÓ]").expect("heading token pattern is valid"));

static DIV_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[class]").expect("div selector is valid"));

static H2_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2").expect("h2 selector is valid"));

/// One extracted prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub sign: Sign,
    pub prediction: String,
}

/// Which heading block supplies the predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPolicy {
    /// Walk only the first eligible heading; an empty block means an empty result.
    #[default]
    FirstHeading,
    /// Try headings in order and keep the first block that yields anything.
    FirstProductive,
}

/// Extraction knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub section_marker: String,
    pub block_policy: BlockPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            section_marker: DEFAULT_SECTION_MARKER.to_string(),
            block_policy: BlockPolicy::FirstHeading,
        }
    }
}

/// Joins an element's text nodes with single spaces, collapsing whitespace.
pub fn normalized_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the heading text carries the HORÓSCOPO token.
pub fn is_horoscope_heading(text: &str) -> bool {
    HEADING_TOKEN_RE.is_match(&text.to_uppercase())
}

/// Finds the article body container, falling back to the document root.
pub fn locate_section<'a>(doc: &'a Html, marker: &str) -> ElementRef<'a> {
    doc.select(&DIV_SELECTOR)
        .find(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| class.contains(marker))
        })
        .unwrap_or_else(|| {
            debug!(marker, "section marker not found, scanning whole document");
            doc.root_element()
        })
}

/// Lists the `h2` elements in `section` that announce a horoscope, in document order.
pub fn horoscope_headings<'a>(section: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    section
        .select(&H2_SELECTOR)
        .filter(|h2| is_horoscope_heading(&normalized_text(h2)))
        .collect()
}

/// Collects the `p` siblings after `heading` up to the next `h2`.
pub fn collect_block<'a>(heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut paragraphs = Vec::new();
    for node in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        match el.value().name() {
            "h2" => break,
            "p" => paragraphs.push(el),
            _ => {}
        }
    }
    paragraphs
}

/// Turns one heading block into predictions, skipping paragraphs without a sign header.
pub fn predictions_from_block(paragraphs: &[ElementRef]) -> Vec<Prediction> {
    let mut out = Vec::new();
    for p in paragraphs {
        let text = normalized_text(p);
        if text.is_empty() {
            continue;
        }
        match split_prediction(&text) {
            Some((sign, prediction)) => out.push(Prediction { sign, prediction }),
            None => debug!(paragraph = %truncate(&text, 60), "no sign prediction in paragraph"),
        }
    }
    out
}

/// Extracts predictions from `html` with default options.
pub fn extract_predictions(html: &str) -> Vec<Prediction> {
    extract_predictions_with(html, &ExtractOptions::default())
}

/// Extracts predictions from `html`.
///
/// Returns an empty list when no heading is found or the chosen block holds
/// no sign paragraphs.
pub fn extract_predictions_with(html: &str, opts: &ExtractOptions) -> Vec<Prediction> {
    let doc = Html::parse_document(html);
    let section = locate_section(&doc, &opts.section_marker);
    let headings = horoscope_headings(section);

    if headings.is_empty() {
        debug!("no horoscope heading found");
        return Vec::new();
    }

    for heading in headings {
        let heading_text = normalized_text(&heading);
        debug!(
            heading = %heading_text,
            sign = ?sign_from_heading(&heading_text),
            "walking horoscope block"
        );

        let predictions = predictions_from_block(&collect_block(heading));
        debug!(count = predictions.len(), "block walked");

        match opts.block_policy {
            BlockPolicy::FirstHeading => return predictions,
            BlockPolicy::FirstProductive if !predictions.is_empty() => return predictions,
            BlockPolicy::FirstProductive => continue,
        }
    }

    Vec::new()
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
