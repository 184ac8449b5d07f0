//! IAIS latest-news scraper.
//!
//! The [IAIS news page](https://www.iais.org/news-and-events/latest-news/)
//! has no row containers; each item starts at an `h5` heading holding the
//! title link. Date and summary are read from what follows the heading:
//!
//! - date: `D Month YYYY` in the next sibling element, then in the heading
//!   itself, then today
//! - summary: the next sibling if it is a `p`, otherwise the first `p`
//!   anywhere after the heading; short or empty text is replaced by a
//!   generic placeholder

use crate::config::Settings;
use crate::fetch::PageFetcher;
use crate::models::{Record, Source};
use crate::scrapers::{element_text, find_next_element, first_match, next_sibling_element, resolve_link};
use crate::utils::{collapse_whitespace, today_display, truncate_summary};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

pub const IAIS_ORIGIN: &str = "https://www.iais.org";

pub const IAIS_PLACEHOLDER: &str =
    "Regulatory update from IAIS regarding insurance standards and ICPs.";

/// Summaries shorter than this are replaced by [`IAIS_PLACEHOLDER`].
const MIN_SUMMARY_CHARS: usize = 20;

static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h5").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}\s+[A-Z][a-z]+\s+\d{4})").unwrap());

fn match_date(text: &str) -> Option<String> {
    DATE_RE.captures(text).map(|caps| caps[1].to_string())
}

fn extract_date(heading: ElementRef<'_>, sibling: Option<ElementRef<'_>>) -> String {
    sibling
        .and_then(|s| match_date(&s.text().collect::<String>()))
        .or_else(|| match_date(&heading.text().collect::<String>()))
        .unwrap_or_else(today_display)
}

fn extract_summary(heading: ElementRef<'_>, sibling: Option<ElementRef<'_>>) -> String {
    let paragraph = match sibling {
        Some(s) if s.value().name() == "p" => Some(s),
        _ => find_next_element(heading, "p"),
    };
    let summary = paragraph.map(element_text).unwrap_or_default();
    if summary.chars().count() < MIN_SUMMARY_CHARS {
        return IAIS_PLACEHOLDER.to_string();
    }
    truncate_summary(&summary, Source::Iais.summary_cap())
}

/// Parse the news page into records, one per `h5` heading with a link.
///
/// # Arguments
///
/// * `html` - The news page body
///
/// # Returns
///
/// Finished records in page order, dates and summaries already resolved
/// through their fallbacks. Headings without a link are skipped.
pub fn parse_page(html: &str) -> Vec<Record> {
    let base = match Url::parse(IAIS_ORIGIN) {
        Ok(base) => base,
        Err(_) => return Vec::new(),
    };
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    for heading in document.select(&HEADING_SELECTOR) {
        let Some(anchor) = first_match(heading, &ANCHOR_SELECTOR) else {
            continue;
        };
        let Some(link) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(&base, href))
        else {
            debug!("IAIS heading link without usable href");
            continue;
        };
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let sibling = next_sibling_element(heading);
        records.push(Record::new(
            Source::Iais,
            title,
            extract_date(heading, sibling),
            link,
            extract_summary(heading, sibling),
        ));
    }
    records
}

/// Source adapter for IAIS.
#[derive(Debug, Clone)]
pub struct IaisScraper<F> {
    fetcher: F,
    url: String,
    timeout: Duration,
}

impl<F: PageFetcher> IaisScraper<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            url: settings.iais_url.clone(),
            timeout: settings.page_timeout(),
        }
    }

    /// Scrape the news page. Never fails: errors are logged and yield an
    /// empty batch.
    #[instrument(level = "info", skip_all, fields(source = "IAIS", url = %self.url))]
    pub async fn fetch(&self) -> Vec<Record> {
        match self.fetcher.get_text(&self.url, self.timeout).await {
            Ok(html) => {
                let records = parse_page(&html);
                info!(count = records.len(), "Scraped IAIS updates");
                records
            }
            Err(e) => {
                error!(error = %e, "IAIS fetch failed");
                Vec::new()
            }
        }
    }
}
