//! OSFI news page scraper.
//!
//! Scrapes the [OSFI news listing](https://www.osfi-bsif.gc.ca/en/news), a
//! Drupal views page. The markup has changed over time, so every field is
//! located through an ordered chain of fallbacks:
//!
//! | Field | Strategies, in order |
//! |-------|----------------------|
//! | rows | `.views-row`, then `article` |
//! | title | first `h3 a` / `h2 a` in the row |
//! | date | `time` / `.views-field-created` / `.date` element, then a `Month D, YYYY` match in the row text, then today |
//! | summary | `.views-field-body` / `p` in the row, then the article page body (when the listing summary is missing or short), then `.news--content`, then a placeholder |
//!
//! Rows pointing at a link already seen in the same listing are skipped
//! before any further work (including the article page fetch).

use crate::config::Settings;
use crate::fetch::PageFetcher;
use crate::models::{Record, Source};
use crate::scrapers::{element_text, first_match, resolve_link};
use crate::utils::{today_display, truncate_summary};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Site origin relative links are resolved against.
pub const OSFI_ORIGIN: &str = "https://www.osfi-bsif.gc.ca";

/// Summary used when no strategy produced any text.
pub const OSFI_PLACEHOLDER: &str = "No summary available.";

/// Listing summaries shorter than this trigger an article page fetch.
const MIN_LISTING_SUMMARY_CHARS: usize = 50;

static ROW_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".views-row", "article"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 a, h2 a").unwrap());
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time, .views-field-created, .date").unwrap());
static SUMMARY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".views-field-body, p").unwrap());
static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".news--content").unwrap());
static DETAIL_BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".field--name-body, .node__content, article p").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z][a-z]+ \d{1,2}, \d{4})").unwrap());

/// One listing row, with everything that can be read without leaving the
/// index page.
#[derive(Debug, Clone, PartialEq)]
pub struct OsfiListing {
    pub title: String,
    pub link: String,
    pub date: String,
    /// Summary found in the row itself (possibly empty).
    pub summary: String,
    /// Text of the row's `.news--content` block (possibly empty).
    pub content: String,
}

impl OsfiListing {
    /// Whether the listing summary is too weak to keep without looking at
    /// the article page.
    pub fn needs_detail(&self) -> bool {
        self.summary.is_empty()
            || self.summary.contains("No summary")
            || self.summary.chars().count() < MIN_LISTING_SUMMARY_CHARS
    }

    /// Finish the summary chain and build the record.
    ///
    /// `detail` is the article page summary, `None` when it was not needed,
    /// not fetched or not found.
    pub fn into_record(self, detail: Option<String>) -> Record {
        let mut summary = match detail {
            Some(text) => text,
            None => self.summary,
        };
        if summary.is_empty() {
            summary = self.content;
        }
        if summary.is_empty() {
            summary = OSFI_PLACEHOLDER.to_string();
        }
        let summary = truncate_summary(&summary, Source::Osfi.summary_cap());
        Record::new(Source::Osfi, self.title, self.date, self.link, summary)
    }
}

/// Select listing rows, trying each row selector until one matches.
fn select_rows(document: &Html) -> Vec<ElementRef<'_>> {
    ROW_SELECTORS
        .iter()
        .map(|selector| document.select(selector).collect::<Vec<_>>())
        .find(|rows| !rows.is_empty())
        .unwrap_or_default()
}

fn extract_date(row: ElementRef<'_>) -> String {
    if let Some(date) = first_match(row, &DATE_SELECTOR).map(element_text) {
        if !date.is_empty() {
            return date;
        }
    }
    let text: String = row.text().collect();
    match DATE_RE.captures(&text) {
        Some(caps) => caps[1].to_string(),
        None => today_display(),
    }
}

/// Parse the news listing into rows, deduplicated by link.
///
/// Rows without a title anchor, a usable `href` or title text are skipped.
/// Only the first row for a given absolute link is kept.
///
/// # Arguments
///
/// * `html` - The listing page body
///
/// # Returns
///
/// One [`OsfiListing`] per distinct article, in page order. A page with no
/// recognisable rows yields an empty vector.
pub fn parse_listing(html: &str) -> Vec<OsfiListing> {
    let base = match Url::parse(OSFI_ORIGIN) {
        Ok(base) => base,
        Err(_) => return Vec::new(),
    };
    let document = Html::parse_document(html);
    let rows = select_rows(&document);
    debug!(rows = rows.len(), "OSFI listing rows");

    let mut seen = HashSet::new();
    let mut listings = Vec::new();
    for row in rows {
        let Some(anchor) = first_match(row, &TITLE_SELECTOR) else {
            continue;
        };
        let Some(link) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(&base, href))
        else {
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }
        let title = element_text(anchor);
        if title.is_empty() {
            continue;
        }

        listings.push(OsfiListing {
            title,
            link,
            date: extract_date(row),
            summary: first_match(row, &SUMMARY_SELECTOR)
                .map(element_text)
                .unwrap_or_default(),
            content: first_match(row, &CONTENT_SELECTOR)
                .map(element_text)
                .unwrap_or_default(),
        });
    }
    listings
}

/// Summary text from an article page body, if the page has one.
pub fn parse_detail_summary(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&DETAIL_BODY_SELECTOR)
        .next()
        .map(element_text)
}

/// Source adapter for OSFI.
#[derive(Debug, Clone)]
pub struct OsfiScraper<F> {
    fetcher: F,
    index_url: String,
    page_timeout: Duration,
    detail_timeout: Duration,
}

impl<F: PageFetcher> OsfiScraper<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            index_url: settings.osfi_url.clone(),
            page_timeout: settings.page_timeout(),
            detail_timeout: settings.detail_timeout(),
        }
    }

    /// Scrape the listing. Never fails: errors are logged and yield an empty
    /// batch.
    #[instrument(level = "info", skip_all, fields(source = "OSFI", url = %self.index_url))]
    pub async fn fetch(&self) -> Vec<Record> {
        let html = match self.fetcher.get_text(&self.index_url, self.page_timeout).await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "OSFI listing fetch failed");
                return Vec::new();
            }
        };

        let listings = parse_listing(&html);
        let mut records = Vec::with_capacity(listings.len());
        for listing in listings {
            let detail = if listing.needs_detail() {
                self.fetch_detail(&listing.link).await
            } else {
                None
            };
            records.push(listing.into_record(detail));
        }

        info!(count = records.len(), "Scraped OSFI updates");
        records
    }

    /// Article page summary. Failures fall through to the next strategy.
    async fn fetch_detail(&self, link: &str) -> Option<String> {
        match self.fetcher.get_text(link, self.detail_timeout).await {
            Ok(html) => parse_detail_summary(&html),
            Err(e) => {
                debug!(%link, error = %e, "OSFI article fetch failed; using listing summary");
                None
            }
        }
    }
}

impl<F> OsfiScraper<F> {
    /// Build with an explicit listing URL.
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }
}
