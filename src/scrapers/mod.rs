//! Source adapters for the regulators we track.
//!
//! Every adapter turns one external source into a batch of
//! [`Record`]s and isolates its own failures: a network error, a bad status
//! or a page whose structure no longer matches yields an empty (or partial)
//! batch and a log line, never an error.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | OSFI | [`osfi`] | HTML scraping | Listing rows; article pages fetched for missing summaries |
//! | FCAC | [`fcac`] | Atom feed | GC news API; RSS 2.0 also accepted |
//! | IAIS | [`iais`] | HTML scraping | `h5` headings mark item boundaries |
//!
//! # Common Patterns
//!
//! Each adapter module exports:
//! - a pure parser (`parse_listing`, `parse_feed`, `parse_page`) over the
//!   fetched body
//! - an adapter struct with `fetch()`, generic over a [`PageFetcher`]
//!
//! [`SourceAdapter`] wraps the three adapters behind one type and
//! [`adapters_for`] is the registry keyed by [`Source`].

use crate::config::Settings;
use crate::fetch::PageFetcher;
use crate::models::{Record, Source};
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use scraper::{ElementRef, Selector};
use url::Url;

pub mod fcac;
pub mod iais;
pub mod osfi;

pub use fcac::FcacFeed;
pub use iais::IaisScraper;
pub use osfi::OsfiScraper;

/// One of the three source adapters.
#[derive(Debug, Clone)]
pub enum SourceAdapter<F> {
    Osfi(OsfiScraper<F>),
    Fcac(FcacFeed<F>),
    Iais(IaisScraper<F>),
}

impl<F: PageFetcher> SourceAdapter<F> {
    /// Build the adapter for `source`.
    pub fn new(source: Source, fetcher: F, settings: &Settings) -> Self {
        match source {
            Source::Osfi => SourceAdapter::Osfi(OsfiScraper::new(fetcher, settings)),
            Source::Fcac => SourceAdapter::Fcac(FcacFeed::new(fetcher, settings)),
            Source::Iais => SourceAdapter::Iais(IaisScraper::new(fetcher, settings)),
        }
    }

    pub fn source(&self) -> Source {
        match self {
            SourceAdapter::Osfi(_) => Source::Osfi,
            SourceAdapter::Fcac(_) => Source::Fcac,
            SourceAdapter::Iais(_) => Source::Iais,
        }
    }

    /// Produce the current batch of records from this source.
    pub async fn fetch(&self) -> Vec<Record> {
        match self {
            SourceAdapter::Osfi(a) => a.fetch().await,
            SourceAdapter::Fcac(a) => a.fetch().await,
            SourceAdapter::Iais(a) => a.fetch().await,
        }
    }
}

/// Build the adapters for a sync cycle.
///
/// # Arguments
///
/// * `sources` - Sources to run; repeats are ignored
/// * `fetcher` - Fetcher cloned into each adapter
/// * `settings` - URLs and timeouts
///
/// # Returns
///
/// One adapter per distinct source, in the order first given.
pub fn adapters_for<F>(sources: &[Source], fetcher: &F, settings: &Settings) -> Vec<SourceAdapter<F>>
where
    F: PageFetcher + Clone,
{
    sources
        .iter()
        .unique()
        .map(|source| SourceAdapter::new(*source, fetcher.clone(), settings))
        .collect()
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// First descendant of `element` matching `selector`, in document order.
pub(crate) fn first_match<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// Resolve `href` against the site origin; `None` for empty or unusable
/// values.
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|url| url.to_string())
}

/// The element immediately following `element` among its siblings,
/// skipping text and comments.
pub(crate) fn next_sibling_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// First element named `name` after the start of `element` in document
/// order: its own descendants, then each following sibling subtree, then the
/// following siblings of each ancestor.
pub(crate) fn find_next_element<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    let matches = |e: &ElementRef<'a>| e.value().name() == name;

    if let Some(found) = element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(matches)
    {
        return Some(found);
    }

    let mut node = Some(*element);
    while let Some(current) = node {
        for sibling in current.next_siblings() {
            if let Some(found) = sibling.descendants().filter_map(ElementRef::wrap).find(matches) {
                return Some(found);
            }
        }
        node = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use scraper::Html;

    #[test]
    fn test_adapters_for_keeps_order_and_dedupes() {
        let settings = Settings::default();
        let adapters = adapters_for(
            &[Source::Iais, Source::Osfi, Source::Iais],
            &StaticFetcher::new(),
            &settings,
        );
        let sources: Vec<Source> = adapters.iter().map(|a| a.source()).collect();
        assert_eq!(sources, vec![Source::Iais, Source::Osfi]);
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://www.iais.org").unwrap();
        assert_eq!(resolve_link(&base, "/a/b").as_deref(), Some("https://www.iais.org/a/b"));
        assert_eq!(resolve_link(&base, "a/b").as_deref(), Some("https://www.iais.org/a/b"));
        assert_eq!(
            resolve_link(&base, "https://example.org/x").as_deref(),
            Some("https://example.org/x")
        );
        assert_eq!(resolve_link(&base, "   "), None);
    }

    #[test]
    fn test_find_next_element_walks_document_order() {
        let html = Html::parse_document(
            r#"<div><div id="wrap"><h5 id="start">T</h5><span>s</span></div><div><p id="target">p</p></div></div>"#,
        );
        let start = html.select(&Selector::parse("#start").unwrap()).next().unwrap();
        let found = find_next_element(start, "p").unwrap();
        assert_eq!(found.value().id(), Some("target"));
        assert_eq!(next_sibling_element(start).unwrap().value().name(), "span");
    }

    #[test]
    fn test_find_next_element_none() {
        let html = Html::parse_document(r#"<p>before</p><h5 id="start">T</h5>"#);
        let start = html.select(&Selector::parse("#start").unwrap()).next().unwrap();
        assert!(find_next_element(start, "p").is_none());
    }

    #[tokio::test]
    async fn test_adapter_fetch_dispatch_isolates_failures() {
        let settings = Settings::default();
        for source in Source::ALL {
            let adapter = SourceAdapter::new(source, StaticFetcher::new(), &settings);
            assert!(adapter.fetch().await.is_empty());
        }
    }
}
