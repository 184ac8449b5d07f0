//! FCAC news feed reader.
//!
//! FCAC announcements come from the Government of Canada news API as an
//! Atom feed. Entries map to records directly; the only work is date and
//! summary normalization:
//!
//! - date: `published` (else `updated`) parsed as RFC 3339, RFC 2822 or a
//!   bare ISO date and rendered as `"March 04, 2025"`; unparseable values are
//!   kept verbatim
//! - summary: entities unescaped, tags stripped, whitespace collapsed,
//!   capped at 300 characters
//!
//! RSS 2.0 payloads (`<rss><channel><item>`) are accepted as well.

use crate::config::Settings;
use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::models::{Record, Source};
use crate::utils::{DISPLAY_DATE_FORMAT, collapse_whitespace, strip_tags, truncate_summary, unescape_html};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const FCAC_PLACEHOLDER: &str = "No summary available.";

const UNTITLED: &str = "No title";

#[derive(Debug, Default, Deserialize)]
struct TextElement {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextElement>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextElement>,
    content: Option<TextElement>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<TextElement>,
    link: Option<TextElement>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<TextElement>,
}

/// A feed entry before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub date: String,
    pub summary: String,
}

impl AtomEntry {
    /// Prefer the `alternate` link (explicit or implied), else the first one.
    fn link(&self) -> String {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default()
    }

    fn into_entry(self) -> FeedEntry {
        let link = self.link();
        FeedEntry {
            title: self.title.map(|t| t.text).unwrap_or_default(),
            link,
            date: self.published.or(self.updated).unwrap_or_default(),
            summary: self
                .summary
                .or(self.content)
                .map(|s| s.text)
                .unwrap_or_default(),
        }
    }
}

impl RssItem {
    fn into_entry(self) -> FeedEntry {
        FeedEntry {
            title: self.title.map(|t| t.text).unwrap_or_default(),
            link: self.link.map(|l| l.text.trim().to_string()).unwrap_or_default(),
            date: self.pub_date.unwrap_or_default(),
            summary: self.description.map(|d| d.text).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Atom,
    Rss,
}

/// Feed flavour, from the name of the document's root element.
///
/// Anything that is not `<rss>` (including unreadable input) is treated as
/// Atom and left for the decoder to reject.
fn detect_format(xml: &str) -> FeedFormat {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return if e.local_name().as_ref() == b"rss" {
                    FeedFormat::Rss
                } else {
                    FeedFormat::Atom
                };
            }
            Ok(Event::Eof) | Err(_) => return FeedFormat::Atom,
            Ok(_) => {}
        }
    }
}

/// Decode an Atom or RSS 2.0 document into raw entries.
///
/// # Arguments
///
/// * `xml` - The feed body as fetched
///
/// # Returns
///
/// The entries in document order, untouched apart from trimming links, or
/// [`FetchError::Feed`] when the document does not decode.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    match detect_format(xml) {
        FeedFormat::Rss => {
            let doc: RssDocument = quick_xml::de::from_str(xml)?;
            Ok(doc.channel.items.into_iter().map(RssItem::into_entry).collect())
        }
        FeedFormat::Atom => {
            let feed: AtomFeed = quick_xml::de::from_str(xml)?;
            Ok(feed.entries.into_iter().map(AtomEntry::into_entry).collect())
        }
    }
}

/// Render a feed timestamp as `"March 04, 2025"`, or return it unchanged
/// when no known format matches.
pub fn normalize_feed_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(&trimmed.replace('Z', "+00:00"))
        .or_else(|_| DateTime::parse_from_rfc2822(trimmed))
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"));
    match parsed {
        Ok(date) => date.format(DISPLAY_DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Plain-text summary from a feed summary that may carry (escaped) markup.
pub fn clean_summary(raw: &str) -> String {
    let text = collapse_whitespace(&strip_tags(&unescape_html(raw)));
    if text.is_empty() {
        return FCAC_PLACEHOLDER.to_string();
    }
    truncate_summary(&text, Source::Fcac.summary_cap())
}

/// Normalize a raw entry. Entries without a link cannot be keyed and are
/// dropped.
pub fn entry_to_record(entry: FeedEntry) -> Option<Record> {
    if entry.link.is_empty() {
        warn!(title = %entry.title, "FCAC entry without link; skipping");
        return None;
    }
    let title = match collapse_whitespace(&entry.title) {
        t if t.is_empty() => UNTITLED.to_string(),
        t => t,
    };
    Some(Record::new(
        Source::Fcac,
        title,
        normalize_feed_date(&entry.date),
        entry.link,
        clean_summary(&entry.summary),
    ))
}

/// Source adapter for FCAC.
#[derive(Debug, Clone)]
pub struct FcacFeed<F> {
    fetcher: F,
    url: String,
    timeout: Duration,
}

impl<F: PageFetcher> FcacFeed<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            url: settings.fcac_feed_url.clone(),
            timeout: settings.page_timeout(),
        }
    }

    /// Read the feed. Never fails: errors are logged and yield an empty
    /// batch.
    #[instrument(level = "info", skip_all, fields(source = "FCAC"))]
    pub async fn fetch(&self) -> Vec<Record> {
        match self.try_fetch().await {
            Ok(records) => {
                info!(count = records.len(), "Read FCAC feed");
                records
            }
            Err(e) => {
                error!(error = %e, "FCAC feed failed");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<Record>, FetchError> {
        let xml = self.fetcher.get_text(&self.url, self.timeout).await?;
        let entries = parse_feed(&xml)?;
        debug!(entries = entries.len(), "Decoded FCAC feed");
        Ok(entries.into_iter().filter_map(entry_to_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::models::RecordType;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Financial Consumer Agency of Canada</title>
  <updated>2025-03-05T12:00:00Z</updated>
  <entry>
    <title type="text">FCAC   publishes
      guidance on auto loans</title>
    <link rel="related" href="https://www.canada.ca/related"/>
    <link href="https://www.canada.ca/en/financial-consumer-agency/news/2025/03/auto-loans.html"/>
    <published>2025-03-04T14:30:00Z</published>
    <updated>2025-03-05T09:00:00Z</updated>
    <summary type="html">&lt;p&gt;New guidance for &lt;b&gt;lenders&lt;/b&gt; &amp;amp; consumers.&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Updated only</title>
    <link rel="alternate" href="https://www.canada.ca/en/news/2"/>
    <updated>2024-11-20T08:00:00-05:00</updated>
  </entry>
  <entry>
    <title>Odd date</title>
    <link href="https://www.canada.ca/en/news/3"/>
    <published>sometime last week</published>
    <summary></summary>
  </entry>
  <entry>
    <title>No link</title>
    <published>2025-01-01T00:00:00Z</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let entries = parse_feed(ATOM).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[0].link,
            "https://www.canada.ca/en/financial-consumer-agency/news/2025/03/auto-loans.html"
        );
        assert_eq!(entries[0].date, "2025-03-04T14:30:00Z");
        assert_eq!(entries[1].date, "2024-11-20T08:00:00-05:00");
        assert!(entries[3].link.is_empty());
    }

    #[test]
    fn test_entries_to_records() {
        let records: Vec<Record> = parse_feed(ATOM)
            .unwrap()
            .into_iter()
            .filter_map(entry_to_record)
            .collect();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.title, "FCAC publishes guidance on auto loans");
        assert_eq!(first.date, "March 04, 2025");
        assert_eq!(first.summary, "New guidance for lenders & consumers.");
        assert_eq!(first.source, Source::Fcac);
        assert_eq!(first.kind, RecordType::RssFeed);

        assert_eq!(records[1].date, "November 20, 2024");
        assert_eq!(records[1].summary, FCAC_PLACEHOLDER);

        assert_eq!(records[2].date, "sometime last week");
        assert_eq!(records[2].summary, FCAC_PLACEHOLDER);
    }

    #[test]
    fn test_parse_rss_feed() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>FCAC</title>
  <item>
    <title>Budgeting tools</title>
    <link>https://www.canada.ca/en/news/rss-1</link>
    <pubDate>Tue, 04 Mar 2025 10:00:00 +0000</pubDate>
    <description><![CDATA[<p>Try the <a href="/budget">budget planner</a>.</p>]]></description>
  </item>
</channel></rss>"#;
        let records: Vec<Record> = parse_feed(rss)
            .unwrap()
            .into_iter()
            .filter_map(entry_to_record)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "March 04, 2025");
        assert_eq!(records[0].summary, "Try the budget planner.");
    }

    #[test]
    fn test_normalize_feed_date() {
        assert_eq!(normalize_feed_date("2025-03-04T14:30:00Z"), "March 04, 2025");
        assert_eq!(normalize_feed_date("2025-03-04T14:30:00+00:00"), "March 04, 2025");
        assert_eq!(normalize_feed_date("2025-03-04T22:30:00-05:00"), "March 05, 2025");
        assert_eq!(normalize_feed_date("2025-03-04T14:30:00"), "March 04, 2025");
        assert_eq!(normalize_feed_date("2025-03-04"), "March 04, 2025");
        assert_eq!(normalize_feed_date("Tue, 04 Mar 2025 10:00:00 GMT"), "March 04, 2025");
        assert_eq!(normalize_feed_date("not a date"), "not a date");
        assert_eq!(normalize_feed_date(""), "");
    }

    #[test]
    fn test_clean_summary_cap() {
        let raw = format!("<p>{}</p>", "consumer ".repeat(60));
        let summary = clean_summary(&raw);
        assert_eq!(summary.chars().count(), 300);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_untitled_entry() {
        let record = entry_to_record(FeedEntry {
            link: "https://x/1".into(),
            ..FeedEntry::default()
        })
        .unwrap();
        assert_eq!(record.title, "No title");
    }

    #[test]
    fn test_atom_feed_mentioning_rss_in_content() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- served as <rss> by mistake in 2023 -->
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Subscribe to our feeds</title>
    <link href="https://www.canada.ca/en/news/feeds"/>
    <published>2025-03-04T14:30:00Z</published>
    <summary type="html"><![CDATA[Use the <rss> link on any news page.]]></summary>
  </entry>
</feed>"#;
        assert_eq!(detect_format(atom), FeedFormat::Atom);
        let entries = parse_feed(atom).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://www.canada.ca/en/news/feeds");
    }

    #[test]
    fn test_detect_format_from_root() {
        assert_eq!(detect_format(r#"<?xml version="1.0"?><rss version="2.0"/>"#), FeedFormat::Rss);
        assert_eq!(detect_format("<feed/>"), FeedFormat::Atom);
        assert_eq!(detect_format(""), FeedFormat::Atom);
    }

    #[test]
    fn test_malformed_feed_is_error() {
        assert!(parse_feed("<feed><entry><title>broken</entry></feed>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_reads_feed() {
        let settings = Settings::default();
        let fetcher = StaticFetcher::new().with_page(settings.fcac_feed_url.clone(), ATOM);
        let records = FcacFeed::new(fetcher, &settings).fetch().await;
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_swallows_bad_xml() {
        let settings = Settings::default();
        let fetcher = StaticFetcher::new().with_page(settings.fcac_feed_url.clone(), "<feed><entry>");
        assert!(FcacFeed::new(fetcher, &settings).fetch().await.is_empty());
    }
}
