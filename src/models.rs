//! Data models for normalized regulatory records.
//!
//! Every source adapter produces [`Record`]s of the same shape regardless of
//! whether the data came from a scraped HTML page or a syndication feed:
//! - [`Record`]: one regulatory announcement, keyed by its `link`
//! - [`Source`]: the regulator the record was ingested from
//! - [`RecordType`]: how the record was extracted
//!
//! The serialized field names (`type` in particular) and the enum spellings
//! (`"OSFI"`, `"Web Scraping"`, ...) are the on-disk format of the store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Regulator a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "OSFI")]
    Osfi,
    #[serde(rename = "FCAC")]
    Fcac,
    #[serde(rename = "IAIS")]
    Iais,
}

impl Source {
    /// All known sources, in the order a sync cycle runs them.
    pub const ALL: [Source; 3] = [Source::Osfi, Source::Fcac, Source::Iais];

    /// Short identifier used in the store and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Source::Osfi => "OSFI",
            Source::Fcac => "FCAC",
            Source::Iais => "IAIS",
        }
    }

    /// Full name of the regulator.
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Osfi => "Office of the Superintendent of Financial Institutions",
            Source::Fcac => "Financial Consumer Agency of Canada",
            Source::Iais => "International Association of Insurance Supervisors",
        }
    }

    /// Public homepage of the regulator.
    pub fn homepage(&self) -> &'static str {
        match self {
            Source::Osfi => "https://www.osfi-bsif.gc.ca",
            Source::Fcac => "https://www.canada.ca/en/financial-consumer-agency.html",
            Source::Iais => "https://www.iais.org",
        }
    }

    /// Extraction method the adapter for this source uses.
    pub fn record_type(&self) -> RecordType {
        match self {
            Source::Fcac => RecordType::RssFeed,
            Source::Osfi | Source::Iais => RecordType::WebScraping,
        }
    }

    /// Maximum summary length (in characters, ellipsis included).
    pub fn summary_cap(&self) -> usize {
        match self.record_type() {
            RecordType::RssFeed => 300,
            RecordType::WebScraping => 400,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OSFI" => Ok(Source::Osfi),
            "FCAC" => Ok(Source::Fcac),
            "IAIS" => Ok(Source::Iais),
            other => Err(format!("unknown source `{other}` (expected OSFI, FCAC or IAIS)")),
        }
    }
}

/// How a record was extracted from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "Web Scraping")]
    WebScraping,
    #[serde(rename = "RSS Feed")]
    RssFeed,
}

impl RecordType {
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::WebScraping => "Web Scraping",
            RecordType::RssFeed => "RSS Feed",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "webscraping" | "scraping" | "web" => Ok(RecordType::WebScraping),
            "rssfeed" | "rss" | "feed" => Ok(RecordType::RssFeed),
            _ => Err(format!("unknown record type `{s}` (expected `Web Scraping` or `RSS Feed`)")),
        }
    }
}

/// A single normalized regulatory announcement.
///
/// `link` is the identity of a record: the store never holds two records
/// with the same link, and `id` is derived from it with [`record_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier, a digest of `link`.
    pub id: String,
    /// Single-line display title.
    pub title: String,
    /// Publication date as displayed by the source (not guaranteed parseable).
    pub date: String,
    /// Absolute URL of the announcement.
    pub link: String,
    /// Plain-text summary, capped per source.
    pub summary: String,
    pub source: Source,
    #[serde(rename = "type")]
    pub kind: RecordType,
    /// When the adapter produced this record.
    ///
    /// Written as RFC 3339. Stores that carry offset-less ISO-8601 stamps
    /// (`2025-12-03T10:00:00.123456`) are read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Build a record for `source`, deriving `id` and `kind` and stamping the
    /// ingestion time.
    pub fn new(source: Source, title: String, date: String, link: String, summary: String) -> Self {
        Self {
            id: record_id(&link),
            title,
            date,
            link,
            summary,
            source,
            kind: source.record_type(),
            timestamp: Utc::now(),
        }
    }
}

/// Derive a record id from its link.
///
/// The id is the first 16 hex digits of the SHA-256 digest of the link, so
/// the same link maps to the same id in every process.
pub fn record_id(link: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(link.as_bytes()));
    digest[..16].to_string()
}

/// Parse an ingestion timestamp, with or without a UTC offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
}
