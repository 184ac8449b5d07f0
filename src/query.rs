//! Filtering and sorting over stored records.
//!
//! All functions here are pure and operate on an in-memory slice. Filters
//! preserve input order and commute with each other; sorting is stable and
//! is applied last by [`Query::run`].
//!
//! Date sorts compare the `date` display strings lexicographically. Dates
//! from different sources use different formats ("March 04, 2025" vs
//! "3 Dec 2025"), so date order is approximate, not chronological. The
//! ingestion-time sorts use `timestamp` and are exact.

use crate::models::{Record, RecordType, Source};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Keyword the auto insurance classifier looks for.
const AUTO_KEYWORD: &str = "auto";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// `date` string, descending.
    DateDesc,
    /// `date` string, ascending.
    DateAsc,
    /// Title A to Z, case-insensitive.
    TitleAsc,
    /// Title Z to A, case-insensitive.
    TitleDesc,
    /// Most recently ingested first.
    #[default]
    IngestedDesc,
    /// Earliest ingested first.
    IngestedAsc,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Records whose title or summary contains `keyword` (case-insensitive).
/// An absent or empty keyword keeps everything.
pub fn filter_by_keyword(records: &[Record], keyword: Option<&str>) -> Vec<Record> {
    let needle = match keyword {
        Some(k) if !k.is_empty() => k.to_lowercase(),
        _ => return records.to_vec(),
    };
    records
        .iter()
        .filter(|r| contains_ci(&r.title, &needle) || contains_ci(&r.summary, &needle))
        .cloned()
        .collect()
}

pub fn filter_by_source(records: &[Record], allowed: &[Source]) -> Vec<Record> {
    records
        .iter()
        .filter(|r| allowed.contains(&r.source))
        .cloned()
        .collect()
}

pub fn filter_by_type(records: &[Record], allowed: &[RecordType]) -> Vec<Record> {
    records
        .iter()
        .filter(|r| allowed.contains(&r.kind))
        .cloned()
        .collect()
}

/// Heuristic: "auto" appears in the title or summary, in any case.
///
/// This is a substring match and also fires on words like "authority" or
/// "automated"; treat it as a hint.
pub fn is_auto_insurance(record: &Record) -> bool {
    contains_ci(&record.title, AUTO_KEYWORD) || contains_ci(&record.summary, AUTO_KEYWORD)
}

pub fn filter_auto_insurance(records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| is_auto_insurance(r)).cloned().collect()
}

/// Stable sort by `mode`.
pub fn sort(records: &mut [Record], mode: SortMode) {
    let by_title = |a: &Record, b: &Record| a.title.to_lowercase().cmp(&b.title.to_lowercase());
    let cmp: Box<dyn Fn(&Record, &Record) -> Ordering> = match mode {
        SortMode::DateAsc => Box::new(|a: &Record, b: &Record| a.date.cmp(&b.date)),
        SortMode::DateDesc => Box::new(|a: &Record, b: &Record| b.date.cmp(&a.date)),
        SortMode::TitleAsc => Box::new(by_title),
        SortMode::TitleDesc => Box::new(move |a: &Record, b: &Record| by_title(b, a)),
        SortMode::IngestedAsc => Box::new(|a: &Record, b: &Record| a.timestamp.cmp(&b.timestamp)),
        SortMode::IngestedDesc => Box::new(|a: &Record, b: &Record| b.timestamp.cmp(&a.timestamp)),
    };
    records.sort_by(|a, b| cmp(a, b));
}

/// A complete view request: filters plus sort order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub keyword: Option<String>,
    pub sources: Vec<Source>,
    pub types: Vec<RecordType>,
    pub auto_only: bool,
    pub sort: SortMode,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            keyword: None,
            sources: Source::ALL.to_vec(),
            types: vec![RecordType::WebScraping, RecordType::RssFeed],
            auto_only: false,
            sort: SortMode::default(),
        }
    }
}

impl Query {
    /// Evaluate the query over a snapshot of the store.
    ///
    /// Keyword, source and type filters are applied in that order, then the
    /// auto insurance filter when `auto_only` is set, then the sort. The
    /// filters commute, so the order only affects how much work each does.
    ///
    /// # Arguments
    ///
    /// * `records` - The stored collection, typically from [`JsonStore::load`](crate::store::JsonStore::load)
    ///
    /// # Returns
    ///
    /// The matching records, cloned, in `self.sort` order.
    pub fn run(&self, records: &[Record]) -> Vec<Record> {
        let mut view = filter_by_keyword(records, self.keyword.as_deref());
        view = filter_by_source(&view, &self.sources);
        view = filter_by_type(&view, &self.types);
        if self.auto_only {
            view = filter_auto_insurance(&view);
        }
        sort(&mut view, self.sort);
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(source: Source, title: &str, summary: &str, date: &str) -> Record {
        Record::new(
            source,
            title.to_string(),
            date.to_string(),
            format!("https://x/{}", title.replace(' ', "-")),
            summary.to_string(),
        )
    }

    fn fixture() -> Vec<Record> {
        vec![
            record(Source::Osfi, "Capital Rules Update", "Revised capital guideline.", "December 3, 2025"),
            record(Source::Iais, "Auto Insurance Standards Review", "Motor coverage standards.", "3 Dec 2025"),
            record(Source::Fcac, "Consumer alert", "Watch for AUTO loan scams.", "March 04, 2025"),
            record(Source::Osfi, "b-side memo", "Nothing relevant here.", "April 01, 2025"),
        ]
    }

    fn titles(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_keyword_scenario() {
        let store = vec![
            record(Source::Osfi, "Capital Rules Update", "Revised capital guideline.", "d"),
            record(Source::Iais, "Auto Insurance Standards Review", "Standards.", "d"),
        ];
        let hits = filter_by_keyword(&store, Some("auto"));
        assert_eq!(titles(&hits), vec!["Auto Insurance Standards Review"]);
        assert!(is_auto_insurance(&store[1]));
        assert!(!is_auto_insurance(&store[0]));
    }

    #[test]
    fn test_keyword_matches_title_or_summary_case_insensitive() {
        let hits = filter_by_keyword(&fixture(), Some("AuTo"));
        assert_eq!(titles(&hits), vec!["Auto Insurance Standards Review", "Consumer alert"]);
        let expected: Vec<Record> = fixture().into_iter().filter(is_auto_insurance).collect();
        assert_eq!(titles(&hits), titles(&expected));
    }

    #[test]
    fn test_empty_keyword_returns_all_in_order() {
        let records = fixture();
        assert_eq!(filter_by_keyword(&records, None), records);
        assert_eq!(filter_by_keyword(&records, Some("")), records);
    }

    #[test]
    fn test_source_and_type_filters() {
        let records = fixture();
        let osfi = filter_by_source(&records, &[Source::Osfi]);
        assert_eq!(titles(&osfi), vec!["Capital Rules Update", "b-side memo"]);
        let feeds = filter_by_type(&records, &[RecordType::RssFeed]);
        assert_eq!(titles(&feeds), vec!["Consumer alert"]);
        assert!(filter_by_source(&records, &[]).is_empty());
    }

    #[test]
    fn test_filters_commute_and_are_idempotent() {
        let records = fixture();
        let a = filter_by_type(&filter_by_source(&records, &[Source::Osfi, Source::Fcac]), &[RecordType::WebScraping]);
        let b = filter_by_source(&filter_by_type(&records, &[RecordType::WebScraping]), &[Source::Osfi, Source::Fcac]);
        assert_eq!(a, b);
        let once = filter_by_keyword(&records, Some("capital"));
        assert_eq!(filter_by_keyword(&once, Some("capital")), once);
    }

    #[test]
    fn test_title_sorts_reverse_each_other() {
        let mut asc = fixture();
        sort(&mut asc, SortMode::TitleAsc);
        assert_eq!(
            titles(&asc),
            vec!["Auto Insurance Standards Review", "b-side memo", "Capital Rules Update", "Consumer alert"]
        );
        let mut desc = asc.clone();
        sort(&mut desc, SortMode::TitleDesc);
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[test]
    fn test_title_sort_is_stable_for_ties() {
        let mut records = vec![
            record(Source::Osfi, "Same", "first", "d"),
            record(Source::Iais, "same", "second", "d"),
        ];
        sort(&mut records, SortMode::TitleDesc);
        assert_eq!(records[0].summary, "first");
        sort(&mut records, SortMode::TitleAsc);
        assert_eq!(records[0].summary, "first");
    }

    #[test]
    fn test_date_sort_is_lexicographic() {
        let mut records = fixture();
        sort(&mut records, SortMode::DateAsc);
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        // String order, not calendar order: "3 Dec 2025" sorts before "April".
        assert_eq!(dates, vec!["3 Dec 2025", "April 01, 2025", "December 3, 2025", "March 04, 2025"]);
        sort(&mut records, SortMode::DateDesc);
        assert_eq!(records[0].date, "March 04, 2025");
    }

    #[test]
    fn test_ingested_sorts_use_timestamp() {
        let mut records = fixture();
        let now = Utc::now();
        for (i, r) in records.iter_mut().enumerate() {
            r.timestamp = now + Duration::seconds(i as i64);
        }
        sort(&mut records, SortMode::IngestedDesc);
        assert_eq!(records[0].title, "b-side memo");
        sort(&mut records, SortMode::IngestedAsc);
        assert_eq!(records[0].title, "Capital Rules Update");
    }

    #[test]
    fn test_query_run_composes_filters_then_sorts() {
        let query = Query {
            keyword: Some("auto".to_string()),
            sources: vec![Source::Iais, Source::Fcac],
            types: vec![RecordType::WebScraping, RecordType::RssFeed],
            auto_only: true,
            sort: SortMode::TitleDesc,
        };
        assert_eq!(
            titles(&query.run(&fixture())),
            vec!["Consumer alert", "Auto Insurance Standards Review"]
        );
    }

    #[test]
    fn test_default_sort_is_newest_ingested_first() {
        let mut records = fixture();
        let now = Utc::now();
        for (i, r) in records.iter_mut().enumerate() {
            r.timestamp = now + Duration::seconds(i as i64);
        }
        let view = Query::default().run(&records);
        assert_eq!(SortMode::default(), SortMode::IngestedDesc);
        assert_eq!(
            titles(&view),
            vec!["b-side memo", "Consumer alert", "Auto Insurance Standards Review", "Capital Rules Update"]
        );
    }

    #[test]
    fn test_default_query_keeps_everything() {
        let query = Query {
            sort: SortMode::IngestedAsc,
            ..Query::default()
        };
        assert_eq!(query.run(&fixture()).len(), 4);
    }
}
