//! Text normalization helpers shared by the source adapters.
//!
//! Scraped markup is uncontrolled, so every string that ends up in a
//! [`Record`](crate::models::Record) goes through the same small set of
//! passes:
//! - whitespace collapsing for titles, dates and summaries
//! - tag stripping and entity unescaping for feed summaries
//! - length capping with an ellipsis marker

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

/// Marker appended to summaries that were cut to fit their cap.
pub const ELLIPSIS: &str = "...";

/// Display format for dates the pipeline renders itself ("March 04, 2025").
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());

/// Collapse all runs of whitespace (including newlines) to single spaces and
/// trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `s` at `cap` characters.
///
/// Strings longer than `cap` are cut to `cap - 3` characters and get
/// [`ELLIPSIS`] appended, so the result never exceeds `cap`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_summary("abcdef", 5), "ab...");
/// assert_eq!(truncate_summary("abc", 5), "abc");
/// ```
pub fn truncate_summary(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    let keep = cap.saturating_sub(ELLIPSIS.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Remove anything that looks like a tag (`<...>`).
///
/// This is a lexical pass, not an HTML parser: malformed markup such as a
/// bare `<` followed by a later `>` is removed along with the text between.
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").into_owned()
}

/// Decode HTML character references (`&amp;`, `&#39;`, `&lt;`, ...).
///
/// Markup that is already unescaped in the input is dropped by the HTML
/// parser; escaped markup comes back as literal tags for [`strip_tags`].
pub fn unescape_html(s: &str) -> String {
    let fragment = Html::parse_fragment(s);
    fragment.root_element().text().collect()
}

/// Today's local date in [`DISPLAY_DATE_FORMAT`].
pub fn today_display() -> String {
    Local::now().format(DISPLAY_DATE_FORMAT).to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and get a `"…(+N chars)"` suffix.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Capital \n\t Rules   Update "), "Capital Rules Update");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_summary_short_string_untouched() {
        assert_eq!(truncate_summary("short", 300), "short");
        let exact = "a".repeat(300);
        assert_eq!(truncate_summary(&exact, 300), exact);
    }

    #[test]
    fn test_truncate_summary_long_string() {
        let s = "a".repeat(500);
        let result = truncate_summary(&s, 400);
        assert_eq!(result.chars().count(), 400);
        assert!(result.ends_with(ELLIPSIS));
        assert!(result.starts_with(&"a".repeat(397)));
    }

    #[test]
    fn test_truncate_summary_counts_characters_not_bytes() {
        let s = "é".repeat(350);
        let result = truncate_summary(&s, 300);
        assert_eq!(result.chars().count(), 300);
        assert!(result.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("Fees &amp; charges"), "Fees & charges");
        assert_eq!(unescape_html("&lt;p&gt;Hi&lt;/p&gt;"), "<p>Hi</p>");
        assert_eq!(unescape_html("It&#39;s"), "It's");
    }

    #[test]
    fn test_unescape_then_strip() {
        let raw = "&lt;p&gt;New &lt;strong&gt;guidance&lt;/strong&gt;&lt;/p&gt;";
        assert_eq!(strip_tags(&unescape_html(raw)), "New guidance");
    }

    #[test]
    fn test_today_display_shape() {
        let today = today_display();
        let re = Regex::new(r"^[A-Z][a-z]+ \d{2}, \d{4}$").unwrap();
        assert!(re.is_match(&today), "unexpected date {today}");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
        let result = truncate_for_log(&"a".repeat(500), 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
    }
}
