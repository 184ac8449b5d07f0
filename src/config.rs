//! Runtime settings for sync cycles and the store.
//!
//! Settings come from an optional YAML file; every field has a default so a
//! partial (or absent) file is valid:
//!
//! ```yaml
//! store_path: /var/lib/reguwatch/updates.json
//! enabled_sources: [OSFI, IAIS]
//! page_timeout_secs: 20
//! ```

use crate::error::ConfigError;
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const FCAC_FEED_ENDPOINT: &str = "https://api.io.canada.ca/io-server/gc/news/en/v2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON file holding every stored record.
    pub store_path: PathBuf,
    /// Sources a sync cycle runs when none are given explicitly.
    pub enabled_sources: Vec<Source>,
    /// Timeout for index pages and the feed.
    pub page_timeout_secs: u64,
    /// Timeout for OSFI article pages fetched for their summaries.
    pub detail_timeout_secs: u64,
    pub user_agent: String,
    pub osfi_url: String,
    pub iais_url: String,
    pub fcac_feed_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/updates.json"),
            enabled_sources: Source::ALL.to_vec(),
            page_timeout_secs: 15,
            detail_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            osfi_url: "https://www.osfi-bsif.gc.ca/en/news".to_string(),
            iais_url: "https://www.iais.org/news-and-events/latest-news/".to_string(),
            fcac_feed_url: default_fcac_feed_url(),
        }
    }
}

impl Settings {
    /// Read settings from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_yaml(&raw)?;
        info!(sources = ?settings.enabled_sources, "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }
}

/// GC news API query for the FCAC Atom feed (latest 50 items, newest first).
fn default_fcac_feed_url() -> String {
    let params = [
        ("dept", "financialconsumeragency"),
        ("sort", "publishedDate"),
        ("orderBy", "desc"),
        ("publishedDate>", "2021-07-23"),
        ("pick", "50"),
        ("format", "atom"),
        ("atomtitle", "Financial Consumer Agency of Canada"),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{FCAC_FEED_ENDPOINT}?{query}")
}
