//! Error types for fetching, persistence and configuration.
//!
//! Fetch errors never leave a source adapter: they are logged and the adapter
//! returns whatever it extracted. Store errors are fatal for a sync cycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("feed is not valid XML: {0}")]
    Feed(#[from] quick_xml::DeError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("no page registered for {0}")]
    Missing(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
