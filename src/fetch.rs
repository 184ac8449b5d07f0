//! Page retrieval for the source adapters.
//!
//! Adapters never talk to `reqwest` directly; they go through the
//! [`PageFetcher`] capability so the extraction logic can be driven by
//! canned pages in tests and offline replays.
//!
//! - [`HttpFetcher`]: real HTTP GET with a browser user agent and a
//!   per-request timeout
//! - [`StaticFetcher`]: serves pre-registered bodies keyed by URL

use crate::error::FetchError;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Capability to fetch the body of a page as text.
pub trait PageFetcher {
    /// GET `url` and return its body, failing on transport errors, timeouts
    /// and non-2xx statuses.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            user_agent: user_agent.into(),
        }
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let t0 = Instant::now();
        // Source URLs can come from a settings file; reject bad ones before
        // building a request.
        let target = Url::parse(url)?;
        let response = self
            .client
            .get(target)
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Non-success status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// [`PageFetcher`] that serves fixed bodies and records every request.
///
/// Unknown URLs fail with [`FetchError::Missing`], which the adapters treat
/// like any other network failure.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` as the response for `url`.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl PageFetcher for StaticFetcher {
    async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Missing(url.to_string()))
    }
}
