//! HTTP fetcher for upstream JSON collections
//!
//! One GET per call, no retries. A non-2xx status is logged with the status
//! code and URL and then returned as [`RankError::Fetch`]; a 2xx body that is
//! not JSON is a [`RankError::Schema`] error.

use crate::types::{RankError, Result};
use serde_json::Value;

/// Source of named JSON collections (HTTP in production, fixtures in tests)
pub trait CollectionSource: Send + Sync {
    fn fetch(&self, name: &str, url: &str) -> Result<Value>;
}

/// Blocking HTTP fetcher built on reqwest
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("provider-rank/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RankError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }

    /// GET `url` and parse the body as JSON
    pub fn get_json(&self, url: &str) -> Result<Value> {
        if url.trim().is_empty() {
            return Err(RankError::Config("empty URL".into()));
        }

        let response = self.client.get(url).send().map_err(|e| {
            tracing::error!(url, error = %e, "request failed");
            RankError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                url,
                "Error {} occurred while accessing {}",
                status.as_u16(),
                url
            );
            return Err(RankError::Fetch {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().map_err(|e| RankError::Transport {
            url: url.to_string(),
            reason: format!("body read error: {}", e),
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(url, error = %e, "response body is not JSON");
            RankError::schema(format!("response from {}", url), "<json>")
        })
    }
}

impl CollectionSource for Fetcher {
    fn fetch(&self, name: &str, url: &str) -> Result<Value> {
        let value = self.get_json(url)?;
        tracing::debug!(collection = name, url, "collection fetched");
        Ok(value)
    }
}
