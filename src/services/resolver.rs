//! Category resolution via the external category service

use crate::services::Fetcher;
use crate::types::{RankError, Result};
use serde_json::Value;

/// Maps a request identifier to the category it should be matched in
pub trait CategoryResolver: Send + Sync {
    fn resolve(&self, request_id: u64) -> Result<String>;
}

/// Resolver backed by `GET {base_url}/report/{request_id}`
pub struct HttpCategoryResolver {
    base_url: String,
    fetcher: Fetcher,
}

impl HttpCategoryResolver {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RankError::Config("category service URL is empty".into()));
        }
        Ok(Self {
            base_url,
            fetcher: Fetcher::new()?,
        })
    }

    pub fn request_url(&self, request_id: u64) -> String {
        format!("{}/report/{}", self.base_url, request_id)
    }
}

/// Pull `data.category` out of the response body
fn category_from_body(body: &Value) -> Option<&str> {
    body.pointer("/data/category")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

impl CategoryResolver for HttpCategoryResolver {
    fn resolve(&self, request_id: u64) -> Result<String> {
        let url = self.request_url(request_id);
        let body = self.fetcher.get_json(&url)?;
        let category = category_from_body(&body)
            .ok_or_else(|| RankError::schema("category response", "data.category"))?;
        tracing::info!(request_id, category, "category received");
        Ok(category.to_string())
    }
}
