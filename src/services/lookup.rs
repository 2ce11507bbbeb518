//! Top-K lookup over cached rankings
//!
//! Stateless per call: one resolver call, one cache read.

use crate::services::{CategoryResolver, KeyValueStore, RankingStore};
use crate::types::{ProviderScore, Result};

/// Number of providers returned when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 15;

pub struct RankingLookup<'a> {
    resolver: &'a dyn CategoryResolver,
    rankings: RankingStore<'a>,
}

impl<'a> RankingLookup<'a> {
    pub fn new(resolver: &'a dyn CategoryResolver, kv: &'a dyn KeyValueStore) -> Self {
        Self {
            resolver,
            rankings: RankingStore::new(kv),
        }
    }

    /// Resolve the request's category and return its best `k` providers
    pub fn top(&self, request_id: u64, k: usize) -> Result<Vec<ProviderScore>> {
        let category = self.resolver.resolve(request_id)?;
        self.top_for_category(&category, k)
    }

    /// Best `k` providers of an already known category
    pub fn top_for_category(&self, category: &str, k: usize) -> Result<Vec<ProviderScore>> {
        let ranking = self.rankings.load(category)?;
        let top = ranking.top(k).to_vec();
        tracing::info!(category, requested = k, returned = top.len(), "returning top providers");
        Ok(top)
    }
}
