//! Ranking types produced by the aggregator and stored in the cache

use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One (category, provider, value) row reconstructed by the join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub category: String,
    pub provider_id: RecordId,
    pub value: f64,
}

/// Mean rating of a provider within one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderScore {
    pub provider_id: RecordId,
    pub average_value: f64,
}

/// Providers of one category, best first.
///
/// Serialized as a plain JSON array of `{provider_id, average_value}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRanking(Vec<ProviderScore>);

impl CategoryRanking {
    /// Sort descending by average, ties broken by provider_id ascending
    pub fn from_scores(mut scores: Vec<ProviderScore>) -> Self {
        scores.sort_by(|a, b| {
            b.average_value
                .total_cmp(&a.average_value)
                .then_with(|| a.provider_id.cmp(&b.provider_id))
        });
        Self(scores)
    }

    pub fn entries(&self) -> &[ProviderScore] {
        &self.0
    }

    /// First `k` entries (all of them if fewer exist)
    pub fn top(&self, k: usize) -> &[ProviderScore] {
        &self.0[..k.min(self.0.len())]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> Vec<ProviderScore> {
        self.0
    }
}

/// Rankings for every category, keyed by category name
pub type Rankings = BTreeMap<String, CategoryRanking>;
