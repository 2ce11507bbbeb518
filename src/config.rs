//! Runtime configuration: upstream URLs and cache backend.
//!
//! Every option can be given as a flag or through the environment.

use crate::services::{FileStore, KeyValueStore, RedisStore};
use crate::types::{RankError, Result};
use clap::Args;
use std::path::PathBuf;

/// URLs of the four source collections
#[derive(Args, Debug, Clone)]
pub struct SourceUrls {
    /// Appointment collection ({id, patient_id})
    #[arg(long = "appointments-url", env = "APPOINTMENTS_URL")]
    pub appointments: String,

    /// Provider directory ({id, category})
    #[arg(long = "providers-url", env = "PROVIDERS_URL")]
    pub providers: String,

    /// Patient-provider links ({patient_id, provider_id})
    #[arg(long = "links-url", env = "LINKS_URL")]
    pub links: String,

    /// Ratings ({appointment_id, value})
    #[arg(long = "ratings-url", env = "RATINGS_URL")]
    pub ratings: String,
}

impl SourceUrls {
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("appointments", &self.appointments),
            ("providers", &self.providers),
            ("links", &self.links),
            ("ratings", &self.ratings),
        ] {
            if url.trim().is_empty() {
                return Err(RankError::Config(format!("{} URL is empty", name)));
            }
        }
        Ok(())
    }
}

/// Ranking cache backend: Redis when a URL is given, else a local directory
#[derive(Args, Debug, Clone, Default)]
pub struct CacheArgs {
    /// Redis server shared by the batch run and lookups (e.g. redis://cache:6379/0)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Cache directory when no Redis URL is set [default: ~/.provider-rank/cache]
    #[arg(long, env = "PROVIDER_RANK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl CacheArgs {
    pub fn open(&self) -> Result<Box<dyn KeyValueStore>> {
        if let Some(url) = self.redis_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            tracing::debug!(backend = "redis", "opening ranking cache");
            return Ok(Box::new(RedisStore::open(url)?));
        }

        let store = match &self.cache_dir {
            Some(dir) => FileStore::with_cache_dir(dir.clone()),
            None => FileStore::new()?,
        };
        tracing::debug!(backend = "file", "opening ranking cache");
        Ok(Box::new(store))
    }
}
