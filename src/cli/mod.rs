use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{CacheArgs, SourceUrls};
use crate::services::{
    CategoryResolver, Fetcher, HttpCategoryResolver, Pipeline, RankingLookup, RankingStore,
    DEFAULT_TOP_K,
};
use crate::types::Result;

/// Provider rankings per category, computed in batch and served from cache
#[derive(Parser)]
#[command(name = "provider-rank")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the source collections, recompute and store every ranking
    Run {
        #[command(flatten)]
        urls: SourceUrls,

        #[command(flatten)]
        cache: CacheArgs,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the top providers for a request as JSON
    Top {
        /// Request whose category is resolved through the category service
        request_id: u64,

        /// Number of providers to return
        #[arg(default_value_t = DEFAULT_TOP_K)]
        k: usize,

        /// Use this category instead of asking the category service
        #[arg(long)]
        category: Option<String>,

        /// Base URL of the category service
        #[arg(long, env = "CATEGORY_SERVICE_URL", required_unless_present = "category")]
        category_url: Option<String>,

        #[command(flatten)]
        cache: CacheArgs,
    },

    /// Print the full cached ranking of a category as JSON
    Show {
        category: String,

        #[command(flatten)]
        cache: CacheArgs,
    },
}

/// Resolver that answers every request with one category
struct FixedCategory(String);

impl CategoryResolver for FixedCategory {
    fn resolve(&self, _request_id: u64) -> Result<String> {
        Ok(self.0.clone())
    }
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Run { urls, cache, json } => {
                let fetcher = Fetcher::new()?;
                let store = cache.open()?;
                let report = Pipeline::new(&fetcher, &urls, store.as_ref())
                    .run()
                    .context("ranking run failed")?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!(
                        "Wrote {} categories ({} providers scored from {} joined records)",
                        report.categories.len(),
                        report.scored_providers,
                        report.joined_records
                    );
                }
                Ok(())
            }
            Commands::Top {
                request_id,
                k,
                category,
                category_url,
                cache,
            } => {
                let store = cache.open()?;
                let resolver: Box<dyn CategoryResolver> = match (category, category_url) {
                    (Some(category), _) => Box::new(FixedCategory(category)),
                    (None, Some(url)) => Box::new(HttpCategoryResolver::new(url)?),
                    (None, None) => anyhow::bail!("either --category or --category-url is required"),
                };
                let top = RankingLookup::new(resolver.as_ref(), store.as_ref())
                    .top(request_id, k)
                    .with_context(|| format!("lookup for request {} failed", request_id))?;
                println!("{}", serde_json::to_string_pretty(&top)?);
                Ok(())
            }
            Commands::Show { category, cache } => {
                let store = cache.open()?;
                let ranking = RankingStore::new(store.as_ref())
                    .load(&category)
                    .with_context(|| format!("cannot read ranking for {}", category))?;
                println!("{}", serde_json::to_string_pretty(&ranking)?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "provider-rank",
            "run",
            "--appointments-url",
            "http://a",
            "--providers-url",
            "http://p",
            "--links-url",
            "http://l",
            "--ratings-url",
            "http://r",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { urls, json, .. } => {
                assert!(json);
                assert_eq!(urls.ratings, "http://r");
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_parse_top_default_k() {
        let cli =
            Cli::try_parse_from(["provider-rank", "top", "123", "--category", "grief"]).unwrap();
        match cli.command {
            Commands::Top {
                request_id,
                k,
                category,
                ..
            } => {
                assert_eq!(request_id, 123);
                assert_eq!(k, 15);
                assert_eq!(category.as_deref(), Some("grief"));
            }
            _ => panic!("expected top"),
        }
    }

    #[test]
    fn test_cli_parse_top_explicit_k() {
        let cli = Cli::try_parse_from([
            "provider-rank",
            "top",
            "123",
            "2",
            "--category-url",
            "http://reports",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Top { k: 2, .. }));
    }

    #[test]
    fn test_cli_parse_show() {
        let cli = Cli::try_parse_from(["provider-rank", "show", "grief"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { ref category, .. } if category == "grief"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["provider-rank"]).is_err());
    }

    #[test]
    fn test_fixed_category_resolver() {
        let resolver = FixedCategory("grief".into());
        assert_eq!(resolver.resolve(7).unwrap(), "grief");
    }
}
