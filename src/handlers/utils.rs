//! Builders shared by the command handlers

use crate::azure::HttpTextFetcher;
use crate::common::{Clock, SystemClock};
use crate::config::types::Config;
use crate::eol::{DefinitionCache, DefinitionChain, RemoteDefinitionSource};
use crate::error::Result;
use crate::retry::{RetryExecutor, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

// A century; anything longer is treated as "never expires"
const MAX_CACHE_AGE_HOURS: u64 = 24 * 365 * 100;

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

pub fn build_executor(config: &Config) -> Result<RetryExecutor> {
    Ok(RetryExecutor::new(RetryPolicy::from_config(&config.retry)?))
}

pub fn build_cache(config: &Config, clock: Arc<dyn Clock>) -> DefinitionCache {
    let hours = config.eol.cache_max_age_hours.min(MAX_CACHE_AGE_HOURS) as i64;
    DefinitionCache::new(
        config.eol.resolved_cache_dir(),
        chrono::Duration::hours(hours),
        clock,
    )
}

/// Remote tier is left out when either the config or the flag says offline
pub fn build_chain(
    config: &Config,
    offline: bool,
    executor: &RetryExecutor,
    clock: Arc<dyn Clock>,
) -> Result<DefinitionChain> {
    let cache = build_cache(config, clock.clone());
    let remote = if offline || config.eol.offline {
        None
    } else {
        let fetcher = HttpTextFetcher::new(Duration::from_secs(config.azure.request_timeout_secs))?;
        Some(RemoteDefinitionSource::new(
            Arc::new(fetcher),
            config.eol.definitions_url.clone(),
            config.eol.query_url.clone(),
            executor.clone(),
            clock,
        ))
    };
    Ok(DefinitionChain::standard(remote, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eol::DefinitionTier;

    #[test]
    fn test_offline_chain_has_no_remote_tier() {
        let mut config = Config::default();
        config.eol.offline = true;
        let executor = build_executor(&config).unwrap();
        let chain = build_chain(&config, false, &executor, system_clock()).unwrap();
        assert_eq!(chain.tiers(), vec![DefinitionTier::Cache, DefinitionTier::Bundled]);
    }

    #[test]
    fn test_cache_age_comes_from_config() {
        let mut config = Config::default();
        config.eol.cache_max_age_hours = 48;
        let cache = build_cache(&config, system_clock());
        assert_eq!(cache.max_age(), chrono::Duration::hours(48));
    }
}
