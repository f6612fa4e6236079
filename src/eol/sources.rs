//! Definition sources, tried in order until one produces data

use super::cache::DefinitionCache;
use super::definitions::{DefinitionBundle, DefinitionTier};
use super::error::EolError;
use crate::azure::TextFetcher;
use crate::common::{CancellationToken, Clock};
use crate::retry::RetryExecutor;
use log::{debug, info, warn};
use std::sync::Arc;

const BUNDLED_DEFINITIONS: &str = include_str!("../../data/eol_definitions.json");
const BUNDLED_QUERY: &str = include_str!("../../data/eol_query.kql");

/// One tier of the definition fallback chain.
pub trait DefinitionSource {
    fn tier(&self) -> DefinitionTier;

    /// `Ok(None)` means the tier simply has nothing to offer; `Err` means it failed.
    fn try_load(&self, cancel: &CancellationToken) -> Result<Option<DefinitionBundle>, EolError>;
}

/// Downloads the dataset and query, refreshing the cache on success.
///
/// With a cache attached, the download is skipped while the cached copy is
/// younger than the cache's max age.
pub struct RemoteDefinitionSource {
    fetcher: Arc<dyn TextFetcher>,
    definitions_url: String,
    query_url: String,
    executor: RetryExecutor,
    cache: Option<DefinitionCache>,
    clock: Arc<dyn Clock>,
}

impl RemoteDefinitionSource {
    pub fn new(
        fetcher: Arc<dyn TextFetcher>,
        definitions_url: impl Into<String>,
        query_url: impl Into<String>,
        executor: RetryExecutor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            definitions_url: definitions_url.into(),
            query_url: query_url.into(),
            executor,
            cache: None,
            clock,
        }
    }

    pub fn with_cache(mut self, cache: DefinitionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn download(&self, url: &str, cancel: &CancellationToken) -> Result<String, EolError> {
        self.executor
            .execute(cancel, || self.fetcher.fetch_text(url))
            .map_err(|source| EolError::Download {
                url: url.to_string(),
                source,
            })
    }
}

impl DefinitionSource for RemoteDefinitionSource {
    fn tier(&self) -> DefinitionTier {
        DefinitionTier::Remote
    }

    fn try_load(&self, cancel: &CancellationToken) -> Result<Option<DefinitionBundle>, EolError> {
        if let Some(cache) = &self.cache {
            match cache.load_fresh() {
                Ok(Some(bundle)) => {
                    debug!("Cached EOL definitions are still fresh, skipping download");
                    return Ok(Some(bundle));
                }
                Ok(None) => {}
                Err(e) => debug!("Ignoring unreadable EOL definition cache: {}", e),
            }
        }

        let definitions = self.download(&self.definitions_url, cancel)?;
        let query = self.download(&self.query_url, cancel)?;
        let bundle = DefinitionBundle::parse(
            &definitions,
            &query,
            DefinitionTier::Remote,
            Some(self.clock.now()),
        )?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(&definitions, &query)
        {
            warn!("Could not refresh EOL definition cache: {}", e);
        }
        Ok(Some(bundle))
    }
}

/// Reads the last downloaded copy, however old
pub struct CachedDefinitionSource {
    cache: DefinitionCache,
}

impl CachedDefinitionSource {
    pub fn new(cache: DefinitionCache) -> Self {
        Self { cache }
    }
}

impl DefinitionSource for CachedDefinitionSource {
    fn tier(&self) -> DefinitionTier {
        DefinitionTier::Cache
    }

    fn try_load(&self, _cancel: &CancellationToken) -> Result<Option<DefinitionBundle>, EolError> {
        let bundle = self.cache.load()?;
        if let Some(bundle) = &bundle
            && !self.cache.is_fresh(bundle)
        {
            warn!(
                "Using cached EOL definitions that are {}h old (max {}h)",
                self.cache.age(bundle).num_hours(),
                self.cache.max_age().num_hours()
            );
        }
        Ok(bundle)
    }
}

/// Definitions and query compiled into the binary
pub struct BundledDefinitionSource {
    definitions: String,
    query: String,
}

impl BundledDefinitionSource {
    pub fn builtin() -> Self {
        Self::new(BUNDLED_DEFINITIONS, BUNDLED_QUERY)
    }

    pub fn new(definitions: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            definitions: definitions.into(),
            query: query.into(),
        }
    }
}

impl DefinitionSource for BundledDefinitionSource {
    fn tier(&self) -> DefinitionTier {
        DefinitionTier::Bundled
    }

    fn try_load(&self, _cancel: &CancellationToken) -> Result<Option<DefinitionBundle>, EolError> {
        DefinitionBundle::parse(&self.definitions, &self.query, DefinitionTier::Bundled, None)
            .map(Some)
    }
}

/// Ordered fallback chain; the first source that yields a bundle wins.
#[derive(Default)]
pub struct DefinitionChain {
    sources: Vec<Box<dyn DefinitionSource>>,
}

impl DefinitionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl DefinitionSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Remote (unless offline), then cache, then bundled
    pub fn standard(remote: Option<RemoteDefinitionSource>, cache: DefinitionCache) -> Self {
        let mut chain = Self::new();
        if let Some(remote) = remote {
            chain = chain.with_source(remote.with_cache(cache.clone()));
        }
        chain
            .with_source(CachedDefinitionSource::new(cache))
            .with_source(BundledDefinitionSource::builtin())
    }

    pub fn tiers(&self) -> Vec<DefinitionTier> {
        self.sources.iter().map(|s| s.tier()).collect()
    }

    pub fn load(&self, cancel: &CancellationToken) -> Result<DefinitionBundle, EolError> {
        let mut failures = Vec::new();

        for source in &self.sources {
            if cancel.is_cancelled() {
                return Err(EolError::Cancelled);
            }
            let tier = source.tier();
            match source.try_load(cancel) {
                Ok(Some(bundle)) => {
                    info!(
                        "Loaded {} EOL definition(s) from the {} tier",
                        bundle.definitions.len(),
                        bundle.tier
                    );
                    return Ok(bundle);
                }
                Ok(None) => debug!("The {} tier has no EOL definitions", tier),
                Err(e) if e.is_cancelled() => return Err(EolError::Cancelled),
                Err(e) => {
                    warn!(
                        "Could not load EOL definitions from the {} tier: {}",
                        tier, e
                    );
                    failures.push(format!("{}: {}", tier, e));
                }
            }
        }

        let reason = if failures.is_empty() {
            "no definition source produced data".to_string()
        } else {
            failures.join("; ")
        };
        Err(EolError::DefinitionsUnavailable(reason))
    }
}
