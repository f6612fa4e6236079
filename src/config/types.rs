use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub eol: EolConfig,
    pub azure: AzureConfig,
}

/// Backoff settings shared by every remote call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
    /// Extra message patterns treated as throttling
    pub rate_limit_patterns: Vec<String>,
    /// Extra message patterns treated as transient failures
    pub transient_patterns: Vec<String>,
}

/// Retirement definition sources and cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EolConfig {
    pub definitions_url: String,
    pub query_url: String,
    pub cache_dir: Option<PathBuf>,
    pub cache_max_age_hours: u64,
    /// Skip the remote tier and use cached or bundled definitions only
    pub offline: bool,
}

/// Azure Resource Manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub management_endpoint: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=1000).contains(&self.azure.page_size) {
            return Err(ConfigError::InvalidValue {
                field: "azure.page_size".to_string(),
                reason: "must be between 1 and 1000".to_string(),
            });
        }
        if !self.azure.management_endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "azure.management_endpoint".to_string(),
                reason: "must be an https:// URL".to_string(),
            });
        }
        Ok(())
    }
}

impl EolConfig {
    /// Cache directory: configured value, else the user cache dir, else `./.azgov-cache`
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("azgov")))
            .unwrap_or_else(|| PathBuf::from(".azgov-cache"))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: Some(300_000), // 5 minutes
            rate_limit_patterns: Vec::new(),
            transient_patterns: Vec::new(),
        }
    }
}

impl Default for EolConfig {
    fn default() -> Self {
        Self {
            definitions_url:
                "https://raw.githubusercontent.com/Azure/EOL/main/DataSource/datasource.json"
                    .to_string(),
            query_url: "https://raw.githubusercontent.com/Azure/EOL/main/Query/Query.kql"
                .to_string(),
            cache_dir: None,
            cache_max_age_hours: 24 * 30,
            offline: false,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            management_endpoint: "https://management.azure.com".to_string(),
            request_timeout_secs: 60,
            page_size: 1000,
        }
    }
}
