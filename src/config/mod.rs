pub mod types;

use crate::error::{ConfigError, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".azgov.toml";

/// Overrides the definition cache directory
pub const CACHE_DIR_ENV: &str = "AZGOV_CACHE_DIR";
/// Forces offline mode (`1`/`true`) regardless of the config file
pub const OFFLINE_ENV: &str = "AZGOV_OFFLINE";

/// Get the global config file path (~/.azgov.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.azgov.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load configuration.
///
/// An explicit path must exist and parse. Otherwise the local file in the
/// working directory is tried, then the global one, then defaults. Environment
/// overrides are applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<types::Config> {
    let mut config = match explicit {
        Some(path) => read_config_file(path)?,
        None => discover_config(),
    };
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn discover_config() -> types::Config {
    let candidates = std::env::current_dir()
        .ok()
        .map(|cwd| local_config_path(&cwd))
        .into_iter()
        .chain(global_config_path());

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match read_config_file(&path) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                return config;
            }
            Err(e) => warn!("Ignoring unreadable config {}: {}", path.display(), e),
        }
    }

    types::Config::default()
}

fn read_config_file(path: &Path) -> Result<types::Config> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse a TOML configuration document
pub fn parse_config(content: &str) -> Result<types::Config> {
    toml::from_str(content)
        .map_err(|e| ConfigError::ParsingFailed(e.to_string()).into())
}

fn apply_env_overrides(config: &mut types::Config) {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV)
        && !dir.trim().is_empty()
    {
        config.eol.cache_dir = Some(PathBuf::from(dir));
    }
    if let Ok(value) = std::env::var(OFFLINE_ENV) {
        let value = value.trim().to_ascii_lowercase();
        config.eol.offline = matches!(value.as_str(), "1" | "true" | "yes");
    }
}
