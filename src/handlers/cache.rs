use crate::{cli::CacheCommands, config::types::Config, error::Result};

pub fn handle_cache(config: &Config, command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Clear => {
            let cache = super::utils::build_cache(config, super::utils::system_clock());
            if cache.invalidate()? {
                println!("Removed cached definitions at {}", cache.path().display());
            } else {
                println!("No cached definitions at {}", cache.path().display());
            }
        }
    }
    Ok(())
}
