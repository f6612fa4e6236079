use crate::{common::CancellationToken, config::types::Config, error::Result};
use colored::Colorize;

/// Load definitions through the normal fallback chain and summarize the result
pub fn handle_definitions(config: &Config, offline: bool) -> Result<()> {
    let clock = super::utils::system_clock();
    let executor = super::utils::build_executor(config)?;
    let chain = super::utils::build_chain(config, offline, &executor, clock)?;

    let bundle = chain.load(&CancellationToken::new())?;

    println!("{}", "EOL definitions".bold());
    println!("Source: {} copy", bundle.tier);
    if let Some(fetched_at) = bundle.fetched_at {
        println!("Fetched at: {}", fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Services: {}", bundle.definitions.len());
    println!("Query length: {} characters", bundle.query_template.chars().count());

    let undated = bundle
        .definitions
        .iter()
        .filter(|d| d.retirement_date.is_none())
        .count();
    if undated > 0 {
        println!(
            "{}",
            format!("{} service(s) have no usable retirement date and will be skipped", undated)
                .yellow()
        );
    }
    Ok(())
}
