//! # Azure Governance Audit
//!
//! Finds Azure resources that still depend on services Microsoft has
//! announced for retirement, and classifies each by how close the deadline is.
//!
//! ## Features
//!
//! - **Three-tier definitions**: retirement data is downloaded, cached, or
//!   taken from a copy bundled with the binary
//! - **Scoped queries**: one Resource Graph query per scan, limited to the
//!   requested subscriptions
//! - **Retries**: throttling and transient failures are retried with backoff
//! - **Explicit availability**: a report says whether data was available, so
//!   "nothing found" is never confused with "nothing checked"
//!
//! ## Example
//!
//! ```rust,no_run
//! use azgov_audit::azure::AzureClient;
//! use azgov_audit::common::{CancellationToken, SystemClock};
//! use azgov_audit::config::types::Config;
//! use azgov_audit::eol::{DefinitionCache, DefinitionChain, EolReconciler};
//! use azgov_audit::retry::{RetryExecutor, RetryPolicy};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let max_age = chrono::Duration::days(30);
//! let cache = DefinitionCache::new("/tmp/azgov", max_age, Arc::new(SystemClock));
//! let chain = DefinitionChain::standard(None, cache);
//! let client = Arc::new(AzureClient::new(&config.azure)?);
//! let executor = RetryExecutor::new(RetryPolicy::azure_defaults()?);
//!
//! let report = EolReconciler::new(chain, client, executor)
//!     .scan(&CancellationToken::new(), &["00000000-0000-0000-0000-000000000000"]);
//! for finding in report.findings() {
//!     let days = finding.days_until_deadline;
//!     println!("{} {} ({} days)", finding.severity, finding.component, days);
//! }
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod cli;
pub mod common;
pub mod config;
pub mod eol;
pub mod error;
pub mod handlers;
pub mod retry;

// Re-export commonly used types and functions
pub use eol::{EolFinding, EolReconciler, EolScanReport};
pub use error::{AuditError, Result};
pub use handlers::{EolOptions, ScanOutcome, handle_cache, handle_definitions, handle_eol};
pub use retry::{RetryExecutor, RetryPolicy};
use cli::Commands;
use config::types::Config;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code used when `--fail-on` finds a finding at or above the threshold
pub const FINDINGS_EXIT_CODE: i32 = 2;

/// Exit code used when `--fail-on` is set but no EOL data could be loaded
pub const UNAVAILABLE_EXIT_CODE: i32 = 3;

/// Run a parsed command and return the process exit code
pub fn run_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Eol {
            subscriptions,
            severity,
            format,
            output,
            offline,
            show_resources,
            fail_on,
        } => {
            let options = EolOptions {
                subscriptions,
                severity,
                format,
                output,
                offline,
                show_resources,
                fail_on,
            };
            handlers::handle_eol(config, options).map(ScanOutcome::exit_code)
        }
        Commands::Definitions { offline } => {
            handlers::handle_definitions(config, offline).map(|_| 0)
        }
        Commands::Cache { command } => handlers::handle_cache(config, command).map(|_| 0),
    }
}
