use crate::eol::EolSeverity;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "azgov")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find Azure resources that depend on retiring services")]
#[command(
    long_about = "Queries Azure Resource Graph for resources that use services with a \
                  published retirement date and reports how urgently each one needs to \
                  be migrated."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan subscriptions for resources on retiring services
    Eol {
        /// Subscription to scan (repeatable; all enabled subscriptions when omitted)
        #[arg(
            short,
            long = "subscription",
            value_name = "ID",
            env = "AZGOV_SUBSCRIPTIONS",
            value_delimiter = ','
        )]
        subscriptions: Vec<String>,

        /// Only show findings at or above this severity
        #[arg(long, value_enum)]
        severity: Option<SeverityThreshold>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip the remote definition download
        #[arg(long)]
        offline: bool,

        /// List every affected resource under its finding
        #[arg(long)]
        show_resources: bool,

        /// Exit with code 2 when a finding at or above this severity exists
        #[arg(long, value_enum, value_name = "SEVERITY")]
        fail_on: Option<SeverityThreshold>,
    },

    /// Load retirement definitions and show which source supplied them
    Definitions {
        /// Skip the remote definition download
        #[arg(long)]
        offline: bool,
    },

    /// Manage the local definition cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Delete the cached definitions
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityThreshold {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityThreshold> for EolSeverity {
    fn from(threshold: SeverityThreshold) -> Self {
        match threshold {
            SeverityThreshold::Low => EolSeverity::Low,
            SeverityThreshold::Medium => EolSeverity::Medium,
            SeverityThreshold::High => EolSeverity::High,
            SeverityThreshold::Critical => EolSeverity::Critical,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_eol_flags() {
        let cli = Cli::try_parse_from([
            "azgov", "-vv", "eol", "-s", "AAA", "--subscription", "bbb,ccc", "--format", "json",
            "--fail-on", "high", "--offline",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Eol {
                subscriptions,
                format,
                fail_on,
                offline,
                ..
            } => {
                assert_eq!(subscriptions, vec!["AAA", "bbb", "ccc"]);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(fail_on, Some(SeverityThreshold::High));
                assert!(offline);
            }
            _ => panic!("expected eol command"),
        }
    }

    #[test]
    fn test_threshold_maps_to_severity() {
        assert_eq!(EolSeverity::from(SeverityThreshold::Medium), EolSeverity::Medium);
        assert!(
            EolSeverity::from(SeverityThreshold::Critical)
                > EolSeverity::from(SeverityThreshold::Low)
        );
    }
}
