use crate::{
    azure::AzureClient,
    cli::{OutputFormat, SeverityThreshold},
    common::CancellationToken,
    config::types::Config,
    eol::{Availability, EolFinding, EolReconciler, EolScanReport, EolSeverity},
    error::Result,
};
use colored::{ColoredString, Colorize};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Options for the `eol` command
pub struct EolOptions {
    pub subscriptions: Vec<String>,
    pub severity: Option<SeverityThreshold>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub offline: bool,
    pub show_resources: bool,
    pub fail_on: Option<SeverityThreshold>,
}

/// How a scan ended, as far as `--fail-on` is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Data was available and nothing reached the threshold, or no threshold was set
    Passed,
    /// A finding at or above the `--fail-on` threshold is present
    ThresholdMet,
    /// `--fail-on` was set but no EOL data could be loaded, so nothing was checked
    Unavailable,
}

impl ScanOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            ScanOutcome::Passed => 0,
            ScanOutcome::ThresholdMet => crate::FINDINGS_EXIT_CODE,
            ScanOutcome::Unavailable => crate::UNAVAILABLE_EXIT_CODE,
        }
    }
}

/// Run a scan and print or save the report.
pub fn handle_eol(config: &Config, options: EolOptions) -> Result<ScanOutcome> {
    let clock = super::utils::system_clock();
    let executor = super::utils::build_executor(config)?;
    let chain = super::utils::build_chain(config, options.offline, &executor, clock.clone())?;
    let client = Arc::new(AzureClient::new(&config.azure)?);

    let reconciler = EolReconciler::new(chain, client.clone(), executor)
        .with_subscription_source(client)
        .with_clock(clock);

    let cancel = CancellationToken::new();
    let mut report = if options.subscriptions.is_empty() {
        info!("No subscriptions given; scanning every enabled subscription");
        reconciler.scan_all(&cancel)
    } else {
        reconciler.scan(&cancel, &options.subscriptions)
    };

    if let Some(threshold) = options.severity {
        report.filter_min_severity(threshold.into());
    }

    if options.output.is_some() {
        colored::control::set_override(false);
    }
    let output_string = match options.format {
        OutputFormat::Table => {
            format_eol_table(&report, options.severity, options.show_resources)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };

    if let Some(output_path) = &options.output {
        std::fs::write(output_path, output_string)?;
        println!("Report saved to: {}", output_path.display());
    } else {
        println!("{}", output_string);
    }

    Ok(scan_outcome(&report, options.fail_on))
}

fn scan_outcome(report: &EolScanReport, fail_on: Option<SeverityThreshold>) -> ScanOutcome {
    let Some(threshold) = fail_on else {
        return ScanOutcome::Passed;
    };
    if !report.is_available() {
        warn!("EOL data was unavailable; --fail-on could not be evaluated");
        return ScanOutcome::Unavailable;
    }
    match report.highest_severity() {
        Some(highest) if highest >= EolSeverity::from(threshold) => ScanOutcome::ThresholdMet,
        _ => ScanOutcome::Passed,
    }
}

fn severity_badge(severity: EolSeverity) -> ColoredString {
    let label = format!("[{}]", severity.as_str());
    match severity {
        EolSeverity::Critical => label.red().bold(),
        EolSeverity::High => label.red(),
        EolSeverity::Medium => label.yellow(),
        EolSeverity::Low => label.blue(),
    }
}

fn format_eol_table(
    report: &EolScanReport,
    severity: Option<SeverityThreshold>,
    show_resources: bool,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{}\n", "Azure Service Retirement Report".bold()));
    output.push_str(&format!("{}\n", "=".repeat(80)));
    output.push_str(&format!(
        "Generated at: {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !report.subscriptions.is_empty() {
        output.push_str(&format!("Subscriptions: {}\n", report.subscriptions.join(", ")));
    }
    if let Some(threshold) = severity {
        output.push_str(&format!("Severity filter: >= {:?}\n", threshold));
    }

    match &report.availability {
        Availability::Unavailable { reason } => {
            output.push_str(&format!(
                "\n{} EOL data is unavailable; no findings could be produced.\n",
                "!".yellow().bold()
            ));
            for line in textwrap::fill(reason, 76).lines() {
                output.push_str(&format!("  {}\n", line));
            }
            return output;
        }
        Availability::Available { tier } => {
            output.push_str(&format!("Definitions: {} copy\n", tier));
        }
    }

    output.push_str("\nSummary:\n");
    output.push_str(&format!("Retiring services in use: {}\n", report.findings.len()));
    output.push_str(&format!(
        "Affected resources: {}\n",
        report.total_affected_resources
    ));

    if report.findings.is_empty() {
        output.push_str(&format!("\n{}\n", "No resources on retiring services found.".green()));
        return output;
    }

    output.push_str("\nBy Severity:\n");
    for (severity, count) in [
        (EolSeverity::Critical, report.critical_count),
        (EolSeverity::High, report.high_count),
        (EolSeverity::Medium, report.medium_count),
        (EolSeverity::Low, report.low_count),
    ] {
        if count > 0 {
            output.push_str(&format!("  {} {}\n", severity_badge(severity), count));
        }
    }

    output.push_str(&format!("\n{}\n", "-".repeat(80)));
    for finding in &report.findings {
        format_finding(&mut output, finding, show_resources);
    }

    output
}

fn format_finding(output: &mut String, finding: &EolFinding, show_resources: bool) {
    output.push_str(&format!(
        "\n{} {}\n",
        severity_badge(finding.severity),
        finding.component.bold()
    ));
    output.push_str(&format!(
        "     Status: {} ({})\n",
        finding.status,
        describe_days(finding.days_until_deadline)
    ));
    output.push_str(&format!("     Deadline: {}\n", finding.deadline.format("%Y-%m-%d")));
    output.push_str(&format!(
        "     Resources: {} ({})\n",
        finding.resource_count(),
        finding.resource_type
    ));

    let wrapped = textwrap::fill(&finding.action_required, 70);
    for (i, line) in wrapped.lines().enumerate() {
        let label = if i == 0 { "Action:" } else { "       " };
        output.push_str(&format!("     {} {}\n", label, line));
    }

    if show_resources {
        for resource in &finding.affected_resources {
            output.push_str(&format!("       - {}", resource.name));
            if !resource.resource_group.is_empty() {
                output.push_str(&format!(" (rg: {})", resource.resource_group));
            }
            if !resource.location.is_empty() {
                output.push_str(&format!(" [{}]", resource.location));
            }
            output.push('\n');
        }
    }
}

fn describe_days(days: i64) -> String {
    match days {
        d if d < 0 => format!("{} day(s) overdue", -d),
        0 => "due today".to_string(),
        d => format!("{} day(s) left", d),
    }
}
