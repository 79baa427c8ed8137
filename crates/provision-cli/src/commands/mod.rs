//! Command implementations.

pub mod cleanup;
pub mod fix_credentials;
pub mod setup;
pub mod status;
pub mod validate;

use crate::OutputFormat;
use anyhow::Result;
use provision_core::{OutcomeStatus, RunReport};

/// Render a finished run report in the requested format.
pub fn emit_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            println!();
            for outcome in &report.outcomes {
                let symbol = match outcome.status {
                    OutcomeStatus::Created => "✓",
                    OutcomeStatus::Skipped => "-",
                    OutcomeStatus::Failed => "✗",
                };
                let line = format!(
                    "{symbol} {:<8} {:<21} {}",
                    outcome.status.to_string(),
                    outcome.kind.to_string(),
                    outcome.name
                );
                match &outcome.message {
                    Some(message) => println!("{line} ({message})"),
                    None => println!("{line}"),
                }
            }
            println!("\n{}", report.summary_line());
        }
    }
    Ok(())
}
