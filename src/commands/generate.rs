use crate::builder;
use crate::diagnostics::TracingDiagnostics;
use crate::processor::BuildReport;
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub source: PathBuf,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
}

pub fn generate_units(options: GenerateConfig) -> Result<BuildReport> {
    let config = super::resolve_config(&options.source, options.config.as_deref())?;
    let report = builder::generate(
        &options.source,
        &options.out,
        config,
        false,
        TracingDiagnostics,
    )?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        bail!(
            "{} interface(s) failed to generate",
            report.aborted.len() + report.write_failures.len()
        );
    }
    Ok(report)
}

fn print_report(report: &BuildReport) {
    for record in &report.generated {
        let status = if record.written {
            "generated".green()
        } else {
            "unchanged".dimmed()
        };
        println!(
            "{:>10} {} -> {}",
            status,
            record.qualified_name.bold(),
            record.path.display()
        );
    }
    for (name, unresolved) in &report.deferred {
        println!(
            "{:>10} {} (unresolved: {})",
            "deferred".yellow(),
            name.bold(),
            unresolved.join(", ")
        );
    }
    for failure in report.aborted.iter().chain(&report.write_failures) {
        println!("{:>10} {}", "failed".red(), failure);
    }
    for failure in &report.parse_failures {
        println!("{:>10} {}", "skipped".yellow(), failure);
    }
    println!(
        "{} unit(s) written, {} up to date, {} round(s)",
        report.written_count(),
        report.generated.len() - report.written_count(),
        report.rounds
    );
}
