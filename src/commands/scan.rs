use crate::classifier::classify_interface;
use crate::config::GeneratorConfig;
use crate::model::{tokens_to_string, InterfaceDescriptor};
use crate::resolver::UniverseResolver;
use crate::scanner::scan;
use crate::tracker::{StateTracker, ValidationResult};
use crate::universe::Universe;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub source: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub interfaces: Vec<InterfaceDescriptor>,
    pub deferred: Vec<ScanProblem>,
    pub aborted: Vec<ScanProblem>,
}

#[derive(Debug, Serialize)]
pub struct ScanProblem {
    pub name: String,
    pub reason: String,
}

/// Classify every marked trait without writing anything
pub fn build_scan_report(universe: &Universe, config: &GeneratorConfig) -> ScanReport {
    let resolver = UniverseResolver::new(universe);
    let tracker = StateTracker::new();
    let mut report = ScanReport::default();

    for declaration in scan(universe, &config.generator.marker) {
        if let ValidationResult::Deferred { unresolved } =
            tracker.validate(&declaration, &resolver, config)
        {
            report.deferred.push(ScanProblem {
                name: declaration.qualified_name,
                reason: format!("unresolved {}", unresolved.join(", ")),
            });
            continue;
        }
        match classify_interface(&declaration, &resolver, config) {
            Ok(descriptor) => report.interfaces.push(descriptor),
            Err(err) => report.aborted.push(ScanProblem {
                name: declaration.qualified_name,
                reason: err.to_string(),
            }),
        }
    }
    report
}

pub fn scan_sources(options: ScanConfig) -> Result<ScanReport> {
    let config = super::resolve_config(&options.source, options.config.as_deref())?;
    let universe = Universe::load(&options.source, &config.sources.exclude)
        .with_context(|| format!("Failed to load sources from {}", options.source.display()))?;
    let report = build_scan_report(&universe, &config);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report)
}

fn print_report(report: &ScanReport) {
    for interface in &report.interfaces {
        println!(
            "{} ({})",
            interface.qualified_name.bold(),
            interface.origin.display()
        );
        for op in &interface.operations {
            let params = op
                .parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, tokens_to_string(&p.ty)))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {}({}) {} {}",
                op.name.to_string().cyan(),
                params,
                format!("[{}]", op.result_shape).green(),
                tokens_to_string(&op.payload_type)
            );
        }
    }
    for problem in &report.deferred {
        println!("{} {}: {}", "deferred".yellow(), problem.name, problem.reason);
    }
    for problem in &report.aborted {
        println!("{} {}: {}", "aborted".red(), problem.name, problem.reason);
    }
}
