use anyhow::Result;
use clap::Parser;
use svcwrap::cli::{default_filter, Cli, Commands};
use svcwrap::commands::{generate, init, scan};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            source,
            out,
            config,
            json,
        } => {
            generate::generate_units(generate::GenerateConfig {
                source,
                out,
                config,
                json,
            })?;
        }
        Commands::Scan {
            source,
            config,
            json,
        } => {
            scan::scan_sources(scan::ScanConfig {
                source,
                config,
                json,
            })?;
        }
        Commands::Init { force, dir } => {
            init::init_config(&dir, force)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env("SVCWRAP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
