//! Fixture runner binary
//!
//! Runs every VMTests-style JSON fixture under a directory against one fork.

use anyhow::Result;
use clap::Parser;
use pyrite_vm::Fork;
use pyrite_vm_tests::TestRunner;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pyrite VM fixture runner
#[derive(Parser, Debug, Clone)]
#[command(name = "pyrite-vmtest")]
#[command(about = "Run VMTests-style JSON fixtures against the Pyrite EVM")]
#[command(version)]
struct Cli {
    /// Fixture directory, searched recursively for .json files
    path: PathBuf,

    /// Fork rules to run under (Frontier, Homestead, TangerineWhistle, SpuriousDragon, Byzantium)
    #[arg(long, default_value = "Byzantium")]
    fork: String,

    /// Print per-file failures and per-test results
    #[arg(long, short)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let fork: Fork = cli.fork.parse()?;
    let stats = TestRunner::new(fork, cli.verbose).run_vm_tests(&cli.path)?;
    print!("{stats}");

    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
