//! # LEFTRIGHT Stress Runner
//!
//! ```bash
//! # Defaults
//! leftright_stress
//!
//! # From a config file, with overrides
//! leftright_stress --config crates/leftright_stress/stress.toml --readers 64
//!
//! # See every publish
//! RUST_LOG=debug leftright_stress --rounds 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use leftright_stress::{run, StressConfig, StressResult};
use tracing_subscriber::EnvFilter;

/// Hammer a left-right map with concurrent readers and one writer.
#[derive(Parser, Debug)]
#[command(name = "leftright_stress", version, about)]
struct Args {
    /// TOML config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reader threads.
    #[arg(long)]
    readers: Option<usize>,

    /// Distinct keys.
    #[arg(long)]
    keys: Option<u64>,

    /// Insert / overwrite / remove cycles.
    #[arg(long)]
    rounds: Option<u64>,
}

impl Args {
    fn into_config(self) -> StressResult<StressConfig> {
        let mut config = match &self.config {
            Some(path) => StressConfig::load(path)?,
            None => StressConfig::default(),
        };
        if let Some(readers) = self.readers {
            config.readers = readers;
        }
        if let Some(keys) = self.keys {
            config.keys = keys;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = Args::parse().into_config().and_then(|config| run(&config));
    match result {
        Ok(report) => {
            println!(
                "ok: {} reads ({} hits), {} publishes, {} readers waited, {:.2?}",
                report.reads,
                report.hits,
                report.publish.publishes,
                report.publish.readers_waited,
                report.elapsed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "stress run failed");
            ExitCode::FAILURE
        }
    }
}
