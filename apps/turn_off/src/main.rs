use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lifecycle::{load_settings, reconcile_identity, Orchestrator, Settings};
use signal::{RgbService, TracingStrip};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Turn off the LeLamp LED and disconnect the arm.
#[derive(Parser, Debug)]
#[command(name = "lelamp-turn-off")]
struct Args {
    /// Lamp id; defaults to the saved one.
    #[arg(long)]
    id: Option<String>,
    /// Serial port of the lamp; defaults to the saved one.
    #[arg(long)]
    port: Option<String>,
    /// Number of LEDs on the lamp head.
    #[arg(long, default_value_t = 64)]
    pixels: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse(), &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("turn off failed: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args, settings: &Settings) -> Result<()> {
    let orchestrator = Orchestrator::from_settings(settings);
    let identity = reconcile_identity(args.id, args.port, orchestrator.store().load())?;
    let mut rgb = RgbService::new(TracingStrip::new(args.pixels));

    println!("Turning off lamp {} on port {}...", identity.id(), identity.port());
    let report = orchestrator
        .shutdown(&identity, &mut rgb)
        .await
        .with_context(|| format!("shutdown for lamp {identity}"))?;

    for failure in &report.tolerated {
        warn!(step = failure.step, "{}", failure.message);
        println!("Error during turn off: {}", failure.message);
    }
    println!("Turn off complete");
    Ok(())
}
