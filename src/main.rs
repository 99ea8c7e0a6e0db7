use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use twinprobe::config::AppConfig;
use twinprobe::engine::PollEngine;
use twinprobe::probe::simulated_pair;
use twinprobe::shutdown::{run_until_shutdown, wait_for_shutdown};

#[derive(Parser)]
#[command(name = "twinprobe", about = "Poll two status services and vote on the result")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Identifier to check
    #[arg(short, long, default_value = "example_id")]
    identifier: String,

    /// Seed for the simulated services (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.seed.is_some() {
        config.probes.seed = cli.seed;
    }

    tracing::info!(
        identifier = %cli.identifier,
        seed = ?config.probes.seed,
        "Starting twinprobe"
    );

    let (probe_a, probe_b) = simulated_pair(&config.probes);
    let engine = PollEngine::new(probe_a, probe_b, config.engine);

    let result =
        run_until_shutdown(engine.perform_operation(&cli.identifier), wait_for_shutdown()).await?;

    if cli.json {
        println!("{}", result.to_json()?);
    } else {
        println!("{result}");
    }

    Ok(())
}
