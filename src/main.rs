use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecofarm::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    snapshot,
    web::{self, WebServerConfig},
    world::{Farm, FarmEvent},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "EcoFarm farm tick simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, global = true, default_value = "scenarios/kathmandu_valley.yaml")]
    scenario: PathBuf,

    /// Log filter used when RUST_LOG is unset (defaults to the scenario's level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the scenario headlessly, writing snapshots along the way
    Run {
        /// Override tick count (uses scenario default when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Override snapshot interval in ticks
        #[arg(long)]
        snapshot_interval: Option<u64>,

        /// Directory for snapshots
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,

        /// Continue from a snapshot file instead of the scenario's start
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Serve the HTTP API and drive the simulation in real time
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Override snapshot interval in ticks
        #[arg(long)]
        snapshot_interval: Option<u64>,

        /// Directory for snapshots
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,

        /// Start ticking without waiting for a start command
        #[arg(long)]
        autostart: bool,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = ScenarioLoader::new(".").load(&cli.scenario)?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&scenario.logging.level));

    match cli.command {
        Command::Run {
            ticks,
            snapshot_interval,
            snapshot_dir,
            resume,
        } => run_headless(
            &scenario,
            ticks,
            snapshot_interval,
            snapshot_dir,
            resume,
        ),
        Command::Serve {
            host,
            port,
            snapshot_interval,
            snapshot_dir,
            autostart,
        } => {
            let config = WebServerConfig {
                snapshot_interval: snapshot_interval.unwrap_or(scenario.snapshot_interval_ticks),
                scenario,
                snapshot_dir,
                host,
                port,
                autostart,
            };
            tokio::runtime::Runtime::new()
                .context("Failed to start the async runtime")?
                .block_on(web::run(config))
        }
    }
}

fn run_headless(
    scenario: &Scenario,
    ticks: Option<u64>,
    snapshot_interval: Option<u64>,
    snapshot_dir: PathBuf,
    resume: Option<PathBuf>,
) -> Result<()> {
    let mut farm = match resume {
        Some(path) => {
            let file = snapshot::load(&path)?;
            info!(path = %path.display(), tick = file.farm.tick, "resuming from snapshot");
            Farm::restore(&file.farm)
                .with_context(|| format!("Snapshot {} is not a valid farm", path.display()))?
        }
        None => scenario.build_farm()?,
    };
    let ticks = scenario.ticks(ticks);
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: snapshot_interval.unwrap_or(scenario.snapshot_interval_ticks),
        snapshot_dir,
        speed: scenario.speed,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_default_systems(scenario.alert_cooldown_ticks)
        .build();

    let mut deaths = 0;
    let executed = engine.run_with_hook(&mut farm, ticks, |report| {
        for event in &report.events {
            if let FarmEvent::CropsDied { count, .. } = event {
                deaths += count;
            }
        }
    })?;

    info!(
        scenario = %scenario.name,
        executed,
        requested = ticks,
        day = farm.day(),
        coins = farm.coins(),
        alive = farm.alive_count(),
        deaths,
        "run finished"
    );
    println!(
        "Scenario '{}' ran {} of {} ticks. Day {}, {} coins, {} of {} crops alive.",
        scenario.name,
        executed,
        ticks,
        farm.day(),
        farm.coins(),
        farm.alive_count(),
        farm.planted_count()
    );
    Ok(())
}
