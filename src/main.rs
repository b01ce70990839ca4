//! Garden telemetry node - Main Entry Point

use clap::{Parser, Subcommand};
use garden_telemetry::config::{ConfigError, GardenConfig};
use garden_telemetry::cycle::{CycleDriver, CycleSettings};
use garden_telemetry::error::{describe_error_chain, GardenResult};
use garden_telemetry::network::build_network_link;
use garden_telemetry::observability::{init_default_logging, init_logging, LogFormat};
use garden_telemetry::sensor::build_sensor_reader;
use garden_telemetry::transport::mqtt::MqttClient;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info, Level};

const DEFAULT_CONFIG_PATHS: &[&str] = &["garden.toml", "config/garden.toml"];

/// Smart garden sensor node
#[derive(Parser)]
#[command(name = "garden-telemetry")]
#[command(about = "Publishes temperature, humidity and soil moisture readings over MQTT")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the network, connect to the broker and publish readings forever
    Run,
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        level => init_logging(
            if level == 1 { Level::DEBUG } else { Level::TRACE },
            LogFormat::parse(&std::env::var("LOG_FORMAT").unwrap_or_default()),
            false,
        ),
    }

    info!("Starting garden telemetry v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", describe_error_chain(&e));
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_node(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", describe_error_chain(&e));
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: &Option<PathBuf>) -> GardenResult<GardenConfig> {
    let path = match config_path {
        Some(path) => path.clone(),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .ok_or_else(|| {
                ConfigError::InvalidConfig(
                    "No configuration file found. Provide one with -c/--config or create garden.toml"
                        .to_string(),
                )
            })?,
    };

    info!("Loading configuration from: {}", path.display());
    Ok(GardenConfig::load_from_file(&path)?)
}

async fn run_node(config: GardenConfig) -> GardenResult<()> {
    info!(device_id = %config.device.id, "Bringing up garden node");

    let link = build_network_link(&config)?;
    let transport = MqttClient::new(&config.device.id, config.mqtt.clone())?;
    let sensors = build_sensor_reader(&config.sensors)?;

    let mut driver = CycleDriver::new(CycleSettings::from_config(&config), link, transport, sensors);

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let outcome = tokio::select! {
        result = driver.run() => match result {
            Ok(never) => match never {},
            Err(e) => Err(e),
        },
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
            Ok(())
        }
    };

    let stats = driver.stats();
    info!(
        cycles = stats.cycles,
        delivered = stats.delivered,
        failed = stats.failed,
        skipped = stats.skipped,
        "Sensor cycle stopped"
    );

    if let Err(e) = driver.disconnect().await {
        error!("Error during disconnect: {}", describe_error_chain(&e));
    }

    Ok(outcome?)
}

fn handle_config_command(config: &GardenConfig, show: bool) -> GardenResult<()> {
    if show {
        println!("# Resolved garden telemetry configuration");
        println!(
            "{}",
            toml::to_string_pretty(config)
                .map_err(|e| ConfigError::InvalidConfig(format!("Cannot render config: {e}")))?
        );
    }

    info!("Configuration validation complete");
    Ok(())
}
