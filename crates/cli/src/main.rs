//! CLI for the FieldOps device-action coordinator.
//!
//! Wires the coordinators to a file-backed inventory and the simulated
//! driver: load config/inventory -> trigger -> print outcome -> wait.

use clap::{Parser, Subcommand};
use fieldops_coordinator::{DiscoveryCoordinator, OperationGuard, ScanCoordinator};
use fieldops_core::{
    CorrelationId, DiscoveredDevice, OperationOutcome, ProtocolMap, Reading, ScanRequest,
    ValueType,
};
use fieldops_provider::{InMemoryRegistry, ServiceConfig, SharedConfig, SimulatedDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "fieldops", version, about = "Device discovery and profile scan coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trigger a discovery sweep.
    Discover {
        #[arg(short, long, env = "FIELDOPS_CONFIG")]
        config: Option<PathBuf>,

        /// Simulated driver latency in milliseconds.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,

        /// Device name the simulated sweep reports; repeat for several.
        #[arg(long = "discoverable", value_name = "NAME")]
        discoverable: Vec<String>,

        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Trigger a profile scan for one device.
    Scan {
        #[arg(short, long, env = "FIELDOPS_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long, env = "FIELDOPS_INVENTORY")]
        inventory: PathBuf,

        #[arg(short, long)]
        device: String,

        /// Profile name to create; synthesized when omitted.
        #[arg(short, long)]
        profile: Option<String>,

        /// Issue this many concurrent triggers for the same device.
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Simulated driver latency in milliseconds.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },

    /// Run the NaN gate over one encoded reading.
    Check {
        /// Value type, e.g. Float32, Float64, Int16.
        #[arg(short = 't', long = "type")]
        value_type: ValueType,

        /// Big-endian value bytes as hex, e.g. 7fc00000.
        #[arg(long = "hex")]
        encoded: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover {
            config,
            delay_ms,
            discoverable,
            correlation_id,
        } => {
            let t0 = Instant::now();
            let config = load_config(config.as_deref())?;
            let driver = Arc::new(
                SimulatedDriver::new(Duration::from_millis(delay_ms))
                    .with_discoverable(discovered_devices(&discoverable)),
            );
            let discovery = DiscoveryCoordinator::new(config, driver.clone());

            let correlation_id = correlation_id
                .map(CorrelationId::from)
                .unwrap_or_else(CorrelationId::generate);
            let outcome = discovery.trigger(correlation_id);
            print_outcome(&outcome)?;

            while discovery.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            tracing::info!(
                sweeps = driver.sweeps(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "finished"
            );
        }

        Commands::Scan {
            config,
            inventory,
            device,
            profile,
            repeat,
            delay_ms,
        } => {
            let t0 = Instant::now();
            let config = load_config(config.as_deref())?;
            let registry = Arc::new(InMemoryRegistry::from_json_file(&inventory)?);
            let driver = Arc::new(SimulatedDriver::new(Duration::from_millis(delay_ms)));
            let guard = Arc::new(OperationGuard::new());
            let scan = Arc::new(
                ScanCoordinator::new(config, registry, guard.clone()).with_scanner(driver.clone()),
            );

            let mut request = ScanRequest::for_device(&device);
            if let Some(name) = profile {
                request = request.with_profile_name(name);
            }
            let body = serde_json::to_vec(&request)?;

            let mut tasks = tokio::task::JoinSet::new();
            for _ in 0..repeat.max(1) {
                let scan = scan.clone();
                let body = body.clone();
                tasks.spawn(async move { scan.trigger(&body, CorrelationId::generate()).await });
            }

            let mut accepted = 0usize;
            while let Some(result) = tasks.join_next().await {
                let outcome = result?;
                if outcome.is_accepted() {
                    accepted += 1;
                }
                print_outcome(&outcome)?;
            }
            tracing::info!(accepted, requested = repeat.max(1), "triggers returned");

            while guard.is_busy(&device) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            tracing::info!(
                scans = driver.scans(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "finished"
            );
        }

        Commands::Check {
            value_type,
            encoded,
        } => {
            let raw = hex::decode(encoded.trim_start_matches("0x"))?;
            let reading = Reading::new(value_type, raw);
            let valid = fieldops_core::is_valid(&reading)?;
            println!(
                "{}",
                serde_json::json!({ "valueType": value_type, "valid": valid })
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Arc<SharedConfig>, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => ServiceConfig::from_json_file(p)?,
        None => {
            tracing::info!("no config file given; using defaults");
            ServiceConfig::default()
        }
    };
    tracing::info!(
        admin_state = ?config.admin_state,
        discovery_enabled = config.discovery.enabled,
        scan_timeout_ms = ?config.scan.timeout_ms,
        "service config"
    );
    Ok(Arc::new(SharedConfig::new(config)))
}

fn discovered_devices(names: &[String]) -> Vec<DiscoveredDevice> {
    names
        .iter()
        .map(|name| DiscoveredDevice {
            name: name.clone(),
            protocols: ProtocolMap::new(),
        })
        .collect()
}

fn print_outcome(outcome: &OperationOutcome) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(outcome)?);
    if let OperationOutcome::Rejected(e) = outcome {
        tracing::warn!(kind = %e.kind, "{}", e.message);
    } else {
        tracing::info!("{}", outcome.message());
    }
    Ok(())
}
