//! Conformance harness CLI
//!
//! Points the verification engine at an ASCOM Alpaca device and renders
//! the outcome stream. Exit code 1 when any Error outcomes were emitted.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::Level;

use conform::{load_config, Config, DeviceType};

#[derive(Parser)]
#[command(name = "conform")]
#[command(about = "Conformance checker for ASCOM Alpaca telescope and dome drivers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Device port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Alpaca device number (overrides config file)
    #[arg(long)]
    device_number: Option<u32>,

    /// Device class to test (overrides config file)
    #[arg(long, value_enum)]
    device_type: Option<DeviceType>,

    /// Test the built-in simulator instead of a network device
    #[arg(long)]
    loopback: bool,

    /// Skip tests that physically move the device
    #[arg(long)]
    no_destructive: bool,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        Config::default()
    };

    if let Some(host) = args.host {
        config.device.host = host;
    }
    if let Some(port) = args.port {
        config.device.port = port;
    }
    if let Some(device_number) = args.device_number {
        config.device.device_number = device_number;
    }
    if let Some(device_type) = args.device_type {
        config.device.device_type = device_type;
    }
    if args.loopback {
        config.loopback = true;
    }
    if args.no_destructive {
        config.settings.destructive_tests = false;
    }

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Cancellation requested");
        cancel_for_signal.cancel();
    });

    tracing::info!(
        "Checking {:?} device at {}:{}",
        config.device.device_type,
        config.device.host,
        config.device.port
    );

    let sink = conform::run(config, cancel).await?;
    println!("\nRun complete: {}", sink.summary());

    if sink.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
