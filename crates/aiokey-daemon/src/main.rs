//! aiokey daemon.
//!
//! # Usage
//!
//! ```bash
//! # Synthesize keys through /dev/uinput
//! aiokey --config buttons.toml
//!
//! # Log key actions instead of synthesizing them
//! aiokey --config buttons.toml --dry-run --log-level debug
//!
//! # YAML configs are picked by extension
//! aiokey --config buttons.yaml
//! ```

use std::path::PathBuf;

use aiokey_core::{ConnectionManager, Transport as _};
use aiokey_daemon::{
    BleTransport, DaemonError, DaemonKeyboard, SystemEnv, check_address, load_config,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// BLE button matrix to keyboard adapter
#[derive(Parser, Debug)]
#[command(name = "aiokey")]
#[command(about = "Turns Automation IO button notifications into keyboard events")]
#[command(version)]
struct Args {
    /// Path to the configuration, TOML or YAML (`.yaml`, `.yml`)
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log key actions instead of synthesizing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if let Err(err) = run(&args).await {
        tracing::error!(error = %err, "aiokey stopped");
        return Err(err.into());
    }

    Ok(())
}

async fn run(args: &Args) -> Result<(), DaemonError> {
    let config = load_config(&args.config)?;
    tracing::info!(
        path = %args.config.display(),
        name = config.name(),
        address = config.address(),
        bindings = config.bindings().len(),
        "configuration loaded"
    );

    for warning in config.warnings() {
        tracing::warn!(%warning, "configuration");
    }

    let transport = BleTransport::new().await?;
    check_address(config.address(), transport.supports_address_connect())?;

    let keyboard = DaemonKeyboard::open(args.dry_run)?;
    let mut manager = ConnectionManager::new(config, transport, keyboard, SystemEnv::new());

    let Err(err) = manager.run().await;
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["aiokey", "-c", "buttons.toml"]).unwrap();

        assert_eq!(args.config, PathBuf::from("buttons.toml"));
        assert_eq!(args.log_level, "info");
        assert!(!args.dry_run);
    }

    #[test]
    fn config_is_required() {
        assert!(Args::try_parse_from(["aiokey", "--dry-run"]).is_err());
    }
}
