pub mod config;    // Configuration management
pub mod error;     // Fetch error types
pub mod felicity;  // Felicity device protocol: transport, repair, extraction
pub mod options;   // Command line options parsing
pub mod poller;    // Periodic polling of configured devices
pub mod prelude;   // Common imports and types

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use std::io::Write;
use tokio::sync::broadcast;

/// Sets up `env_logger` with our timestamped format.
///
/// `RUST_LOG` wins over `default_level` when it is set.
pub fn init_logging(default_level: &str) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

/// Main application entry point
///
/// Loads the config, then either polls every device once (`--once`) or
/// keeps polling until `shutdown_rx` fires.
pub async fn app(options: Options, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let config = Config::new(options.config_file.clone())?;

    if let Err(e) = init_logging(&config.loglevel) {
        eprintln!("{}", e);
    }

    info!(
        "felicity-bridge {} starting with config file: {}",
        CARGO_PKG_VERSION, options.config_file
    );
    config.log_summary();

    let poller = Poller::from_config(&config);
    if poller.is_empty() {
        bail!("no enabled devices in {}", options.config_file);
    }
    info!("polling {} device(s)", poller.len());

    let mut stdout = std::io::stdout();

    if options.once {
        let outcomes = poller.poll_once().await;
        if Poller::report(&outcomes, &mut stdout)? == 0 {
            bail!("no device returned usable telemetry");
        }
        return Ok(());
    }

    poller.run(&mut stdout, shutdown_rx).await?;

    info!("Application shutdown complete");
    Ok(())
}
