use crate::prelude::*;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

use crate::felicity::client::{Endpoint, TransportSettings, DEFAULT_PORT};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub devices: Vec<Device>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    #[serde(default = "Config::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

// Device {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Device {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub name: Option<String>,
    pub host: String,
    #[serde(default = "Config::default_port")]
    pub port: u16,

    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "connect_timeout_ms")]
    pub connect_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "write_timeout_ms")]
    pub write_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "read_timeout_ms")]
    pub read_timeout: Option<Duration>,
    pub read_attempts: Option<u32>,
}
impl Device {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Configured name, or `host:port` when none was given.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.endpoint().to_string())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn transport_settings(&self) -> TransportSettings {
        let defaults = TransportSettings::default();

        TransportSettings {
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            write_timeout: self.write_timeout.unwrap_or(defaults.write_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            read_attempts: self.read_attempts.unwrap_or(defaults.read_attempts),
        }
    }
} // }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content).map_err(|err| anyhow!("{}: {}", file, err))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn enabled_devices(&self) -> Vec<Device> {
        self.devices.iter().filter(|d| d.enabled()).cloned().collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Dump the loaded configuration at info level; called once logging is up.
    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Poll interval: {}s", self.poll_interval_secs);
        info!(
            "  Devices: {} configured, {} enabled",
            self.devices.len(),
            self.devices.iter().filter(|d| d.enabled).count()
        );
        for (i, dev) in self.devices.iter().enumerate() {
            let settings = dev.transport_settings();
            info!("    Device[{}]: {}", i, dev.name());
            info!("      Enabled: {}", dev.enabled);
            info!("      Host: {}", dev.host);
            info!("      Port: {}", dev.port);
            info!("      Connect Timeout: {}ms", settings.connect_timeout.as_millis());
            info!("      Read Timeout: {}ms x {}", settings.read_timeout.as_millis(), settings.read_attempts);
        }
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }

        for (i, dev) in self.devices.iter().enumerate() {
            if !dev.enabled {
                continue;
            }
            if dev.port == 0 {
                bail!("devices[{}].port must be between 1 and 65535", i);
            }
            if dev.host.is_empty() {
                bail!("devices[{}].host cannot be empty", i);
            }

            let settings = dev.transport_settings();
            if settings.read_attempts == 0 {
                bail!("devices[{}].read_attempts must be at least 1", i);
            }
            if settings.connect_timeout.is_zero()
                || settings.write_timeout.is_zero()
                || settings.read_timeout.is_zero()
            {
                bail!("devices[{}]: timeouts must be non-zero", i);
            }
        }

        Ok(())
    }

    fn default_port() -> u16 {
        DEFAULT_PORT
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_poll_interval_secs() -> u64 {
        30
    }
}
