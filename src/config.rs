//! Agent configuration from the command line and environment

use crate::actuator::Polarity;
use crate::connection::LinkConfig;
use crate::session::SessionConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use drawer_shared::timing;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Relay polarity as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolarityArg {
    ActiveLow,
    ActiveHigh,
}

impl From<PolarityArg> for Polarity {
    fn from(arg: PolarityArg) -> Self {
        match arg {
            PolarityArg::ActiveLow => Polarity::ActiveLow,
            PolarityArg::ActiveHigh => Polarity::ActiveHigh,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "drawer-agent",
    author,
    version,
    about = "Device agent that opens drawers on behalf of a command server"
)]
pub struct Cli {
    /// Base URL of the command server API.
    #[arg(
        long,
        env = "DRAWER_AGENT_SERVER_URL",
        default_value = "http://192.168.0.120:3000/api/v1"
    )]
    pub server_url: String,

    /// Device ID registered with the server.
    #[arg(long, env = "DRAWER_AGENT_DEVICE_ID")]
    pub device_id: String,

    /// Shared secret used to obtain a credential.
    #[arg(long, env = "DRAWER_AGENT_DEVICE_SECRET", hide_env_values = true)]
    pub device_secret: String,

    /// GPIO pins driving drawers 1..N, in order.
    #[arg(
        long,
        env = "DRAWER_AGENT_DRAWER_PINS",
        value_delimiter = ',',
        default_values_t = [32u8, 33, 26, 27]
    )]
    pub drawer_pins: Vec<u8>,

    /// Which level opens a drawer relay.
    #[arg(long, env = "DRAWER_AGENT_POLARITY", value_enum, default_value_t = PolarityArg::ActiveLow)]
    pub polarity: PolarityArg,

    /// How long a drawer relay is held open, in milliseconds.
    #[arg(long, env = "DRAWER_AGENT_PULSE_MS", default_value_t = timing::DRAWER_PULSE_MS)]
    pub pulse_ms: u64,

    /// Spacing between command polls, in milliseconds.
    #[arg(long, env = "DRAWER_AGENT_POLL_INTERVAL_MS", default_value_t = timing::POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Per-request timeout, in milliseconds.
    #[arg(long, env = "DRAWER_AGENT_REQUEST_TIMEOUT_MS", default_value_t = timing::REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "DRAWER_AGENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub server_url: Url,
    pub session: SessionConfig,
    pub link: LinkConfig,
    pub drawer_pins: Vec<u8>,
    pub polarity: Polarity,
    pub pulse: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl AgentConfig {
    /// `host:port` of the server, for link probing
    pub fn server_address(&self) -> Result<String> {
        let host = self
            .server_url
            .host_str()
            .ok_or_else(|| anyhow!("server url has no host: {}", self.server_url))?;
        let port = self
            .server_url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("server url has no port: {}", self.server_url))?;
        Ok(format!("{}:{}", host, port))
    }
}

impl TryFrom<Cli> for AgentConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let server_url = Url::parse(&cli.server_url)
            .with_context(|| format!("invalid server url: {}", cli.server_url))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            bail!("server url must be http or https: {}", server_url);
        }

        if cli.device_id.trim().is_empty() {
            bail!("device id must not be empty");
        }

        if cli.drawer_pins.is_empty() {
            bail!("at least one drawer pin is required");
        }
        let mut seen = HashSet::new();
        if let Some(pin) = cli.drawer_pins.iter().find(|pin| !seen.insert(**pin)) {
            bail!("drawer pin {} listed more than once", pin);
        }

        if cli.poll_interval_ms == 0 {
            bail!("poll interval must be greater than zero");
        }

        Ok(Self {
            server_url,
            session: SessionConfig {
                device_id: cli.device_id,
                secret: cli.device_secret,
                ..SessionConfig::default()
            },
            link: LinkConfig::default(),
            drawer_pins: cli.drawer_pins,
            polarity: cli.polarity.into(),
            pulse: Duration::from_millis(cli.pulse_ms),
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            request_timeout: Duration::from_millis(cli.request_timeout_ms),
        })
    }
}
