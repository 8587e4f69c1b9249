use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::model::mode::Mode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub relay: RelayConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub ws_url: String,
    pub channel: String,
    #[serde(skip)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub symbol: String,
    pub initial_mode: String,
    pub tick_interval_ms: u64,
    pub manual_step: f64,
    pub default_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl RelayConfig {
    pub fn initial_mode(&self) -> Result<Mode> {
        self.initial_mode
            .parse::<Mode>()
            .with_context(|| format!("relay.initial_mode '{}' is invalid", self.initial_mode))
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = Path::new("config/default.toml");
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let mut config: Config =
            toml::from_str(&config_str).context("failed to parse config/default.toml")?;

        // The upstream token never lives in the config file; absent means
        // the feed needs no auth.
        config.upstream.api_token = std::env::var("UPSTREAM_API_TOKEN").ok();
        if let Ok(url) = std::env::var("UPSTREAM_WS_URL") {
            config.upstream.ws_url = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .context("PORT must be a number between 1 and 65535")?;
        }

        config.relay.initial_mode()?;
        if config.relay.tick_interval_ms == 0 {
            bail!("relay.tick_interval_ms must be > 0");
        }
        if config.upstream.ws_url.trim().is_empty() {
            bail!("upstream.ws_url must not be empty");
        }

        Ok(config)
    }
}
