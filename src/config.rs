// 7.0 config.rs: everything the binary needs in one place. stream endpoint,
// credentials, logging, subscribed markets and their tuning.
// 7.1 markets come from the built-in table, overridden per pair by the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::feed::live::DEFAULT_STREAM_URL;
use crate::feed::LiveFeedConfig;
use crate::market::{MarketConfig, MarketError, MarketTable};
use crate::types::MarketId;

pub const ENV_API_KEY_ID: &str = "PAPER_API_KEY_ID";
pub const ENV_API_SECRET_PATH: &str = "PAPER_API_SECRET_PATH";
pub const ENV_STREAM_URL: &str = "PAPER_STREAM_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    pub stream_url: String,
    pub api_key_id: Option<String>,
    pub api_secret_path: PathBuf,
    // abort every market on the first failure instead of letting the rest finish
    pub cancel_on_error: bool,
    pub subscribe: Vec<MarketId>,
    pub markets: MarketTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        let markets = MarketTable::defaults();
        Self {
            log_level: "info".to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            api_key_id: None,
            api_secret_path: PathBuf::from("./secret"),
            cancel_on_error: false,
            subscribe: markets.market_ids().cloned().collect(),
            markets,
        }
    }
}

// On-disk layout. every field optional, missing ones keep their defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    log_level: Option<String>,
    stream_url: Option<String>,
    api_key_id: Option<String>,
    api_secret_path: Option<PathBuf>,
    cancel_on_error: Option<bool>,
    subscribe: Option<Vec<String>>,
    #[serde(default)]
    markets: MarketTable,
}

impl From<TomlConfig> for AppConfig {
    fn from(file: TomlConfig) -> Self {
        let mut config = AppConfig::default();
        if let Some(level) = file.log_level {
            config.log_level = level;
        }
        if let Some(url) = file.stream_url {
            config.stream_url = url;
        }
        if file.api_key_id.is_some() {
            config.api_key_id = file.api_key_id;
        }
        if let Some(path) = file.api_secret_path {
            config.api_secret_path = path;
        }
        if let Some(cancel) = file.cancel_on_error {
            config.cancel_on_error = cancel;
        }
        if let Some(subscribe) = file.subscribe {
            config.subscribe = subscribe.iter().map(|m| MarketId::new(m.as_str())).collect();
        }
        config.markets.merge(file.markets);
        config
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::from(file))
    }

    /// Credentials and endpoint from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY_ID) {
            self.api_key_id = Some(key);
        }
        if let Some(path) = lookup(ENV_API_SECRET_PATH) {
            self.api_secret_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(ENV_STREAM_URL) {
            self.stream_url = url;
        }
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscribe.is_empty() {
            return Err(ConfigError::NoMarkets);
        }

        for market in &self.subscribe {
            let config = self
                .markets
                .get(market)
                .ok_or_else(|| ConfigError::MissingMarket(market.clone()))?;
            config.validate().map_err(|e| ConfigError::InvalidMarket {
                market: market.clone(),
                reason: e,
            })?;
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.markets.clone()).with_cancel_on_error(self.cancel_on_error)
    }

    /// Live feed settings, reading the API secret from disk.
    pub fn live_feed_config(&self) -> Result<LiveFeedConfig, ConfigError> {
        let key_id = self
            .api_key_id
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredentials)?;
        let secret = read_secret(&self.api_secret_path)?;
        Ok(LiveFeedConfig::new(key_id, secret).with_stream_url(self.stream_url.clone()))
    }

    pub fn market(&self, market: &MarketId) -> Option<&MarketConfig> {
        self.markets.get(market)
    }
}

/// Read an API secret file. trailing whitespace and newlines are dropped.
pub fn read_secret<P: AsRef<Path>>(path: P) -> Result<String, ConfigError> {
    let secret = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
        path: path.as_ref().to_path_buf(),
        reason: e.to_string(),
    })?;
    let secret = secret.trim_end().to_string();
    if secret.is_empty() {
        return Err(ConfigError::MissingCredentials);
    }
    Ok(secret)
}

// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Market {0} is subscribed but has no configuration")]
    MissingMarket(MarketId),

    #[error("Market {market} is misconfigured: {reason}")]
    InvalidMarket { market: MarketId, reason: MarketError },

    #[error("No markets subscribed")]
    NoMarkets,

    #[error("Failed to read {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("API key id and secret are required for live streaming")]
    MissingCredentials,
}
