//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fairway_protocol::{
    DEFAULT_GAME_PORT, DEFAULT_VOICE_PORT, MAX_CLIENTS, MAX_PLAYERS_PER_CONNECTION,
    PROTOCOL_VERSION,
};

/// Server configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the lobby session
    pub bind_address: SocketAddr,
    /// Address to bind the voice relay
    pub voice_address: SocketAddr,
    /// Maximum connections (1-8)
    pub max_clients: u8,
    /// Maximum local players per connection (1-4)
    pub max_players_per_connection: u8,
    /// Clients reporting a different version are refused
    pub protocol_version: u16,
    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Ambient weather timing
    pub weather: WeatherConfig,
    /// Optional netcode private key (32 bytes).
    /// If None, uses unsecure authentication (for development)
    pub private_key: Option<[u8; 32]>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_GAME_PORT)),
            voice_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_VOICE_PORT)),
            max_clients: MAX_CLIENTS as u8,
            max_players_per_connection: MAX_PLAYERS_PER_CONNECTION as u8,
            protocol_version: PROTOCOL_VERSION,
            tick_rate_hz: 60,
            weather: WeatherConfig::default(),
            private_key: None,
        }
    }
}

/// Ambient weather director timing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Shortest time between weather flips
    pub dwell_min_secs: u64,
    /// Longest time between weather flips
    pub dwell_max_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            dwell_min_secs: 40,
            dwell_max_secs: 120,
        }
    }
}

impl WeatherConfig {
    pub fn dwell_min(&self) -> Duration {
        Duration::from_secs(self.dwell_min_secs)
    }

    pub fn dwell_max(&self) -> Duration {
        Duration::from_secs(self.dwell_max_secs)
    }
}

impl ServerConfig {
    /// Load and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate YAML. Missing fields take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 || self.max_clients as usize > MAX_CLIENTS {
            return Err(ConfigError::Invalid(format!(
                "max_clients must be 1-{MAX_CLIENTS}, got {}",
                self.max_clients
            )));
        }
        if self.max_players_per_connection == 0
            || self.max_players_per_connection as usize > MAX_PLAYERS_PER_CONNECTION
        {
            return Err(ConfigError::Invalid(format!(
                "max_players_per_connection must be 1-{MAX_PLAYERS_PER_CONNECTION}, got {}",
                self.max_players_per_connection
            )));
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        if self.weather.dwell_min_secs > self.weather.dwell_max_secs {
            return Err(ConfigError::Invalid(format!(
                "weather dwell range {}..{} is inverted",
                self.weather.dwell_min_secs, self.weather.dwell_max_secs
            )));
        }
        if self.bind_address == self.voice_address {
            return Err(ConfigError::Invalid(format!(
                "lobby and voice cannot share {}",
                self.bind_address
            )));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
