//! Root configuration types.

use super::defaults::default_port;
use super::logging::LoggingConfig;
use super::security::SecurityConfig;
use super::server::ServerConfig;
use super::turn::TurnConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct for the relay.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            turn: TurnConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
