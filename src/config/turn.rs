//! Relay-server (TURN) credential configuration.

use super::defaults::{default_announce_on_join, default_credential_ttl_secs, default_turn_mode};
use serde::{Deserialize, Serialize};

/// How credentials for the auxiliary relay server are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnMode {
    /// No relay server; credential requests fail
    #[default]
    Disabled,
    /// Fixed long-term username and credential
    Static,
    /// Time-limited HMAC credentials derived from a shared secret
    Ephemeral,
}

/// TURN configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TurnConfig {
    #[serde(default = "default_turn_mode")]
    pub mode: TurnMode,
    /// Relay server URLs advertised to peers, e.g. `turn:relay.example.com:3478`
    #[serde(default)]
    pub urls: Vec<String>,
    /// Long-term username (static mode)
    #[serde(default)]
    pub username: Option<String>,
    /// Long-term credential (static mode)
    #[serde(default)]
    pub credential: Option<String>,
    /// Secret shared with the relay server (ephemeral mode)
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// Lifetime of issued credentials in seconds
    #[serde(default = "default_credential_ttl_secs")]
    pub credential_ttl_secs: u64,
    /// Optional suffix appended to ephemeral usernames
    #[serde(default)]
    pub username_prefix: Option<String>,
    /// Send `turn-info` to a peer right after it joins
    #[serde(default = "default_announce_on_join")]
    pub announce_on_join: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            mode: default_turn_mode(),
            urls: Vec::new(),
            username: None,
            credential: None,
            shared_secret: None,
            credential_ttl_secs: default_credential_ttl_secs(),
            username_prefix: None,
            announce_on_join: default_announce_on_join(),
        }
    }
}

impl TurnConfig {
    pub fn is_enabled(&self) -> bool {
        self.mode != TurnMode::Disabled
    }
}
