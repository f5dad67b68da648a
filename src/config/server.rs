//! Relay behaviour configuration.

use super::defaults::{
    default_max_channel_code_length, default_max_connections_per_ip, default_max_message_size,
    default_outbound_queue_capacity,
};
use serde::{Deserialize, Serialize};

/// Limits and routing policy for the signaling relay.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Maximum simultaneous connections accepted from one IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Outbound messages buffered per connection before new ones are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Maximum channel code length in bytes
    #[serde(default = "default_max_channel_code_length")]
    pub max_channel_code_length: usize,
    /// Reply `peer not found` to a signal whose target is not in the channel.
    /// When false such signals are dropped silently.
    #[serde(default)]
    pub report_missing_signal_target: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections_per_ip: default_max_connections_per_ip(),
            max_message_size: default_max_message_size(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_channel_code_length: default_max_channel_code_length(),
            report_missing_signal_target: false,
        }
    }
}
