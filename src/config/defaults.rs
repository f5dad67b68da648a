//! Default value functions for configuration fields.
//!
//! Used by serde's `#[serde(default = ...)]` attributes across the config types.

use super::logging::LogFormat;
use super::turn::TurnMode;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    28175
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_max_connections_per_ip() -> usize {
    100
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_outbound_queue_capacity() -> usize {
    256
}

pub const fn default_max_channel_code_length() -> usize {
    crate::protocol::DEFAULT_MAX_CHANNEL_CODE_LENGTH
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// TURN Defaults
// =============================================================================

pub const fn default_turn_mode() -> TurnMode {
    TurnMode::Disabled
}

pub const fn default_credential_ttl_secs() -> u64 {
    86_400 // 24 hours
}

pub const fn default_announce_on_join() -> bool {
    true
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "relay.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
