//! Configuration for the signaling relay.
//!
//! Supports JSON files, inline JSON and stdin input, environment variable
//! overrides, and compiled defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Relay limits and routing policy
//! - [`security`]: CORS and metrics authentication
//! - [`turn`]: Relay-server credential issuance
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod security;
pub mod server;
pub mod turn;
pub mod types;
pub mod validation;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use turn::{TurnConfig, TurnMode};

pub use types::Config;

pub use validation::validate_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 28175);
        assert_eq!(config.server.max_connections_per_ip, 100);
        assert_eq!(config.server.max_message_size, 65536);
        assert_eq!(config.server.outbound_queue_capacity, 256);
        assert_eq!(config.server.max_channel_code_length, 128);
        assert!(!config.server.report_missing_signal_target);

        assert_eq!(config.security.cors_origins, "*");
        assert!(!config.security.require_metrics_auth);

        assert_eq!(config.turn.mode, TurnMode::Disabled);
        assert_eq!(config.turn.credential_ttl_secs, 86_400);
        assert!(config.turn.announce_on_join);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.server.max_message_size,
            deserialized.server.max_message_size
        );
        assert_eq!(config.turn.mode, deserialized.turn.mode);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"turn":{"mode":"ephemeral","shared_secret":"s"}}"#).unwrap();
        assert_eq!(config.port, 28175);
        assert_eq!(config.turn.mode, TurnMode::Ephemeral);
        assert_eq!(config.turn.shared_secret.as_deref(), Some("s"));
        assert_eq!(config.turn.credential_ttl_secs, 86_400);
    }
}
