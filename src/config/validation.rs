//! Configuration validation functions.

use super::turn::TurnMode;
use super::Config;

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Reject configurations the relay cannot run with.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    // Metrics authentication
    if config.security.require_metrics_auth {
        if is_blank(config.security.metrics_auth_token.as_ref()) {
            anyhow::bail!(
                "\nCRITICAL: Metrics authentication is enabled but no token is configured!\n\
                 ===================================================================\n\
                 Configure a shared bearer token:\n\
                 export SIGNAL_RELAY__SECURITY__METRICS_AUTH_TOKEN=\"$(openssl rand -hex 32)\"\n\
                 \n\
                 To disable metrics auth, set:\n\
                 export SIGNAL_RELAY__SECURITY__REQUIRE_METRICS_AUTH=false\n\
                 ===================================================================\n"
            );
        }

        if let Some(token) = &config.security.metrics_auth_token {
            if token.len() < 16 {
                eprintln!(
                    "\nWARNING: Metrics auth token is very short ({} chars).\n\
                     Recommended: At least 32 characters.\n\
                     Generate a strong token: openssl rand -hex 32\n",
                    token.len()
                );
            }
        }
    }

    // Relay limits
    let server = &config.server;
    if server.max_message_size == 0 {
        anyhow::bail!("server.max_message_size must be greater than zero");
    }
    if server.outbound_queue_capacity == 0 {
        anyhow::bail!("server.outbound_queue_capacity must be greater than zero");
    }
    if server.max_channel_code_length == 0 {
        anyhow::bail!("server.max_channel_code_length must be greater than zero");
    }

    // TURN
    let turn = &config.turn;
    match turn.mode {
        TurnMode::Disabled => {}
        TurnMode::Static => {
            if is_blank(turn.username.as_ref()) || is_blank(turn.credential.as_ref()) {
                anyhow::bail!("turn.username and turn.credential are required when turn.mode is \"static\"");
            }
        }
        TurnMode::Ephemeral => {
            if is_blank(turn.shared_secret.as_ref()) {
                anyhow::bail!("turn.shared_secret is required when turn.mode is \"ephemeral\"");
            }
        }
    }
    if turn.is_enabled() {
        if turn.urls.iter().all(|url| url.trim().is_empty()) {
            anyhow::bail!("turn.urls must list at least one relay server when TURN is enabled");
        }
        if turn.credential_ttl_secs == 0 {
            anyhow::bail!("turn.credential_ttl_secs must be greater than zero");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn metrics_auth_requires_token() {
        let mut config = Config::default();
        config.security.require_metrics_auth = true;
        assert!(validate_config(&config).is_err());

        config.security.metrics_auth_token = Some("0123456789abcdef0123456789abcdef".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = Config::default();
        config.server.max_message_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.outbound_queue_capacity = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.max_channel_code_length = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn turn_modes_require_their_settings() {
        let mut config = Config::default();
        config.turn.mode = TurnMode::Ephemeral;
        config.turn.urls = vec!["turn:relay.example:3478".into()];
        assert!(validate_config(&config).is_err());
        config.turn.shared_secret = Some("secret".into());
        assert!(validate_config(&config).is_ok());

        config.turn.urls.clear();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.turn.mode = TurnMode::Static;
        config.turn.urls = vec!["turn:relay.example:3478".into()];
        config.turn.username = Some("user".into());
        assert!(validate_config(&config).is_err());
        config.turn.credential = Some("pass".into());
        assert!(validate_config(&config).is_ok());
    }
}
