//! Relay-server credential issuance.
//!
//! The router never builds credentials itself. It asks a [`CredentialIssuer`]
//! through [`TurnService`] and forwards whatever comes back.

mod issuers;

pub use issuers::{DisabledCredentialIssuer, EphemeralCredentialIssuer, StaticCredentialIssuer};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{TurnConfig, TurnMode};
use crate::protocol::{TurnCredentials, TurnServer};

/// Credentials produced by an issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub username: String,
    pub credential: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("relay server credentials are not configured")]
    Disabled,
    #[error("shared secret cannot be used as an HMAC key")]
    InvalidKey,
    #[error("credential issuer unavailable: {0}")]
    Unavailable(String),
}

/// Produces short-lived credentials for the auxiliary relay server.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> Result<IssuedCredentials, CredentialError>;

    /// Whether this issuer can ever succeed. Used to skip `turn-info` on join.
    fn is_available(&self) -> bool {
        true
    }
}

/// Pairs an issuer with the relay server URLs it issues credentials for.
#[derive(Clone)]
pub struct TurnService {
    urls: Vec<String>,
    issuer: Arc<dyn CredentialIssuer>,
    announce_on_join: bool,
}

impl TurnService {
    pub fn new(urls: Vec<String>, issuer: Arc<dyn CredentialIssuer>, announce_on_join: bool) -> Self {
        Self {
            urls,
            issuer,
            announce_on_join,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Vec::new(), Arc::new(DisabledCredentialIssuer), false)
    }

    /// Build the service described by the `turn` config section.
    pub fn from_config(config: &TurnConfig) -> anyhow::Result<Self> {
        let ttl = Duration::from_secs(config.credential_ttl_secs);
        let issuer: Arc<dyn CredentialIssuer> = match config.mode {
            TurnMode::Disabled => Arc::new(DisabledCredentialIssuer),
            TurnMode::Static => {
                let (Some(username), Some(credential)) = (&config.username, &config.credential)
                else {
                    anyhow::bail!("static TURN mode requires turn.username and turn.credential");
                };
                Arc::new(StaticCredentialIssuer::new(
                    username.clone(),
                    credential.clone(),
                    ttl,
                ))
            }
            TurnMode::Ephemeral => {
                let Some(secret) = &config.shared_secret else {
                    anyhow::bail!("ephemeral TURN mode requires turn.shared_secret");
                };
                Arc::new(EphemeralCredentialIssuer::new(
                    secret.as_bytes().to_vec(),
                    ttl,
                    config.username_prefix.clone(),
                ))
            }
        };

        Ok(Self::new(
            config.urls.clone(),
            issuer,
            config.announce_on_join,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.issuer.is_available()
    }

    /// Whether newly joined peers should receive `turn-info`.
    pub fn announces_on_join(&self) -> bool {
        self.announce_on_join && self.is_enabled() && !self.urls.is_empty()
    }

    /// Credentials in the shape of a `turn-credentials` reply.
    pub async fn credentials(&self) -> Result<TurnCredentials, CredentialError> {
        let issued = self.issuer.issue().await?;
        // Round up: a fresh credential reports the configured lifetime.
        let remaining_ms = (issued.expires_at - Utc::now()).num_milliseconds().max(0) as u64;
        let ttl = remaining_ms.div_ceil(1000);
        Ok(TurnCredentials {
            username: issued.username,
            credential: issued.credential,
            ttl,
        })
    }

    /// Server list in the shape of a `turn-info` message.
    pub async fn servers(&self) -> Result<Vec<TurnServer>, CredentialError> {
        let issued = self.issuer.issue().await?;
        Ok(vec![TurnServer {
            urls: self.urls.clone(),
            username: issued.username,
            credential: issued.credential,
        }])
    }
}

impl std::fmt::Debug for TurnService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnService")
            .field("urls", &self.urls)
            .field("enabled", &self.is_enabled())
            .field("announce_on_join", &self.announce_on_join)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral_config() -> TurnConfig {
        TurnConfig {
            mode: TurnMode::Ephemeral,
            urls: vec!["turn:relay.example:3478".to_string()],
            shared_secret: Some("top-secret".to_string()),
            credential_ttl_secs: 600,
            ..TurnConfig::default()
        }
    }

    #[tokio::test]
    async fn disabled_service_fails_issuance() {
        let service = TurnService::disabled();
        assert!(!service.is_enabled());
        assert!(!service.announces_on_join());
        assert!(matches!(
            service.credentials().await,
            Err(CredentialError::Disabled)
        ));
    }

    #[tokio::test]
    async fn ephemeral_service_reports_remaining_ttl() {
        let service = TurnService::from_config(&ephemeral_config()).unwrap();
        assert!(service.announces_on_join());

        let creds = service.credentials().await.unwrap();
        assert_eq!(creds.ttl, 600);
        assert!(!creds.credential.is_empty());

        let servers = service.servers().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].urls, vec!["turn:relay.example:3478".to_string()]);
    }

    #[tokio::test]
    async fn static_service_returns_configured_user() {
        let config = TurnConfig {
            mode: TurnMode::Static,
            urls: vec!["turn:relay.example:3478".to_string()],
            username: Some("user".to_string()),
            credential: Some("pass".to_string()),
            announce_on_join: false,
            ..TurnConfig::default()
        };
        let service = TurnService::from_config(&config).unwrap();
        assert!(service.is_enabled());
        assert!(!service.announces_on_join());

        let creds = service.credentials().await.unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.credential, "pass");
        assert_eq!(creds.ttl, TurnConfig::default().credential_ttl_secs);
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let config = TurnConfig {
            shared_secret: None,
            ..ephemeral_config()
        };
        assert!(TurnService::from_config(&config).is_err());
    }
}
