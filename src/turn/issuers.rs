use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

use super::{CredentialError, CredentialIssuer, IssuedCredentials};

type HmacSha256 = Hmac<Sha256>;

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time-limited credentials in the TURN REST API style.
///
/// `username` is `<unix-expiry>` or `<unix-expiry>:<prefix>`, and `credential`
/// is `base64(HMAC-SHA256(shared_secret, username))`, which a TURN server
/// configured with the same secret verifies without any shared state.
pub struct EphemeralCredentialIssuer {
    shared_secret: Vec<u8>,
    ttl: Duration,
    username_prefix: Option<String>,
}

impl EphemeralCredentialIssuer {
    pub fn new(shared_secret: Vec<u8>, ttl: Duration, username_prefix: Option<String>) -> Self {
        Self {
            shared_secret,
            ttl,
            username_prefix,
        }
    }

    pub(crate) fn issue_at(&self, now: DateTime<Utc>) -> Result<IssuedCredentials, CredentialError> {
        let expires_at = expiry_after(now, self.ttl);
        let username = match self.username_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}:{prefix}", expires_at.timestamp()),
            None => expires_at.timestamp().to_string(),
        };

        let mut mac = HmacSha256::new_from_slice(&self.shared_secret)
            .map_err(|_| CredentialError::InvalidKey)?;
        mac.update(username.as_bytes());
        let credential = BASE64.encode(mac.finalize().into_bytes());

        Ok(IssuedCredentials {
            username,
            credential,
            expires_at,
        })
    }
}

impl fmt::Debug for EphemeralCredentialIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralCredentialIssuer")
            .field("ttl", &self.ttl)
            .field("username_prefix", &self.username_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialIssuer for EphemeralCredentialIssuer {
    async fn issue(&self) -> Result<IssuedCredentials, CredentialError> {
        self.issue_at(Utc::now())
    }
}

/// Long-term credentials configured on the TURN server.
pub struct StaticCredentialIssuer {
    username: String,
    credential: String,
    ttl: Duration,
}

impl StaticCredentialIssuer {
    pub fn new(username: String, credential: String, ttl: Duration) -> Self {
        Self {
            username,
            credential,
            ttl,
        }
    }
}

impl fmt::Debug for StaticCredentialIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialIssuer")
            .field("username", &self.username)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialIssuer for StaticCredentialIssuer {
    async fn issue(&self) -> Result<IssuedCredentials, CredentialError> {
        Ok(IssuedCredentials {
            username: self.username.clone(),
            credential: self.credential.clone(),
            expires_at: expiry_after(Utc::now(), self.ttl),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCredentialIssuer;

#[async_trait]
impl CredentialIssuer for DisabledCredentialIssuer {
    async fn issue(&self) -> Result<IssuedCredentials, CredentialError> {
        Err(CredentialError::Disabled)
    }

    fn is_available(&self) -> bool {
        false
    }
}
