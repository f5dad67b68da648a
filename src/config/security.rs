//! HTTP surface security settings.

use super::defaults::default_cors_origins;
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Require a bearer token on the metrics endpoints
    #[serde(default)]
    pub require_metrics_auth: bool,
    /// Bearer token for the metrics endpoints (if required)
    #[serde(default)]
    pub metrics_auth_token: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            require_metrics_auth: false,
            metrics_auth_token: None,
        }
    }
}

impl SecurityConfig {
    /// Parsed origin list, or `None` when any origin is allowed.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let trimmed = self.cors_origins.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return None;
        }
        Some(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}
