use crate::server::RelayServer;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::prometheus::render_prometheus_metrics;

fn enforce_metrics_auth(headers: &HeaderMap, server: &RelayServer) -> Result<(), StatusCode> {
    let config = server.config();
    let Some(raw_header) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Unauthorized metrics access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("Unauthorized metrics access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = config.metrics_auth_token.as_deref() {
        if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
            tracing::debug!("Metrics access authorized via bearer token");
            return Ok(());
        }
    }

    tracing::warn!("Unauthorized metrics access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// JSON metrics endpoint
pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<RelayServer>>,
) -> axum::response::Result<axum::response::Json<serde_json::Value>> {
    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let status = server.status();
    let snapshot = server.metrics().snapshot();

    let response = serde_json::json!({
        "timestamp": snapshot.timestamp.to_rfc3339(),
        "status": {
            "channels": status.channels,
            "connections": status.connections
        },
        "serverMetrics": {
            "connections": {
                "total": snapshot.connections.total_connections,
                "active": snapshot.connections.active_connections,
                "disconnections": snapshot.connections.disconnections,
                "rejected": snapshot.connections.rejected_connections,
                "websocketErrors": snapshot.connections.websocket_errors,
                "outboundDropped": snapshot.connections.outbound_messages_dropped
            },
            "channels": {
                "created": snapshot.channels.channels_created,
                "deleted": snapshot.channels.channels_deleted,
                "active": snapshot.channels.channels_active,
                "joins": snapshot.channels.joins,
                "leaves": snapshot.channels.leaves
            },
            "routing": {
                "signalsDelivered": snapshot.routing.signals_delivered,
                "signalsDropped": snapshot.routing.signals_dropped,
                "relayedMessages": snapshot.routing.relayed_messages,
                "relayDeliveries": snapshot.routing.relay_deliveries
            },
            "credentials": {
                "requests": snapshot.credentials.requests,
                "failures": snapshot.credentials.failures
            },
            "errors": {
                "invalidMessages": snapshot.errors.invalid_messages,
                "oversizedMessages": snapshot.errors.oversized_messages,
                "stateErrors": snapshot.errors.state_errors,
                "total": snapshot.errors.total_errors
            }
        }
    });

    Ok(axum::response::Json(response))
}

/// Prometheus metrics endpoint (text format, version 0.0.4)
pub async fn prometheus_metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<RelayServer>>,
) -> axum::response::Result<axum::response::Response> {
    use axum::http::header::{HeaderValue, CONTENT_TYPE};
    use axum::response::IntoResponse;

    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let snapshot = server.metrics().snapshot();
    let body = render_prometheus_metrics(&snapshot, &server.status());
    let headers = [(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    )];

    Ok((headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerConfig;
    use crate::turn::TurnService;

    fn build_metrics_test_server(token: Option<&str>) -> Arc<RelayServer> {
        let config = ServerConfig {
            require_metrics_auth: true,
            metrics_auth_token: token.map(str::to_string),
            ..ServerConfig::default()
        };
        RelayServer::new(config, TurnService::disabled())
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().expect("header parse failed"));
        headers
    }

    #[test]
    fn test_metrics_auth_missing_header_rejected() {
        let server = build_metrics_test_server(Some("token"));
        assert_eq!(
            enforce_metrics_auth(&HeaderMap::new(), server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_metrics_auth_accepts_static_token() {
        let server = build_metrics_test_server(Some("shared-token"));
        assert!(enforce_metrics_auth(&bearer("Bearer shared-token"), server.as_ref()).is_ok());
    }

    #[test]
    fn test_metrics_auth_wrong_token_rejected() {
        let server = build_metrics_test_server(Some("correct-token"));
        for header in ["Bearer wrong-token", "Bearer correct-token-plus", "Bearer "] {
            assert_eq!(
                enforce_metrics_auth(&bearer(header), server.as_ref()).unwrap_err(),
                StatusCode::UNAUTHORIZED,
                "{header} should be rejected"
            );
        }
    }

    #[test]
    fn test_metrics_auth_invalid_scheme_rejected() {
        let server = build_metrics_test_server(Some("some-token"));
        assert_eq!(
            enforce_metrics_auth(&bearer("Basic some-token"), server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_metrics_auth_without_configured_token_rejects_everything() {
        let server = build_metrics_test_server(None);
        assert_eq!(
            enforce_metrics_auth(&bearer("Bearer anything"), server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}
