use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the in-memory signaling relay
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub rejected_connections: AtomicU64,
    pub websocket_errors: AtomicU64,
    pub outbound_messages_dropped: AtomicU64,

    // Channel metrics
    pub channels_created: AtomicU64,
    pub channels_deleted: AtomicU64,
    pub joins: AtomicU64,
    pub leaves: AtomicU64,

    // Routing metrics
    pub signals_delivered: AtomicU64,
    pub signals_dropped: AtomicU64,
    pub relayed_messages: AtomicU64,
    pub relay_deliveries: AtomicU64,

    // Credential metrics
    pub credential_requests: AtomicU64,
    pub credential_failures: AtomicU64,

    // Error tracking
    pub invalid_messages: AtomicU64,
    pub oversized_messages: AtomicU64,
    pub state_errors: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub channels: ChannelMetrics,
    pub routing: RoutingMetrics,
    pub credentials: CredentialMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub rejected_connections: u64,
    pub websocket_errors: u64,
    pub outbound_messages_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChannelMetrics {
    pub channels_created: u64,
    pub channels_deleted: u64,
    /// Channels currently alive, derived from created minus deleted
    pub channels_active: u64,
    pub joins: u64,
    pub leaves: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoutingMetrics {
    pub signals_delivered: u64,
    pub signals_dropped: u64,
    pub relayed_messages: u64,
    pub relay_deliveries: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CredentialMetrics {
    pub requests: u64,
    pub failures: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMetrics {
    pub invalid_messages: u64,
    pub oversized_messages: u64,
    pub state_errors: u64,
    pub total_errors: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // fetch_update so a stray double-unregister cannot underflow
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_outbound_messages_dropped(&self) {
        self.outbound_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    // Channel metrics
    pub fn increment_channels_created(&self) {
        self.channels_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_channels_deleted(&self) {
        self.channels_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_leaves(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
    }

    // Routing metrics
    pub fn increment_signals_delivered(&self) {
        self.signals_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay(&self, deliveries: u64) {
        self.relayed_messages.fetch_add(1, Ordering::Relaxed);
        self.relay_deliveries
            .fetch_add(deliveries, Ordering::Relaxed);
    }

    // Credential metrics
    pub fn increment_credential_requests(&self) {
        self.credential_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_credential_failures(&self) {
        self.credential_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Error tracking
    pub fn increment_invalid_messages(&self) {
        self.invalid_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_oversized_messages(&self) {
        self.oversized_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_state_errors(&self) {
        self.state_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Snapshot generation
    pub fn snapshot(&self) -> MetricsSnapshot {
        let channels_created = self.channels_created.load(Ordering::Relaxed);
        let channels_deleted = self.channels_deleted.load(Ordering::Relaxed);

        let invalid_messages = self.invalid_messages.load(Ordering::Relaxed);
        let oversized_messages = self.oversized_messages.load(Ordering::Relaxed);
        let state_errors = self.state_errors.load(Ordering::Relaxed);
        let total_errors = invalid_messages + oversized_messages + state_errors;

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: self.total_connections.load(Ordering::Relaxed),
                active_connections: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
                websocket_errors: self.websocket_errors.load(Ordering::Relaxed),
                outbound_messages_dropped: self.outbound_messages_dropped.load(Ordering::Relaxed),
            },
            channels: ChannelMetrics {
                channels_created,
                channels_deleted,
                channels_active: channels_created.saturating_sub(channels_deleted),
                joins: self.joins.load(Ordering::Relaxed),
                leaves: self.leaves.load(Ordering::Relaxed),
            },
            routing: RoutingMetrics {
                signals_delivered: self.signals_delivered.load(Ordering::Relaxed),
                signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
                relayed_messages: self.relayed_messages.load(Ordering::Relaxed),
                relay_deliveries: self.relay_deliveries.load(Ordering::Relaxed),
            },
            credentials: CredentialMetrics {
                requests: self.credential_requests.load(Ordering::Relaxed),
                failures: self.credential_failures.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                invalid_messages,
                oversized_messages,
                state_errors,
                total_errors,
            },
        }
    }
}
