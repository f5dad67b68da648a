use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::metrics::ServerMetrics;
use crate::protocol::validation::validate_message_size;
use crate::protocol::{ErrorCode, InboundMessage, ServerMessage, StatusReport};
use crate::turn::TurnService;

mod channel_registry;
mod connection_handle;
mod connection_manager;
mod message_router;
mod session;

pub use channel_registry::{ChannelRegistry, Departure, JoinOutcome, RegistryError};
pub use connection_handle::{ConnectionHandle, DeliveryError, Liveness};
pub use message_router::{RouterPolicy, SignalingRouter};
pub use session::{SessionState, SignalingSession};

use connection_manager::ConnectionManager;

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

impl RegisterClientError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::IpLimitExceeded { .. } => ErrorCode::TooManyConnections,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections_per_ip: usize,
    pub max_message_size: usize,
    pub outbound_queue_capacity: usize,
    pub max_channel_code_length: usize,
    pub report_missing_signal_target: bool,
    pub require_metrics_auth: bool,
    pub metrics_auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections_per_ip: 100,
            max_message_size: 65536, // 64KB
            outbound_queue_capacity: 256,
            max_channel_code_length: crate::protocol::DEFAULT_MAX_CHANNEL_CODE_LENGTH,
            report_missing_signal_target: false,
            require_metrics_auth: false,
            metrics_auth_token: None,
        }
    }
}

impl From<&crate::config::Config> for ServerConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            max_connections_per_ip: config.server.max_connections_per_ip,
            max_message_size: config.server.max_message_size,
            outbound_queue_capacity: config.server.outbound_queue_capacity,
            max_channel_code_length: config.server.max_channel_code_length,
            report_missing_signal_target: config.server.report_missing_signal_target,
            require_metrics_auth: config.security.require_metrics_auth,
            metrics_auth_token: config.security.metrics_auth_token.clone(),
        }
    }
}

/// Signaling relay: connection admission, channel registry, and routing.
///
/// One instance per process, shared by reference between the accept loop and
/// every connection task.
pub struct RelayServer {
    /// Server configuration
    config: ServerConfig,
    /// Membership transitions and delivery
    router: SignalingRouter,
    /// Connection management (identities, IP accounting)
    connection_manager: ConnectionManager,
    /// Server metrics
    pub(crate) metrics: Arc<ServerMetrics>,
}

impl RelayServer {
    pub fn new(config: ServerConfig, turn: TurnService) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(ChannelRegistry::new());
        let router = SignalingRouter::new(
            registry,
            turn,
            metrics.clone(),
            RouterPolicy {
                max_channel_code_length: config.max_channel_code_length,
                report_missing_signal_target: config.report_missing_signal_target,
            },
        );
        let connection_manager =
            ConnectionManager::new(config.max_connections_per_ip, metrics.clone());

        Arc::new(Self {
            config,
            router,
            connection_manager,
            metrics,
        })
    }

    /// Build a server from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Arc<Self>> {
        let turn = TurnService::from_config(&config.turn)?;
        tracing::info!(?turn, "Relay-server credentials configured");
        Ok(Self::new(ServerConfig::from(config), turn))
    }

    /// Register a new client connection and start its session in `Unjoined`.
    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<SignalingSession, RegisterClientError> {
        self.connection_manager
            .register_client(sender, client_addr)
            .map(SignalingSession::new)
    }

    /// Handle one inbound text frame.
    pub async fn handle_text(&self, session: &mut SignalingSession, text: &str) {
        if let Err(reason) = validate_message_size(text.len(), self.config.max_message_size) {
            tracing::debug!(connection_id = %session.id(), %reason, "Oversized frame rejected");
            self.router.reply_error(session, ErrorCode::MessageTooLarge);
            return;
        }
        self.router.route(session, InboundMessage::parse(text)).await;
    }

    /// Handle an already-decoded message.
    pub async fn handle_message(&self, session: &mut SignalingSession, message: InboundMessage) {
        self.router.route(session, message).await;
    }

    /// Reply with an error the transport detected before decoding.
    pub fn reject(&self, session: &SignalingSession, code: ErrorCode) {
        self.router.reply_error(session, code);
    }

    /// Run the close transition and release the connection's admission slot.
    pub fn unregister_client(&self, session: &mut SignalingSession) {
        self.router.close(session);
        if let Some(client_addr) = self.connection_manager.remove_client(&session.id()) {
            tracing::info!(connection_id = %session.id(), %client_addr, "Client unregistered");
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            channels: self.registry().channel_count(),
            connections: self.connection_manager.connection_count(),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        self.router.registry()
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }
}
