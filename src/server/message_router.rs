use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::channel_registry::{ChannelRegistry, JoinOutcome, RegistryError};
use super::connection_handle::{ConnectionHandle, DeliveryError};
use super::session::{SessionState, SignalingSession};
use crate::metrics::ServerMetrics;
use crate::protocol::validation::validate_channel_code_with_limit;
use crate::protocol::{ChannelCode, ErrorCategory, ErrorCode, InboundMessage, ServerMessage};
use crate::turn::TurnService;

/// Routing knobs taken from the `server` config section.
#[derive(Debug, Clone)]
pub struct RouterPolicy {
    pub max_channel_code_length: usize,
    pub report_missing_signal_target: bool,
}

impl Default for RouterPolicy {
    fn default() -> Self {
        Self {
            max_channel_code_length: crate::protocol::DEFAULT_MAX_CHANNEL_CODE_LENGTH,
            report_missing_signal_target: false,
        }
    }
}

/// Drives per-connection state transitions and delivers to channel members.
pub struct SignalingRouter {
    registry: Arc<ChannelRegistry>,
    turn: TurnService,
    metrics: Arc<ServerMetrics>,
    policy: RouterPolicy,
}

impl SignalingRouter {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        turn: TurnService,
        metrics: Arc<ServerMetrics>,
        policy: RouterPolicy,
    ) -> Self {
        Self {
            registry,
            turn,
            metrics,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Apply one decoded inbound message to `session`.
    pub async fn route(&self, session: &mut SignalingSession, message: InboundMessage) {
        if session.is_closed() {
            return;
        }

        trace!(connection_id = %session.id(), kind = message.kind(), "Routing inbound message");
        match message {
            InboundMessage::Join { code } => self.handle_join(session, code).await,
            InboundMessage::Signal { target_id, payload } => {
                self.handle_signal(session, &target_id, payload);
            }
            InboundMessage::CredentialRequest => self.handle_credential_request(session).await,
            InboundMessage::LegacyEnvelope { code, payload } => {
                self.handle_legacy(session, code, payload).await;
            }
            InboundMessage::Invalid(err) => {
                debug!(connection_id = %session.id(), error = %err, "Invalid inbound message");
                self.reply_error(session, ErrorCode::InvalidMessageFormat);
            }
        }
    }

    async fn handle_legacy(
        &self,
        session: &mut SignalingSession,
        code: Option<ChannelCode>,
        payload: Option<Value>,
    ) {
        let joined = session.channel().is_some();
        match (joined, code, payload) {
            // Unjoined: a code joins, any payload alongside it is ignored.
            (false, Some(code), _) => self.handle_join(session, code).await,
            (false, None, Some(_)) => self.reply_error(session, ErrorCode::NotJoined),
            // Joined: a payload broadcasts to the joined channel whatever the code says.
            (true, _, Some(payload)) => self.broadcast(session, payload),
            (true, Some(code), None) => self.handle_join(session, code).await,
            (_, None, None) => self.reply_error(session, ErrorCode::InvalidMessageFormat),
        }
    }

    async fn handle_join(&self, session: &mut SignalingSession, code: ChannelCode) {
        if let Err(reason) =
            validate_channel_code_with_limit(&code, self.policy.max_channel_code_length)
        {
            debug!(connection_id = %session.id(), %reason, "Rejected channel code");
            self.reply_error(session, ErrorCode::InvalidChannelCode);
            return;
        }

        match session.state() {
            SessionState::Unjoined => {}
            SessionState::Joined(current) if *current == code => {
                trace!(connection_id = %session.id(), %code, "Repeated join ignored");
                return;
            }
            SessionState::Joined(current) => {
                debug!(
                    connection_id = %session.id(),
                    current = %current,
                    requested = %code,
                    "Join for a second channel rejected"
                );
                self.reply_error(session, ErrorCode::AlreadyInOtherChannel);
                return;
            }
            SessionState::Closed => return,
        }

        let handle = session.handle().clone();
        let notice = Arc::new(ServerMessage::PeerJoined {
            peer_id: handle.id(),
        });
        let result = self.registry.join_with(&code, &handle, |members| {
            for member in members {
                self.deliver(member, Arc::clone(&notice));
            }
        });

        match result {
            Ok(outcome) => {
                if outcome == JoinOutcome::Created {
                    self.metrics.increment_channels_created();
                }
                if outcome.is_new_membership() {
                    self.metrics.increment_joins();
                }
                info!(connection_id = %handle.id(), %code, ?outcome, "Connection joined channel");
                session.mark_joined(code);
                self.announce_turn_servers(session).await;
            }
            Err(RegistryError::AlreadyInOtherChannel { current, .. }) => {
                warn!(
                    connection_id = %handle.id(),
                    %current,
                    requested = %code,
                    "Registry membership disagrees with session state"
                );
                self.reply_error(session, ErrorCode::AlreadyInOtherChannel);
            }
        }
    }

    async fn announce_turn_servers(&self, session: &SignalingSession) {
        if !self.turn.announces_on_join() {
            return;
        }
        match self.turn.servers().await {
            Ok(turn_servers) => self.reply(session, ServerMessage::TurnInfo { turn_servers }),
            Err(err) => {
                warn!(connection_id = %session.id(), error = %err, "Skipping turn-info after join");
            }
        }
    }

    fn handle_signal(&self, session: &SignalingSession, target_id: &str, payload: Value) {
        let Some(code) = session.channel() else {
            self.reply_error(session, ErrorCode::NotJoined);
            return;
        };

        let sender_id = session.id();
        let target = Uuid::parse_str(target_id)
            .ok()
            .filter(|id| *id != sender_id)
            .and_then(|id| {
                self.registry
                    .members_of(code)
                    .into_iter()
                    .find(|member| member.id() == id)
            });

        let delivered = target.is_some_and(|target| {
            self.deliver(
                &target,
                Arc::new(ServerMessage::Signal {
                    from_id: sender_id,
                    signal: payload,
                }),
            )
        });

        if delivered {
            self.metrics.increment_signals_delivered();
            return;
        }

        self.metrics.increment_signals_dropped();
        debug!(connection_id = %sender_id, %code, target_id, "Signal target not reachable; dropped");
        if self.policy.report_missing_signal_target {
            self.reply_error(session, ErrorCode::PeerNotFound);
        }
    }

    fn broadcast(&self, session: &SignalingSession, payload: Value) {
        let Some(code) = session.channel() else {
            self.reply_error(session, ErrorCode::NotJoined);
            return;
        };

        let sender_id = session.id();
        let message = Arc::new(ServerMessage::Relayed { payload });
        let delivered = self
            .registry
            .members_of(code)
            .iter()
            .filter(|member| member.id() != sender_id)
            .filter(|member| self.deliver(member, Arc::clone(&message)))
            .count();

        self.metrics.record_relay(delivered as u64);
        trace!(connection_id = %sender_id, %code, delivered, "Relayed payload");
    }

    async fn handle_credential_request(&self, session: &SignalingSession) {
        if session.channel().is_none() {
            self.reply_error(session, ErrorCode::NotJoined);
            return;
        }

        self.metrics.increment_credential_requests();
        match self.turn.credentials().await {
            Ok(credentials) => self.reply(session, ServerMessage::TurnCredentials { credentials }),
            Err(err) => {
                self.metrics.increment_credential_failures();
                warn!(connection_id = %session.id(), error = %err, "Credential issuance failed");
                self.reply_error(session, ErrorCode::CredentialIssuanceFailed);
            }
        }
    }

    /// Close transition: leave the channel, tell the remaining members, stop delivery.
    pub fn close(&self, session: &mut SignalingSession) {
        let handle = session.handle().clone();
        handle.begin_close();
        session.mark_closed();

        let notice = Arc::new(ServerMessage::PeerLeft {
            peer_id: handle.id(),
        });
        let departure = self.registry.leave_with(&handle, |_, members| {
            for member in members {
                self.deliver(member, Arc::clone(&notice));
            }
        });
        handle.mark_closed();

        if let Some(departure) = departure {
            self.metrics.increment_leaves();
            if departure.channel_removed {
                self.metrics.increment_channels_deleted();
            }
            info!(
                connection_id = %handle.id(),
                code = %departure.code,
                channel_removed = departure.channel_removed,
                "Connection left channel"
            );
        }
    }

    /// Send an error reply to the session's own connection.
    pub fn reply_error(&self, session: &SignalingSession, code: ErrorCode) {
        let category = code.category();
        match category {
            ErrorCategory::Protocol if code == ErrorCode::MessageTooLarge => {
                self.metrics.increment_oversized_messages();
            }
            ErrorCategory::Protocol => self.metrics.increment_invalid_messages(),
            ErrorCategory::State => self.metrics.increment_state_errors(),
            ErrorCategory::LookupMiss | ErrorCategory::Collaborator | ErrorCategory::Admission => {}
        }
        trace!(connection_id = %session.id(), ?category, %code, "Replying with error");
        self.reply(session, ServerMessage::error(code));
    }

    fn reply(&self, session: &SignalingSession, message: ServerMessage) {
        self.deliver(session.handle(), Arc::new(message));
    }

    /// Returns true if the message was enqueued.
    fn deliver(&self, target: &ConnectionHandle, message: Arc<ServerMessage>) -> bool {
        match target.deliver(message) {
            Ok(()) => true,
            Err(DeliveryError::Closed) => {
                trace!(connection_id = %target.id(), "Skipping delivery to closed connection");
                false
            }
            Err(DeliveryError::Full) => {
                self.metrics.increment_outbound_messages_dropped();
                warn!(connection_id = %target.id(), "Outbound queue full; message dropped");
                false
            }
        }
    }
}
