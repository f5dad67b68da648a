use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

use super::error_codes::ErrorCode;
use super::types::{ChannelCode, ConnectionId, TurnCredentials, TurnServer};

/// Typed message shapes sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join the channel identified by `code`
    Join { code: ChannelCode },
    /// Deliver an opaque signal to one peer in the same channel
    Signal { target_id: String, signal: Value },
    /// Ask for short-lived relay credentials
    TurnCredentials,
}

/// Untyped message shape used by the first protocol generation.
///
/// `{"code": ...}` joins, `{"payload": ...}` broadcasts. A `null` payload is
/// still a payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ChannelCode>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Reasons an inbound frame could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("unrecognised message shape: {0}")]
    Shape(serde_json::Error),
    #[error("envelope carries neither code nor payload")]
    EmptyEnvelope,
}

/// Outcome of decoding one inbound frame.
#[derive(Debug)]
pub enum InboundMessage {
    Join {
        code: ChannelCode,
    },
    Signal {
        target_id: String,
        payload: Value,
    },
    CredentialRequest,
    LegacyEnvelope {
        code: Option<ChannelCode>,
        payload: Option<Value>,
    },
    Invalid(DecodeError),
}

impl InboundMessage {
    /// Decode a text frame. Never fails: malformed input becomes [`InboundMessage::Invalid`].
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::Invalid(DecodeError::Json(err)),
        }
    }

    /// Classify an already-parsed JSON value.
    ///
    /// Objects carrying a `type` field must match a typed [`ClientMessage`];
    /// everything else is read as a [`LegacyEnvelope`].
    pub fn from_value(value: Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::Invalid(DecodeError::NotAnObject);
        };

        if map.contains_key("type") {
            return match serde_json::from_value::<ClientMessage>(value) {
                Ok(message) => message.into(),
                Err(err) => Self::Invalid(DecodeError::Shape(err)),
            };
        }

        match serde_json::from_value::<LegacyEnvelope>(value) {
            Ok(LegacyEnvelope {
                code: None,
                payload: None,
            }) => Self::Invalid(DecodeError::EmptyEnvelope),
            Ok(LegacyEnvelope { code, payload }) => Self::LegacyEnvelope { code, payload },
            Err(err) => Self::Invalid(DecodeError::Shape(err)),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Signal { .. } => "signal",
            Self::CredentialRequest => "turn-credentials",
            Self::LegacyEnvelope { .. } => "legacy",
            Self::Invalid(_) => "invalid",
        }
    }
}

impl From<ClientMessage> for InboundMessage {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Join { code } => Self::Join { code },
            ClientMessage::Signal { target_id, signal } => Self::Signal {
                target_id,
                payload: signal,
            },
            ClientMessage::TurnCredentials => Self::CredentialRequest,
        }
    }
}

/// Message types sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Another peer joined the channel
    PeerJoined { peer_id: ConnectionId },
    /// Another peer left the channel
    PeerLeft { peer_id: ConnectionId },
    /// Targeted signal from another peer
    Signal { from_id: ConnectionId, signal: Value },
    /// Legacy broadcast payload, serialized as a bare `{"payload": ...}`
    Relayed { payload: Value },
    /// Relay servers the peer may use, sent after joining
    TurnInfo { turn_servers: Vec<TurnServer> },
    /// Reply to a credential request
    TurnCredentials { credentials: TurnCredentials },
    /// Error message
    Error { message: String },
}

impl ServerMessage {
    pub fn error(code: ErrorCode) -> Self {
        Self::Error {
            message: code.message().to_string(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PeerJoined { .. } => "peer-joined",
            Self::PeerLeft { .. } => "peer-left",
            Self::Signal { .. } => "signal",
            Self::Relayed { .. } => "payload",
            Self::TurnInfo { .. } => "turn-info",
            Self::TurnCredentials { .. } => "turn-credentials",
            Self::Error { .. } => "error",
        }
    }
}

// Wire representation. Every outbound shape is tagged by `type` except the
// legacy broadcast, so the public enum goes through this borrowed mirror.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireMessage<'a> {
    Event(WireEvent<'a>),
    Relayed { payload: Cow<'a, Value> },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
enum WireEvent<'a> {
    PeerJoined {
        peer_id: ConnectionId,
    },
    PeerLeft {
        peer_id: ConnectionId,
    },
    Signal {
        from_id: ConnectionId,
        signal: Cow<'a, Value>,
    },
    TurnInfo {
        turn_servers: Cow<'a, [TurnServer]>,
    },
    TurnCredentials {
        credentials: Cow<'a, TurnCredentials>,
    },
    Error {
        message: Cow<'a, str>,
    },
}

impl<'a> From<&'a ServerMessage> for WireMessage<'a> {
    fn from(message: &'a ServerMessage) -> Self {
        match message {
            ServerMessage::PeerJoined { peer_id } => {
                Self::Event(WireEvent::PeerJoined { peer_id: *peer_id })
            }
            ServerMessage::PeerLeft { peer_id } => {
                Self::Event(WireEvent::PeerLeft { peer_id: *peer_id })
            }
            ServerMessage::Signal { from_id, signal } => Self::Event(WireEvent::Signal {
                from_id: *from_id,
                signal: Cow::Borrowed(signal),
            }),
            ServerMessage::Relayed { payload } => Self::Relayed {
                payload: Cow::Borrowed(payload),
            },
            ServerMessage::TurnInfo { turn_servers } => Self::Event(WireEvent::TurnInfo {
                turn_servers: Cow::Borrowed(turn_servers.as_slice()),
            }),
            ServerMessage::TurnCredentials { credentials } => {
                Self::Event(WireEvent::TurnCredentials {
                    credentials: Cow::Borrowed(credentials),
                })
            }
            ServerMessage::Error { message } => Self::Event(WireEvent::Error {
                message: Cow::Borrowed(message.as_str()),
            }),
        }
    }
}

impl From<WireMessage<'_>> for ServerMessage {
    fn from(wire: WireMessage<'_>) -> Self {
        match wire {
            WireMessage::Relayed { payload } => Self::Relayed {
                payload: payload.into_owned(),
            },
            WireMessage::Event(event) => match event {
                WireEvent::PeerJoined { peer_id } => Self::PeerJoined { peer_id },
                WireEvent::PeerLeft { peer_id } => Self::PeerLeft { peer_id },
                WireEvent::Signal { from_id, signal } => Self::Signal {
                    from_id,
                    signal: signal.into_owned(),
                },
                WireEvent::TurnInfo { turn_servers } => Self::TurnInfo {
                    turn_servers: turn_servers.into_owned(),
                },
                WireEvent::TurnCredentials { credentials } => Self::TurnCredentials {
                    credentials: credentials.into_owned(),
                },
                WireEvent::Error { message } => Self::Error {
                    message: message.into_owned(),
                },
            },
        }
    }
}

impl Serialize for ServerMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        WireMessage::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WireMessage::deserialize(deserializer).map(Self::from)
    }
}
