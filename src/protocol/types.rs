use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default limit for channel code length (can be overridden by config)
pub const DEFAULT_MAX_CHANNEL_CODE_LENGTH: usize = 128;

/// Unique identifier for a connection, assigned once at connect time
pub type ConnectionId = Uuid;
/// Caller-supplied channel code. Opaque to the relay.
pub type ChannelCode = String;

/// ICE server entry advertised to a peer after it joins a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// Short-lived relay credentials returned for a `turn-credentials` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCredentials {
    pub username: String,
    pub credential: String,
    /// Remaining lifetime in seconds
    pub ttl: u64,
}

/// Aggregate counts exposed by the status endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub channels: usize,
    pub connections: usize,
}
