use serde::{Deserialize, Serialize};
use std::fmt;

pub const INVALID_MESSAGE_FORMAT: &str = "invalid message format";
pub const MESSAGE_TOO_LARGE: &str = "message too large";
pub const INVALID_CHANNEL_CODE: &str = "invalid channel code";
pub const NOT_JOINED: &str = "not joined";
pub const ALREADY_IN_OTHER_CHANNEL: &str = "already joined to another channel";
pub const PEER_NOT_FOUND: &str = "peer not found";
pub const CREDENTIAL_ISSUANCE_FAILED: &str = "credential issuance failed";
pub const TOO_MANY_CONNECTIONS: &str = "too many connections";

/// Reasons carried by `error` replies.
///
/// The wire form is the human-readable message returned by [`ErrorCode::message`].
/// Deployed clients match on these strings, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Protocol errors
    InvalidMessageFormat,
    MessageTooLarge,
    InvalidChannelCode,

    // State errors
    NotJoined,
    AlreadyInOtherChannel,

    // Lookup misses (only reported when configured)
    PeerNotFound,

    // Collaborator failures
    CredentialIssuanceFailed,

    // Connection admission
    TooManyConnections,
}

impl ErrorCode {
    /// Message text sent to the client in `{"type":"error","message":...}`.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidMessageFormat => INVALID_MESSAGE_FORMAT,
            Self::MessageTooLarge => MESSAGE_TOO_LARGE,
            Self::InvalidChannelCode => INVALID_CHANNEL_CODE,
            Self::NotJoined => NOT_JOINED,
            Self::AlreadyInOtherChannel => ALREADY_IN_OTHER_CHANNEL,
            Self::PeerNotFound => PEER_NOT_FOUND,
            Self::CredentialIssuanceFailed => CREDENTIAL_ISSUANCE_FAILED,
            Self::TooManyConnections => TOO_MANY_CONNECTIONS,
        }
    }

    /// Returns the taxonomy bucket this code belongs to, used for metrics and logs.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMessageFormat | Self::MessageTooLarge | Self::InvalidChannelCode => {
                ErrorCategory::Protocol
            }
            Self::NotJoined | Self::AlreadyInOtherChannel => ErrorCategory::State,
            Self::PeerNotFound => ErrorCategory::LookupMiss,
            Self::CredentialIssuanceFailed => ErrorCategory::Collaborator,
            Self::TooManyConnections => ErrorCategory::Admission,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error taxonomy. None of these are fatal to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or unparsable inbound message
    Protocol,
    /// Message not valid for the connection's current state
    State,
    /// Targeted signal to an unknown or departed peer
    LookupMiss,
    /// Credential issuer failure
    Collaborator,
    /// Connection refused at admission time
    Admission,
}
