// Protocol module: message types, decoding, and validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

// Re-export everything for convenience
// This allows external code to use `use crate::protocol::*`

// From error_codes
pub use error_codes::{ErrorCategory, ErrorCode};

// From types
pub use types::{
    ChannelCode, ConnectionId, StatusReport, TurnCredentials, TurnServer,
    DEFAULT_MAX_CHANNEL_CODE_LENGTH,
};

// From messages
pub use messages::{ClientMessage, DecodeError, InboundMessage, LegacyEnvelope, ServerMessage};
