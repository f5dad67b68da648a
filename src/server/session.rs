use super::connection_handle::ConnectionHandle;
use crate::protocol::{ChannelCode, ConnectionId};

/// Per-connection signaling state.
///
/// `Unjoined -> Joined(code) -> Closed`, or `Unjoined -> Closed`. There is no
/// way back to `Unjoined` and no move between channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    Joined(ChannelCode),
    Closed,
}

/// State machine value owned by the connection task.
#[derive(Debug)]
pub struct SignalingSession {
    handle: ConnectionHandle,
    state: SessionState,
}

impl SignalingSession {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            state: SessionState::Unjoined,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn channel(&self) -> Option<&str> {
        match &self.state {
            SessionState::Joined(code) => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub(crate) fn mark_joined(&mut self, code: ChannelCode) {
        if self.state == SessionState::Unjoined {
            self.state = SessionState::Joined(code);
        }
    }

    /// Enter `Closed`, returning the channel that was joined, if any.
    pub(crate) fn mark_closed(&mut self) -> Option<ChannelCode> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Joined(code) => Some(code),
            SessionState::Unjoined | SessionState::Closed => None,
        }
    }
}
