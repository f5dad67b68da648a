use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::{ConnectionId, ServerMessage};

/// Liveness of a connection as seen by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Open,
    Closing,
    Closed,
}

impl Liveness {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection is closed")]
    Closed,
    #[error("outbound queue is full")]
    Full,
}

/// Non-owning reference to one client connection.
///
/// The transport owns the receiving half of the outbound queue; the relay only
/// holds cloned senders. Clones share liveness, so closing any clone closes all.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Arc<ServerMessage>>,
    liveness: Arc<AtomicU8>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Arc<ServerMessage>>) -> Self {
        Self {
            id,
            sender,
            liveness: Arc::new(AtomicU8::new(Liveness::Open.as_u8())),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn liveness(&self) -> Liveness {
        Liveness::from_u8(self.liveness.load(Ordering::Acquire))
    }

    /// Open and the transport is still draining the queue.
    pub fn is_open(&self) -> bool {
        self.liveness() == Liveness::Open && !self.sender.is_closed()
    }

    /// Move `Open` to `Closing`. Returns false if the handle was already past `Open`.
    pub fn begin_close(&self) -> bool {
        self.liveness
            .compare_exchange(
                Liveness::Open.as_u8(),
                Liveness::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn mark_closed(&self) {
        self.liveness
            .store(Liveness::Closed.as_u8(), Ordering::Release);
    }

    /// Enqueue without waiting. A full queue drops the message.
    pub fn deliver(&self, message: Arc<ServerMessage>) -> Result<(), DeliveryError> {
        if self.liveness() != Liveness::Open {
            return Err(DeliveryError::Closed);
        }
        self.sender.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}
