//! Proxy errors.

use std::time::Duration;
use warden_core::wire::WireError;
use warden_core::{AddressError, ChannelState};

/// Failures reported by a channel primitive.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel is {0}, expected opened")]
    NotOpen(ChannelState),
    #[error("channel closed by the remote side")]
    Closed,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("protocol violation: expected {expected} frame, got {actual}")]
    UnexpectedFrame {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors surfaced synchronously to callers of the proxy.
///
/// A remote side that answers negatively is not an error: see the boolean
/// results of `connect`/`disconnect` and [`warden_core::is_acknowledged`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("transport fault: {0}")]
    TransportFault(#[from] TransportError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

impl ProxyError {
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::TransportFault(_))
    }
}

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;
