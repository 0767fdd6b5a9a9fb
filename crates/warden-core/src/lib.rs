//! Core types for Warden.
//!
//! This crate provides the protocol vocabulary shared by proxies and hosts:
//! addresses, session tokens, messages, responses and the wire envelopes that
//! carry them. It knows nothing about transports.

mod address;
mod handshake;
mod message;
mod token;
pub mod wire;

pub use address::{Address, AddressError};
pub use handshake::{ConnectRequest, ConnectResponse, DisconnectRequest, DisconnectResponse};
pub use message::{Message, Purport, Request, Response, ResponsePurport};
pub use token::CommunicationToken;

use std::fmt;

/// Rendering used by [`describe`] when there is nothing to render.
pub const PLACEHOLDER: &str = "<none>";

/// Connectivity of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Constructed, not yet connected.
    Created,
    /// Handshake completed; requests may flow.
    Opened,
    /// The transport failed. Terminal for the channel.
    Faulted,
    /// Closed deliberately. Terminal for the channel.
    Closed,
}

impl ChannelState {
    pub fn is_open(self) -> bool {
        self == Self::Opened
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Opened => "opened",
            Self::Faulted => "faulted",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Render a message or response for diagnostics. Never fails.
pub fn describe<T: fmt::Display + ?Sized>(value: Option<&T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Whether `response` is present and carries the `Acknowledged` purport.
pub fn is_acknowledged(response: Option<&Response>) -> bool {
    response.is_some_and(Response::is_acknowledged)
}
