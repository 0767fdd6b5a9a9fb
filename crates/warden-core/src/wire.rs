//! Wire envelopes.
//!
//! Every exchange is one JSON document in each direction, tagged by `type`.

use crate::{
    ConnectRequest, ConnectResponse, DisconnectRequest, DisconnectResponse, Request, Response,
};
use serde::{Deserialize, Serialize};

/// Frames sent by the initiating side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireRequest {
    Connect(ConnectRequest),
    Disconnect(DisconnectRequest),
    Message(Request),
}

/// Frames sent back by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireResponse {
    Connected(ConnectResponse),
    Disconnected(DisconnectResponse),
    Response(Response),
}

impl WireResponse {
    /// Frame kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Disconnected(_) => "disconnected",
            Self::Response(_) => "response",
        }
    }
}

pub fn encode<T: Serialize>(frame: &T) -> Result<String, WireError> {
    serde_json::to_string(frame).map_err(WireError::Encode)
}

pub fn decode<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T, WireError> {
    serde_json::from_str(text).map_err(WireError::Decode)
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}
