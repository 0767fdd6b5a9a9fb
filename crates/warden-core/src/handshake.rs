//! Session establishment and teardown.

use crate::CommunicationToken;
use serde::{Deserialize, Serialize};

/// Opens a session. The candidate is a proposal; the remote side may mint
/// its own token instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub candidate: CommunicationToken,
}

impl ConnectRequest {
    pub fn new(candidate: CommunicationToken) -> Self {
        Self { candidate }
    }
}

/// Result of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// The token the session uses from now on.
    pub token: CommunicationToken,
    pub established: bool,
}

impl ConnectResponse {
    pub fn established(token: CommunicationToken) -> Self {
        Self {
            token,
            established: true,
        }
    }

    pub fn refused(token: CommunicationToken) -> Self {
        Self {
            token,
            established: false,
        }
    }
}

/// Closes the session identified by `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectRequest {
    pub token: CommunicationToken,
}

impl DisconnectRequest {
    pub fn new(token: CommunicationToken) -> Self {
        Self { token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub terminated: bool,
}
