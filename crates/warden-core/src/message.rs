//! Protocol messages.
//!
//! A [`Message`] is what callers build; a [`Request`] is what travels on the
//! wire once the proxy has stamped it with the session token. Remote sides
//! answer with a [`Response`].

use crate::CommunicationToken;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic intent of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purport {
    /// Ask the remote side to authenticate this session.
    Authenticate,
    /// Liveness probe; a healthy remote answers `Acknowledged`.
    Ping,
    /// Application-defined purport, passed through unmodified.
    Named(String),
}

impl Purport {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for Purport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticate => f.write_str("authenticate"),
            Self::Ping => f.write_str("ping"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePurport {
    /// Request understood and accepted.
    Acknowledged,
    /// The request carried a token the remote side does not know.
    Unauthorized,
    /// The remote side has no handler for the request purport.
    UnknownMessage,
    /// Domain-specific outcome, opaque to this layer.
    Named(String),
}

impl ResponsePurport {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for ResponsePurport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acknowledged => f.write_str("acknowledged"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::UnknownMessage => f.write_str("unknown_message"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A request as built by the caller, before it is bound to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub purport: Purport,
    /// Optional application payload.
    pub payload: Option<serde_json::Value>,
    /// Ignored on send: the proxy always stamps its own session token.
    pub token: Option<CommunicationToken>,
}

impl Message {
    /// A bare message carrying only a purport.
    pub fn new(purport: Purport) -> Self {
        Self {
            purport,
            payload: None,
            token: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_token(mut self, token: CommunicationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// A message whose purport has no name carries no intent at all.
    pub fn is_empty(&self) -> bool {
        matches!(&self.purport, Purport::Named(name) if name.trim().is_empty())
    }

    /// Bind this message to a session.
    ///
    /// Any token already present on the message is discarded.
    pub fn stamp(self, token: CommunicationToken) -> Request {
        Request {
            token,
            purport: self.purport,
            payload: self.payload,
        }
    }
}

impl From<Purport> for Message {
    fn from(purport: Purport) -> Self {
        Self::new(purport)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({})", self.purport)?;
        if self.payload.is_some() {
            f.write_str(" with payload")?;
        }
        Ok(())
    }
}

/// A message stamped with the session token, ready for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub token: CommunicationToken,
    pub purport: Purport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request({}, token {})", self.purport, self.token)
    }
}

/// Result of a request, produced by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub purport: ResponsePurport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Response {
    pub fn new(purport: ResponsePurport) -> Self {
        Self {
            purport,
            payload: None,
        }
    }

    pub fn acknowledged() -> Self {
        Self::new(ResponsePurport::Acknowledged)
    }

    pub fn unauthorized() -> Self {
        Self::new(ResponsePurport::Unauthorized)
    }

    pub fn unknown_message() -> Self {
        Self::new(ResponsePurport::UnknownMessage)
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_acknowledged(&self) -> bool {
        match self.purport {
            ResponsePurport::Acknowledged => true,
            ResponsePurport::Unauthorized
            | ResponsePurport::UnknownMessage
            | ResponsePurport::Named(_) => false,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response({})", self.purport)?;
        if self.payload.is_some() {
            f.write_str(" with payload")?;
        }
        Ok(())
    }
}
