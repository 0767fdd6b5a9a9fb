//! Application hooks.

use std::future::Future;
use warden_core::{CommunicationToken, Request, Response};

/// What a host does with the sessions and messages it receives.
///
/// `Ping` is answered by the host itself and never reaches the handler, nor
/// does any request carrying an unknown token.
pub trait MessageHandler: Send + Sync + 'static {
    /// Whether to open a session for a connecting peer.
    fn accept(&self, _candidate: &CommunicationToken) -> bool {
        true
    }

    /// Answer a request from an established session.
    fn handle(&self, _request: Request) -> impl Future<Output = Response> + Send {
        async { Response::unknown_message() }
    }
}

/// Accepts every session and knows no purport besides `Ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl MessageHandler for NoopHandler {}
