//! Per-connection protocol handling.

use crate::{HostError, MessageHandler, SessionRegistry};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use warden_core::wire::{self, WireRequest, WireResponse};
use warden_core::{
    CommunicationToken, ConnectResponse, DisconnectResponse, Purport, Request, Response, describe,
};

/// State shared by every connection of one host.
pub(crate) struct Shared<H> {
    pub(crate) handler: H,
    pub(crate) sessions: SessionRegistry,
}

pub(crate) async fn handle_connection<H: MessageHandler>(
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<Shared<H>>,
) -> Result<(), HostError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::debug!("New connection from {}", addr);

    // Sessions opened over this connection, closed with it.
    let mut opened: Vec<CommunicationToken> = Vec::new();

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("WebSocket error from {}: {}", addr, e);
                break;
            }
        };

        let text = match msg {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let request: WireRequest = match wire::decode(text.as_str()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid frame from {}: {}", addr, e);
                continue;
            }
        };

        let reply = dispatch(&shared, request, &mut opened).await;
        sink.send(WsMessage::Text(wire::encode(&reply)?.into())).await?;
    }

    for token in opened {
        if shared.sessions.revoke(&token).await {
            tracing::info!("Session {} closed with its connection", token);
        }
    }

    tracing::debug!("Connection closed: {}", addr);
    Ok(())
}

async fn dispatch<H: MessageHandler>(
    shared: &Shared<H>,
    request: WireRequest,
    opened: &mut Vec<CommunicationToken>,
) -> WireResponse {
    match request {
        WireRequest::Connect(request) => {
            if !shared.handler.accept(&request.candidate) {
                tracing::warn!("Refused session for candidate {}", request.candidate);
                return WireResponse::Connected(ConnectResponse::refused(request.candidate));
            }
            let token = shared.sessions.open().await;
            opened.push(token);
            tracing::info!("Session {} established", token);
            WireResponse::Connected(ConnectResponse::established(token))
        }

        WireRequest::Disconnect(request) => {
            // Only the connection that opened a session may close it.
            let owned = opened.contains(&request.token);
            let terminated = owned && shared.sessions.revoke(&request.token).await;
            opened.retain(|token| *token != request.token);
            if terminated {
                tracing::info!("Session {} terminated", request.token);
            } else {
                tracing::warn!("Disconnect for unknown session {}", request.token);
            }
            WireResponse::Disconnected(DisconnectResponse { terminated })
        }

        WireRequest::Message(request) => {
            WireResponse::Response(respond(shared, opened, request).await)
        }
    }
}

/// Answer a message. Its token must belong to a live session opened over
/// this same connection.
async fn respond<H: MessageHandler>(
    shared: &Shared<H>,
    opened: &[CommunicationToken],
    request: Request,
) -> Response {
    let owned = opened.contains(&request.token);
    if !owned || !shared.sessions.contains(&request.token).await {
        tracing::warn!("Rejecting {}: unknown token", request);
        return Response::unauthorized();
    }

    let response = match request.purport {
        Purport::Ping => Response::acknowledged(),
        _ => {
            tracing::debug!("Handling {}", request);
            shared.handler.handle(request).await
        }
    };
    tracing::debug!("Answering with {}", describe(Some(&response)));
    response
}
