//! WebSocket channel.
//!
//! One JSON text frame per request, one per reply. Every exchange is bounded
//! by the channel timeout; any failure, or an exchange abandoned before its
//! reply arrives, leaves the channel `Faulted`.

use crate::TransportError;
use crate::channel::{Channel, ChannelFactory};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use warden_core::wire::{self, WireRequest, WireResponse};
use warden_core::{
    Address, AddressError, ChannelState, ConnectRequest, ConnectResponse, DisconnectRequest,
    DisconnectResponse, Request, Response,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds [`WebSocketChannel`]s for `ws://` addresses.
#[derive(Debug, Clone)]
pub struct WebSocketChannelFactory {
    timeout: Duration,
}

impl WebSocketChannelFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ChannelFactory for WebSocketChannelFactory {
    type Channel = WebSocketChannel;

    fn create_channel(&self, address: &Address) -> Result<WebSocketChannel, AddressError> {
        if address.scheme() != "ws" {
            return Err(AddressError::UnsupportedScheme(address.scheme().to_string()));
        }
        Ok(WebSocketChannel {
            url: address.to_string(),
            timeout: self.timeout,
            state: ChannelState::Created,
            stream: None,
        })
    }
}

pub struct WebSocketChannel {
    url: String,
    timeout: Duration,
    state: ChannelState,
    stream: Option<WsStream>,
}

impl WebSocketChannel {
    async fn open(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let connecting = tokio_tungstenite::connect_async(self.url.as_str());
        let opened = tokio::time::timeout(self.timeout, connecting)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))
            .and_then(|result| result.map_err(TransportError::from));
        match opened {
            Ok((stream, _)) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                self.state = ChannelState::Faulted;
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, frame: &WireRequest) -> Result<WireResponse, TransportError> {
        let previous = self.state;
        let Some(stream) = self.stream.as_mut() else {
            self.state = ChannelState::Faulted;
            return Err(TransportError::NotOpen(previous));
        };

        // Stays faulted if this future is dropped before the reply is read,
        // so a stale reply can never be taken for the next exchange's.
        self.state = ChannelState::Faulted;
        let result = tokio::time::timeout(self.timeout, round_trip(stream, frame))
            .await
            .unwrap_or(Err(TransportError::Timeout(self.timeout)));
        if result.is_ok() {
            self.state = previous;
        }
        result
    }

    fn unexpected(&mut self, expected: &'static str, actual: &WireResponse) -> TransportError {
        self.state = ChannelState::Faulted;
        TransportError::UnexpectedFrame {
            expected,
            actual: actual.kind(),
        }
    }
}

async fn round_trip(
    stream: &mut WsStream,
    frame: &WireRequest,
) -> Result<WireResponse, TransportError> {
    let text = wire::encode(frame)?;
    stream.send(WsMessage::Text(text.into())).await?;

    loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => return Ok(wire::decode(text.as_str())?),
            Some(Ok(WsMessage::Close(_))) | None => return Err(TransportError::Closed),
            // Control frames are answered by tungstenite itself.
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

impl Channel for WebSocketChannel {
    fn state(&self) -> ChannelState {
        self.state
    }

    async fn connect(
        &mut self,
        request: ConnectRequest,
    ) -> Result<ConnectResponse, TransportError> {
        self.open().await?;
        match self.exchange(&WireRequest::Connect(request)).await? {
            WireResponse::Connected(response) => {
                if response.established {
                    self.state = ChannelState::Opened;
                }
                Ok(response)
            }
            other => Err(self.unexpected("connected", &other)),
        }
    }

    async fn disconnect(
        &mut self,
        request: DisconnectRequest,
    ) -> Result<DisconnectResponse, TransportError> {
        match self.exchange(&WireRequest::Disconnect(request)).await? {
            WireResponse::Disconnected(response) => Ok(response),
            other => Err(self.unexpected("disconnected", &other)),
        }
    }

    async fn send(&mut self, request: Request) -> Result<Response, TransportError> {
        match self.exchange(&WireRequest::Message(request)).await? {
            WireResponse::Response(response) => Ok(response),
            other => Err(self.unexpected("response", &other)),
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = tokio::time::timeout(self.timeout, stream.close(None)).await {
                tracing::debug!("Close handshake with {} timed out: {}", self.url, e);
            }
        }
        self.state = ChannelState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_rejects_other_schemes() {
        let factory = WebSocketChannelFactory::new(Duration::from_secs(1));
        let address = Address::new("pipe", "runtime");
        assert_eq!(
            factory.create_channel(&address).err(),
            Some(AddressError::UnsupportedScheme("pipe".to_string()))
        );
    }

    #[test]
    fn created_channel_is_not_connected() {
        let factory = WebSocketChannelFactory::new(Duration::from_secs(1));
        let address: Address = "ws://127.0.0.1:9/runtime".parse().unwrap();
        let channel = factory.create_channel(&address).unwrap();
        assert_eq!(channel.state(), ChannelState::Created);
        assert!(channel.stream.is_none());
    }

    #[tokio::test]
    async fn send_before_connect_faults() {
        let factory = WebSocketChannelFactory::new(Duration::from_secs(1));
        let address: Address = "ws://127.0.0.1:9/runtime".parse().unwrap();
        let mut channel = factory.create_channel(&address).unwrap();
        let request = warden_core::Message::new(warden_core::Purport::Ping)
            .stamp(warden_core::CommunicationToken::generate());

        let result = channel.send(request).await;
        assert!(matches!(
            result,
            Err(TransportError::NotOpen(ChannelState::Created))
        ));
        assert_eq!(channel.state(), ChannelState::Faulted);
    }
}
