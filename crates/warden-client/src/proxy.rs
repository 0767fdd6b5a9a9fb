//! The proxy: one remote endpoint, one channel at a time.
//!
//! Lifecycle:
//! - `connect` creates a channel through the factory and runs the handshake
//! - `send` stamps each message with the session token and forwards it
//! - `disconnect` tears the session down
//! - `test_connection` probes liveness and never fails; a failed probe moves
//!   the proxy to [`LinkState::Lost`] and notifies every subscriber
//!
//! Every operation locks the session for its whole duration, so a heartbeat
//! running on another task never sees a half-closed channel. An operation
//! dropped mid-exchange releases the lock and leaves its channel faulted; the
//! next `connect` replaces it.

use crate::channel::{Channel, ChannelFactory};
use crate::{ProxyError, Result, TransportError};
use tokio::sync::{Mutex, broadcast};
use warden_core::{
    Address, CommunicationToken, ConnectRequest, DisconnectRequest, Message, Purport, Response,
    describe,
};

/// Capacity of the connection-lost broadcast. One event per loss, so this is
/// only reached by subscribers that never read.
const LOST_CAPACITY: usize = 16;

/// Connection state as seen by the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unconnected,
    Connected,
    /// A heartbeat failed. Requires a new `connect`.
    Lost,
}

/// Broadcast to subscribers when a heartbeat detects a dead session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLost {
    pub address: Address,
    pub token: CommunicationToken,
}

struct Session<C> {
    token: Option<CommunicationToken>,
    channel: Option<C>,
    link: LinkState,
}

impl<C: Channel> Session<C> {
    /// Close and drop the channel, if any.
    async fn release(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

pub struct Proxy<F: ChannelFactory> {
    address: Address,
    factory: F,
    session: Mutex<Session<F::Channel>>,
    lost_tx: broadcast::Sender<ConnectionLost>,
}

impl<F: ChannelFactory> Proxy<F> {
    pub fn new(address: Address, factory: F) -> Self {
        let (lost_tx, _) = broadcast::channel(LOST_CAPACITY);
        Self {
            address,
            factory,
            session: Mutex::new(Session {
                token: None,
                channel: None,
                link: LinkState::Unconnected,
            }),
            lost_tx,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub async fn link_state(&self) -> LinkState {
        self.session.lock().await.link
    }

    /// The current session token, if connected.
    pub async fn token(&self) -> Option<CommunicationToken> {
        self.session.lock().await.token
    }

    /// Register an observer for [`ConnectionLost`].
    ///
    /// Each receiver sees every loss that happens after it subscribed,
    /// exactly once.
    pub fn subscribe_connection_lost(&self) -> broadcast::Receiver<ConnectionLost> {
        self.lost_tx.subscribe()
    }

    /// Connect with a freshly generated candidate token.
    pub async fn connect(&self) -> Result<bool> {
        self.connect_with(CommunicationToken::generate()).await
    }

    /// Run the handshake on a new channel.
    ///
    /// Returns `Ok(false)` if the remote side refused the session. Fails with
    /// `InvalidState` while a session on an open channel is still held; a
    /// session whose channel has faulted is discarded and replaced.
    pub async fn connect_with(&self, candidate: CommunicationToken) -> Result<bool> {
        let mut session = self.session.lock().await;

        let open = session
            .channel
            .as_ref()
            .is_some_and(|channel| channel.state().is_open());
        if session.token.is_some() && open {
            return Err(ProxyError::InvalidState("already connected, disconnect first"));
        }
        if session.channel.is_some() {
            tracing::info!("Discarding stale channel to {}", self.address);
            session.release().await;
        }
        session.token = None;
        session.link = LinkState::Unconnected;

        let mut channel = self.factory.create_channel(&self.address)?;
        tracing::debug!(
            "Connecting to {} with candidate token {}",
            self.address,
            candidate
        );

        let response = match channel.connect(ConnectRequest::new(candidate)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Handshake with {} failed: {}", self.address, e);
                channel.close().await;
                return Err(e.into());
            }
        };

        if !response.established {
            tracing::warn!("{} refused the connection", self.address);
            channel.close().await;
            return Ok(false);
        }

        session.token = Some(response.token);
        session.channel = Some(channel);
        session.link = LinkState::Connected;
        tracing::info!("Connected to {} (token {})", self.address, response.token);
        Ok(true)
    }

    /// Close the session. Returns whether the remote side terminated it.
    pub async fn disconnect(&self) -> Result<bool> {
        let mut session = self.session.lock().await;

        let token = session
            .token
            .ok_or(ProxyError::InvalidState("not connected"))?;
        let channel = session
            .channel
            .as_mut()
            .ok_or(ProxyError::InvalidState("not connected"))?;
        ensure_open(channel)?;

        let response = channel.disconnect(DisconnectRequest::new(token)).await?;

        session.release().await;
        session.token = None;
        session.link = LinkState::Unconnected;
        tracing::info!(
            "Disconnected from {} (terminated: {})",
            self.address,
            response.terminated
        );
        Ok(response.terminated)
    }

    /// Send a message on the current session.
    ///
    /// The message is stamped with the session token; a token set by the
    /// caller is ignored.
    pub async fn send(&self, message: Message) -> Result<Response> {
        if message.is_empty() {
            return Err(ProxyError::InvalidArgument("message has no purport"));
        }
        let mut session = self.session.lock().await;
        self.send_locked(&mut session, message).await
    }

    /// Send a bare message carrying only `purport`.
    pub async fn send_purport(&self, purport: Purport) -> Result<Response> {
        self.send(Message::new(purport)).await
    }

    async fn send_locked(
        &self,
        session: &mut Session<F::Channel>,
        message: Message,
    ) -> Result<Response> {
        let token = session
            .token
            .ok_or(ProxyError::InvalidState("not connected"))?;
        let channel = session
            .channel
            .as_mut()
            .ok_or(ProxyError::InvalidState("not connected"))?;
        ensure_open(channel)?;

        let request = message.stamp(token);
        tracing::debug!("Sending {} to {}", request, self.address);
        let response = channel.send(request).await?;
        tracing::debug!("Received {} from {}", describe(Some(&response)), self.address);
        Ok(response)
    }

    /// Ping the remote side. Never fails.
    ///
    /// Only meaningful while connected; in any other state this is a no-op.
    /// Returns the state after the probe.
    pub async fn test_connection(&self) -> LinkState {
        let mut session = self.session.lock().await;
        if session.link != LinkState::Connected {
            return session.link;
        }

        let probe = self.send_locked(&mut session, Message::new(Purport::Ping));
        let healthy = match probe.await {
            Ok(response) if response.is_acknowledged() => true,
            Ok(response) => {
                tracing::warn!(
                    "Heartbeat to {} answered with {}",
                    self.address,
                    describe(Some(&response))
                );
                false
            }
            Err(e) => {
                tracing::warn!("Heartbeat to {} failed: {}", self.address, e);
                false
            }
        };

        if !healthy {
            self.mark_lost(&mut session).await;
        }
        session.link
    }

    async fn mark_lost(&self, session: &mut Session<F::Channel>) {
        session.release().await;
        let token = session.token.take();
        session.link = LinkState::Lost;
        tracing::warn!("Lost connection to {}", self.address);

        if let Some(token) = token {
            // No subscribers is fine.
            let _ = self.lost_tx.send(ConnectionLost {
                address: self.address.clone(),
                token,
            });
        }
    }
}

fn ensure_open<C: Channel>(channel: &C) -> Result<()> {
    let state = channel.state();
    if state.is_open() {
        Ok(())
    } else {
        Err(TransportError::NotOpen(state).into())
    }
}
