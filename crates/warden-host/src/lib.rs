//! Host side of Warden.
//!
//! A [`Host`] listens for WebSocket connections from proxies, mints a session
//! token for every accepted handshake and answers requests: `Ping` is
//! acknowledged, requests with an unknown token are `Unauthorized`, anything
//! else goes to the [`MessageHandler`].

mod config;
mod handler;
mod registry;
mod server;

pub use config::HostConfig;
pub use handler::{MessageHandler, NoopHandler};
pub use registry::SessionRegistry;

use server::Shared;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use warden_core::Address;
use warden_core::wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

pub struct Host<H> {
    name: String,
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<Shared<H>>,
}

impl<H: MessageHandler> Host<H> {
    /// Bind the listener. Serving starts with [`Host::serve`].
    pub async fn bind(config: HostConfig, handler: H) -> Result<Self, HostError> {
        let listener = TcpListener::bind(config.bind).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            name: config.name,
            listener,
            local_addr,
            shared: Arc::new(Shared {
                handler,
                sessions: SessionRegistry::new(),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The address proxies should connect to.
    pub fn address(&self) -> Address {
        Address::new("ws", format!("{}/{}", self.local_addr, self.name))
    }

    pub fn sessions(&self) -> SessionRegistry {
        self.shared.sessions.clone()
    }

    pub async fn serve(self) -> Result<(), HostError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` completes, then drop every open connection.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), HostError> {
        tracing::info!("Listening on ws://{}", self.local_addr);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    let shared = self.shared.clone();
                    connections.spawn(async move {
                        if let Err(e) = server::handle_connection(stream, addr, shared).await {
                            tracing::warn!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Shutting down, dropping {} connection(s)", connections.len());
        connections.shutdown().await;
        Ok(())
    }
}
