//! Client side of Warden.
//!
//! A [`Proxy`] mediates every call to one remote endpoint: it owns the
//! channel, binds requests to the session token and turns transport failures
//! into either precise errors (for `connect`/`send`/`disconnect`) or a
//! [`ConnectionLost`] notification (for the heartbeat).
//!
//! ```no_run
//! # async fn run() -> Result<(), warden_client::ProxyError> {
//! use warden_client::{Address, ProxyConfig, Purport};
//!
//! let address: Address = "ws://127.0.0.1:9001/runtime".parse()?;
//! let config = ProxyConfig::new(address);
//! let proxy = warden_client::websocket(&config);
//! if proxy.connect().await? {
//!     let response = proxy.send_purport(Purport::Authenticate).await?;
//!     println!("{}", warden_client::describe(Some(&response)));
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
mod config;
mod error;
mod heartbeat;
mod proxy;
mod ws;

pub use channel::{Channel, ChannelFactory};
pub use config::{ConfigError, ProxyConfig};
pub use error::{ProxyError, Result, TransportError};
pub use heartbeat::Heartbeat;
pub use proxy::{ConnectionLost, LinkState, Proxy};
pub use ws::{WebSocketChannel, WebSocketChannelFactory};

pub use warden_core::{
    Address, ChannelState, CommunicationToken, Message, Purport, Response, ResponsePurport,
    describe, is_acknowledged,
};

/// A proxy speaking WebSocket to `config.address`.
pub fn websocket(config: &ProxyConfig) -> Proxy<WebSocketChannelFactory> {
    Proxy::new(
        config.address.clone(),
        WebSocketChannelFactory::new(config.timeout()),
    )
}
