//! Channel abstraction.
//!
//! A [`Channel`] is one transport connection to one remote endpoint. The
//! proxy owns it exclusively and drops it on disconnect or loss. Channels are
//! produced by a [`ChannelFactory`], which never connects on its own.
//!
//! An exchange whose future is dropped before the reply arrives must leave
//! the channel `Faulted`. The proxy relies on this to never pair a reply with
//! the wrong request.

use crate::TransportError;
use std::future::Future;
use warden_core::{
    Address, AddressError, ChannelState, ConnectRequest, ConnectResponse, DisconnectRequest,
    DisconnectResponse, Request, Response,
};

pub trait Channel: Send + 'static {
    fn state(&self) -> ChannelState;

    /// Open the transport and run the handshake.
    fn connect(
        &mut self,
        request: ConnectRequest,
    ) -> impl Future<Output = Result<ConnectResponse, TransportError>> + Send;

    fn disconnect(
        &mut self,
        request: DisconnectRequest,
    ) -> impl Future<Output = Result<DisconnectResponse, TransportError>> + Send;

    fn send(
        &mut self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;

    /// Release the transport. Must not fail; the channel ends up `Closed`.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub trait ChannelFactory: Send + Sync + 'static {
    type Channel: Channel;

    /// Build an unconnected channel for `address`.
    fn create_channel(&self, address: &Address) -> Result<Self::Channel, AddressError>;
}
