//! Client shell.
//!
//! Connects to the runtime, authenticates, and keeps the session under
//! heartbeat supervision. A lost connection is re-established with backoff.

use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use warden_client::{
    Address, Heartbeat, Proxy, ProxyConfig, Purport, WebSocketChannelFactory, describe,
    is_acknowledged,
};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "session-client", about = "Client shell talking to a Warden runtime")]
struct Args {
    /// TOML file with `address`, `heartbeat_interval_ms` and `timeout_ms`.
    #[arg(long, env = "WARDEN_CLIENT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "WARDEN_ADDRESS")]
    address: Option<Address>,
    #[arg(long)]
    heartbeat_ms: Option<u64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ProxyConfig> {
        let mut config = match (&self.config, &self.address) {
            (Some(path), _) => ProxyConfig::load(path)?,
            (None, Some(address)) => ProxyConfig::new(address.clone()),
            (None, None) => anyhow::bail!("either --config or --address is required"),
        };
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(ms) = self.heartbeat_ms {
            config.heartbeat_interval_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warden=info".parse()?))
        .init();

    let config = Args::parse().into_config()?;
    let proxy = Arc::new(warden_client::websocket(&config));
    let mut lost = proxy.subscribe_connection_lost();

    loop {
        let interrupted = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        if !establish_until(&proxy, interrupted).await {
            tracing::info!("Interrupted before a session was established");
            return Ok(());
        }
        let heartbeat = Heartbeat::spawn(proxy.clone(), config.heartbeat_interval());

        tokio::select! {
            event = lost.recv() => {
                heartbeat.stop();
                match event {
                    Ok(event) => tracing::warn!(
                        "Session {} with {} lost, reconnecting",
                        event.token,
                        event.address
                    ),
                    Err(e) => tracing::warn!("Connection-lost channel: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                heartbeat.stop();
                match proxy.disconnect().await {
                    Ok(terminated) => tracing::info!("Session closed (terminated: {})", terminated),
                    Err(e) => tracing::warn!("Could not close the session: {}", e),
                }
                return Ok(());
            }
        }
    }
}

/// Keep trying to establish a session until it succeeds or `shutdown`
/// resolves. Returns whether a session was established.
async fn establish_until(
    proxy: &Proxy<WebSocketChannelFactory>,
    shutdown: impl Future<Output = ()>,
) -> bool {
    tokio::select! {
        () = establish(proxy) => true,
        () = shutdown => false,
    }
}

/// Connect and authenticate, retrying with exponential backoff.
async fn establish(proxy: &Proxy<WebSocketChannelFactory>) {
    let mut backoff = Duration::from_millis(250);

    loop {
        match connect_and_authenticate(proxy).await {
            Ok(true) => return,
            Ok(false) => tracing::warn!("Runtime at {} refused the session", proxy.address()),
            Err(e) => tracing::warn!("Connecting to {} failed: {:#}", proxy.address(), e),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn connect_and_authenticate(
    proxy: &Proxy<WebSocketChannelFactory>,
) -> anyhow::Result<bool> {
    if !proxy.connect().await? {
        return Ok(false);
    }

    let response = proxy.send_purport(Purport::Authenticate).await?;
    if !is_acknowledged(Some(&response)) {
        tracing::warn!("Authentication answered with {}", describe(Some(&response)));
        proxy.disconnect().await?;
        return Ok(false);
    }

    tracing::info!("Authenticated: {}", describe(Some(&response)));
    Ok(true)
}
