//! Runtime host.
//!
//! Plays the runtime side of an exam session: accepts client shells,
//! acknowledges their authentication and answers pings until Ctrl-C.
//!
//!   cargo run --bin session-host -- --bind 127.0.0.1:9001
//!   cargo run --bin session-client -- --address ws://127.0.0.1:9001/runtime

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warden_core::{Purport, Request, Response, ResponsePurport};
use warden_host::{Host, HostConfig, MessageHandler};

#[derive(Debug, Parser)]
#[command(name = "session-host", about = "Runtime host for Warden client shells")]
struct Args {
    /// TOML file with `bind` and `name`.
    #[arg(long, env = "WARDEN_HOST_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "WARDEN_BIND")]
    bind: Option<SocketAddr>,
    #[arg(long)]
    name: Option<String>,
}

struct Runtime;

impl MessageHandler for Runtime {
    async fn handle(&self, request: Request) -> Response {
        match request.purport {
            Purport::Authenticate => Response::acknowledged()
                .with_payload(serde_json::json!({ "process_id": std::process::id() })),
            Purport::Named(name) if name == "shutdown_requested" => {
                tracing::info!("Client {} asked for shutdown", request.token);
                Response::new(ResponsePurport::named("shutdown_deferred"))
            }
            _ => Response::unknown_message(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warden=info".parse()?))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            HostConfig::from_toml_str(&text)?
        }
        None => HostConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(name) = args.name {
        config.name = name;
    }

    let host = Host::bind(config, Runtime).await?;
    tracing::info!("Clients connect to {}", host.address());

    host.serve_with_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
