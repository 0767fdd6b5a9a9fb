//! Proxies talking to a real host over the loopback.

use futures_util::FutureExt;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warden_client::{
    LinkState, Message, Proxy, ProxyConfig, ProxyError, Purport, Response, ResponsePurport,
    WebSocketChannelFactory, is_acknowledged,
};
use warden_core::{CommunicationToken, Request};
use warden_host::{Host, HostConfig, HostError, MessageHandler, SessionRegistry};

/// Acknowledges authentication and serves a configuration document. `slow`
/// is acknowledged after a delay.
struct Exam {
    refuse: bool,
}

impl MessageHandler for Exam {
    fn accept(&self, _candidate: &CommunicationToken) -> bool {
        !self.refuse
    }

    async fn handle(&self, request: Request) -> Response {
        match request.purport {
            Purport::Authenticate => Response::acknowledged(),
            Purport::Named(name) if name == "get_configuration" => {
                Response::new(ResponsePurport::named("configuration"))
                    .with_payload(serde_json::json!({"quit_password": null}))
            }
            Purport::Named(name) if name == "slow" => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Response::acknowledged()
            }
            _ => Response::unknown_message(),
        }
    }
}

struct Running {
    config: ProxyConfig,
    sessions: SessionRegistry,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), HostError>>,
}

impl Running {
    fn proxy(&self) -> Proxy<WebSocketChannelFactory> {
        warden_client::websocket(&self.config)
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.await.unwrap().unwrap();
    }
}

async fn start(refuse: bool) -> Running {
    let config = HostConfig {
        bind: ([127, 0, 0, 1], 0).into(),
        name: "runtime".to_string(),
    };
    let host = Host::bind(config, Exam { refuse }).await.unwrap();
    let mut proxy_config = ProxyConfig::new(host.address());
    proxy_config.timeout_ms = 2000;
    let sessions = host.sessions();
    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(host.serve_with_shutdown(async {
        let _ = rx.await;
    }));

    Running {
        config: proxy_config,
        sessions,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let host = start(false).await;
    let proxy = host.proxy();

    assert!(proxy.connect().await.unwrap());
    let token = proxy.token().await.unwrap();
    assert!(host.sessions.contains(&token).await);

    let response = proxy.send_purport(Purport::Authenticate).await.unwrap();
    assert!(is_acknowledged(Some(&response)));
    assert_eq!(proxy.test_connection().await, LinkState::Connected);

    let response = proxy
        .send(Message::new(Purport::named("get_configuration")))
        .await
        .unwrap();
    assert_eq!(response.purport, ResponsePurport::named("configuration"));
    assert!(response.payload.is_some());

    let response = proxy.send_purport(Purport::named("shutdown")).await.unwrap();
    assert_eq!(response.purport, ResponsePurport::UnknownMessage);

    assert!(proxy.disconnect().await.unwrap());
    assert!(host.sessions.is_empty().await);

    host.stop().await;
}

#[tokio::test]
async fn refused_handshake() {
    let host = start(true).await;
    let proxy = host.proxy();

    assert!(!proxy.connect().await.unwrap());
    assert_eq!(proxy.token().await, None);
    assert!(host.sessions.is_empty().await);

    host.stop().await;
}

#[tokio::test]
async fn revoked_session_is_lost_on_heartbeat() {
    let host = start(false).await;
    let proxy = host.proxy();
    let mut lost = proxy.subscribe_connection_lost();

    assert!(proxy.connect().await.unwrap());
    let token = proxy.token().await.unwrap();
    assert!(host.sessions.revoke(&token).await);

    let response = proxy.send_purport(Purport::Authenticate).await.unwrap();
    assert_eq!(response.purport, ResponsePurport::Unauthorized);

    assert_eq!(proxy.test_connection().await, LinkState::Lost);
    assert_eq!(lost.recv().await.unwrap().token, token);

    host.stop().await;
}

#[tokio::test]
async fn host_shutdown_faults_the_channel() {
    let host = start(false).await;
    let proxy = host.proxy();
    let mut lost = proxy.subscribe_connection_lost();

    assert!(proxy.connect().await.unwrap());
    host.stop().await;

    let err = proxy.send_purport(Purport::Authenticate).await.unwrap_err();
    assert!(err.is_transport_fault());
    let err = proxy.disconnect().await.unwrap_err();
    assert!(err.is_transport_fault());

    assert_eq!(proxy.test_connection().await, LinkState::Lost);
    assert!(lost.try_recv().is_ok());
}

#[tokio::test]
async fn each_proxy_gets_its_own_session() {
    let host = start(false).await;
    let proxy = host.proxy();
    assert!(proxy.connect().await.unwrap());
    let first = proxy.token().await.unwrap();

    let second = host.proxy();
    assert!(second.connect().await.unwrap());
    assert_ne!(second.token().await.unwrap(), first);
    assert_eq!(host.sessions.len().await, 2);

    assert!(proxy.disconnect().await.unwrap());
    assert!(second.disconnect().await.unwrap());
    host.stop().await;
}

#[tokio::test]
async fn unreachable_host_is_a_transport_fault() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ProxyConfig::new(format!("ws://{addr}/runtime").parse().unwrap());
    config.timeout_ms = 500;
    let proxy = warden_client::websocket(&config);

    let err = proxy.connect().await.unwrap_err();
    assert!(matches!(err, ProxyError::TransportFault(_)));
    assert_eq!(proxy.link_state().await, LinkState::Unconnected);
}

#[tokio::test]
async fn heartbeat_detects_host_shutdown() {
    let host = start(false).await;
    let mut config = host.config.clone();
    config.heartbeat_interval_ms = 50;
    let proxy = std::sync::Arc::new(warden_client::websocket(&config));
    let mut lost = proxy.subscribe_connection_lost();

    assert!(proxy.connect().await.unwrap());
    let period = config.heartbeat_interval();
    let heartbeat = warden_client::Heartbeat::spawn(proxy.clone(), period);
    host.stop().await;

    let event = tokio::time::timeout(Duration::from_secs(5), lost.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.address, *proxy.address());
    assert_eq!(proxy.link_state().await, LinkState::Lost);
    heartbeat.stop();
}

fn get_configuration() -> Message {
    Message::new(Purport::named("get_configuration"))
}

#[tokio::test]
async fn abandoned_send_never_yields_a_stale_reply() {
    let host = start(false).await;
    let proxy = host.proxy();
    assert!(proxy.connect().await.unwrap());

    // Polled once: the request goes out and its reply is left unread.
    let abandoned = proxy.send_purport(Purport::Authenticate).now_or_never();
    assert!(abandoned.is_none());

    let err = proxy.send(get_configuration()).await.unwrap_err();
    assert!(err.is_transport_fault());
    let err = proxy.disconnect().await.unwrap_err();
    assert!(err.is_transport_fault());

    assert!(proxy.connect().await.unwrap());
    let response = proxy.send(get_configuration()).await.unwrap();
    assert_eq!(response.purport, ResponsePurport::named("configuration"));
    assert!(proxy.disconnect().await.unwrap());

    host.stop().await;
}

#[tokio::test]
async fn send_abandoned_by_caller_timeout_faults_the_channel() {
    let host = start(false).await;
    let proxy = host.proxy();
    assert!(proxy.connect().await.unwrap());

    let slow = proxy.send_purport(Purport::named("slow"));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), slow)
            .await
            .is_err()
    );

    // The late acknowledgement must not answer this request.
    let err = proxy.send(get_configuration()).await.unwrap_err();
    assert!(err.is_transport_fault());
    assert_eq!(proxy.test_connection().await, LinkState::Lost);

    assert!(proxy.connect().await.unwrap());
    let response = proxy.send(get_configuration()).await.unwrap();
    assert_eq!(response.purport, ResponsePurport::named("configuration"));

    host.stop().await;
}
