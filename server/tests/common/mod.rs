//! Shared helpers for relay integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tertulia_client::{ChatClient, ChatMessage};
use tertulia_engine::{Relay, RelayHandle};
use tertulia_server::{serve, AppState, Config};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Start a relay server on an ephemeral port.
pub async fn start_server() -> (SocketAddr, RelayHandle) {
    start_server_with(Config::default()).await
}

pub async fn start_server_with(config: Config) -> (SocketAddr, RelayHandle) {
    let (addr, relay, _task) = start_server_with_task(config).await;
    (addr, relay)
}

/// Like [`start_server_with`], also returning the relay loop's task.
pub async fn start_server_with_task(
    config: Config,
) -> (SocketAddr, RelayHandle, JoinHandle<()>) {
    let (relay, task) = Relay::spawn();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = AppState::new(relay.clone(), config);
    tokio::spawn(serve(listener, state, std::future::pending()));

    (addr, relay, task)
}

/// Wait until the relay has registered exactly `expected` sessions.
pub async fn wait_for_sessions(relay: &RelayHandle, expected: usize) {
    for _ in 0..500 {
        if relay.session_count().await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("relay never reached {} sessions", expected);
}

/// Connect a client whose broadcasts are collected into a channel.
pub async fn join(
    addr: SocketAddr,
    name: &str,
) -> (ChatClient, mpsc::UnboundedReceiver<ChatMessage>) {
    let mut client = ChatClient::new(name);
    let (tx, rx) = mpsc::unbounded_channel();
    client.on_receive(move |msg| {
        let _ = tx.send(msg.clone());
    });
    client.connect(&format!("ws://{}", addr)).await.unwrap();
    (client, rx)
}

/// Next broadcast, failing the test if none arrives in time.
pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<ChatMessage>) -> ChatMessage {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("receive channel closed")
}

/// Assert nothing else arrives for a short while.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<ChatMessage>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    assert!(rx.try_recv().is_err(), "unexpected extra broadcast");
}

// Raw frames, bypassing the client library

pub type RawSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub async fn raw_socket(addr: SocketAddr, path: &str) -> RawSocket {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", addr, path))
        .await
        .unwrap();
    ws
}

pub async fn send_raw(ws: &mut RawSocket, text: &str) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

pub async fn next_raw(ws: &mut RawSocket) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}
