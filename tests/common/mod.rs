use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use touch_soccer_server::build_app;
use touch_soccer_server::config::ServerConfig;
use touch_soccer_server::wire_format::{GameSnapshot, ServerMessage};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(&config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn status(&self) -> serde_json::Value {
        reqwest::get(format!("{}/status", self.base_url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream.send(Message::Text(text.to_string().into())).await.unwrap();
}

/// Read the next server message, skipping control frames.
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

pub async fn ws_read_snapshot(stream: &mut WsStream) -> GameSnapshot {
    match ws_read_server_msg(stream).await {
        ServerMessage::GameState(snapshot) => snapshot,
        other => panic!("Expected gameState, got: {other:?}"),
    }
}

/// Read snapshots until one satisfies `pred`.
pub async fn ws_wait_for_snapshot(
    stream: &mut WsStream,
    pred: impl Fn(&GameSnapshot) -> bool,
) -> GameSnapshot {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            if let ServerMessage::GameState(snapshot) = ws_read_server_msg(stream).await
                && pred(&snapshot)
            {
                return snapshot;
            }
        }
    })
    .await
    .expect("Timed out waiting for matching snapshot")
}

/// Connect and consume the assignment and initial snapshot.
pub async fn ws_join(server: &TestServer) -> (WsStream, ServerMessage) {
    let mut stream = ws_connect(&server.ws_url()).await;
    let greeting = ws_read_server_msg(&mut stream).await;
    let _ = ws_read_snapshot(&mut stream).await;
    (stream, greeting)
}
