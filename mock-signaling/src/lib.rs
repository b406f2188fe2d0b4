//! A small signaling server for exercising flock end to end.
//!
//! Every websocket on `/signaling` waits for `connect`, then either redirects the client
//! or sends an offer, optionally pings on an interval and records everything it receives.
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::{routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Redirect every `connect` that is not itself a redirect here.
    pub redirect_to: Option<String>,
    pub ping_interval: Option<Duration>,
    /// Ask for stats in every ping.
    pub ping_stats: bool,
}

#[derive(Debug, Default)]
pub struct MockState {
    config: MockConfig,
    connections: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn record(&self, message: Value) {
        if let Ok(mut received) = self.received.lock() {
            received.push(message);
        }
    }
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/signaling", get(upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<MockState>>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn next_json(socket: &mut WebSocket) -> Option<Value> {
    loop {
        match socket.recv().await? {
            Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                Ok(value) => return Some(value),
                Err(err) => warn!("Ignoring malformed frame: {err}"),
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => {}
            Err(err) => {
                debug!("Socket error: {err}");
                return None;
            }
        }
    }
}

async fn send_json(socket: &mut WebSocket, message: Value) -> bool {
    socket.send(Message::Text(message.to_string())).await.is_ok()
}

async fn tick(ping: &mut Option<tokio::time::Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn session(mut socket: WebSocket, state: Arc<MockState>) {
    let index = state.connections.fetch_add(1, Ordering::SeqCst);
    let connection_id = uuid::Uuid::new_v4().simple().to_string();

    let Some(connect) = next_json(&mut socket).await else {
        return;
    };
    let redirected = connect["redirect"] == true;
    let is_connect = connect["type"] == "connect";
    state.record(connect);
    if !is_connect {
        warn!("Expected connect on connection {index}");
        return;
    }

    if let (Some(location), false) = (&state.config.redirect_to, redirected) {
        info!("Redirecting connection {index} to {location}");
        send_json(&mut socket, json!({"type": "redirect", "location": location})).await;
        let _ = socket.close().await;
        return;
    }

    let offer = json!({
        "type": "offer",
        "sdp": "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
        "connection_id": connection_id,
        "client_id": connection_id,
        "session_id": format!("session-{index}"),
    });
    if !send_json(&mut socket, offer).await {
        return;
    }
    debug!("Sent offer on connection {index}");

    let mut ping = state.config.ping_interval.map(|period| {
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });
    loop {
        tokio::select! {
            message = next_json(&mut socket) => {
                let Some(message) = message else {
                    break;
                };
                let disconnect = message["type"] == "disconnect";
                state.record(message);
                if disconnect {
                    debug!("Connection {index} disconnected");
                    break;
                }
            }
            _ = tick(&mut ping) => {
                let message = json!({"type": "ping", "stats": state.config.ping_stats});
                if !send_json(&mut socket, message).await {
                    break;
                }
            }
        }
    }
}

/// A mock server running on an ephemeral local port.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn spawn(config: MockConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new(config));
        let app = router(state.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Mock signaling server failed: {err}");
            }
        });
        info!("Mock signaling server listening on {addr}");
        Ok(Self { addr, state, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("ws://{}/signaling", self.addr)
    }

    /// Number of websocket sessions accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.state
            .received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    /// Received messages of one `type`.
    pub fn received_of(&self, kind: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|message| message["type"] == kind)
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
