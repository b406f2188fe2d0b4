//! In-memory stand-ins for the network and the media stack.
use crate::error::{MediaError, TransportError};
use crate::event::{ClientEvent, SessionEvent};
use crate::media::{IceConnectionState, MediaEngine, MediaObserver, MediaRequest, MediaSession};
use crate::registry::ClientId;
use crate::timeline::{Timeline, TimelineHandle};
use crate::transport::{Dial, WsLink};
use flock_core::{Endpoint, SessionConfig};
use futures::channel::mpsc as fmpsc;
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Refuse,
    Delay(Duration),
}

/// Dials in-memory links. The server side of each link is handed out as a [`PeerEnd`].
pub(crate) struct FakeDialer {
    behaviour: Mutex<HashMap<String, Behaviour>>,
    dialed: Mutex<Vec<String>>,
    established: AtomicUsize,
    peers_tx: mpsc::UnboundedSender<PeerEnd>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PeerEnd>>,
}

fn key(url: &str) -> String {
    Endpoint::parse(url).unwrap().as_str().to_string()
}

impl FakeDialer {
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            behaviour: Mutex::new(HashMap::new()),
            dialed: Mutex::new(vec![]),
            established: AtomicUsize::new(0),
            peers_tx,
            peers_rx: tokio::sync::Mutex::new(peers_rx),
        }
    }

    pub fn refuse(&self, url: &str) {
        self.behaviour
            .lock()
            .unwrap()
            .insert(key(url), Behaviour::Refuse);
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.behaviour
            .lock()
            .unwrap()
            .insert(key(url), Behaviour::Delay(delay));
    }

    pub fn accept(&self, url: &str) {
        self.behaviour.lock().unwrap().remove(&key(url));
    }

    pub fn established(&self) -> usize {
        self.established.load(Ordering::SeqCst)
    }

    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    pub async fn next_peer(&self) -> PeerEnd {
        self.peers_rx
            .lock()
            .await
            .recv()
            .await
            .expect("dialer dropped")
    }

    pub fn take_peers(&self) -> Vec<PeerEnd> {
        let mut rx = self.peers_rx.try_lock().unwrap();
        let mut peers = vec![];
        while let Ok(peer) = rx.try_recv() {
            peers.push(peer);
        }
        peers
    }
}

impl Dial for FakeDialer {
    fn dial<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<WsLink, TransportError>> {
        Box::pin(async move {
            self.dialed.lock().unwrap().push(endpoint.to_string());
            let behaviour = self.behaviour.lock().unwrap().get(endpoint.as_str()).copied();
            match behaviour {
                Some(Behaviour::Refuse) => return Err(TransportError::Closed),
                Some(Behaviour::Delay(delay)) => tokio::time::sleep(delay).await,
                None => {}
            }

            let (to_peer, incoming) = fmpsc::unbounded::<String>();
            let (outgoing, from_peer) = fmpsc::unbounded::<Result<String, TransportError>>();
            let sink = to_peer.sink_map_err(|_| TransportError::Closed);
            let link = WsLink::new(Box::pin(sink), Box::pin(from_peer));

            self.established.fetch_add(1, Ordering::SeqCst);
            let _ = self.peers_tx.send(PeerEnd {
                endpoint: endpoint.clone(),
                incoming,
                outgoing: Some(outgoing),
            });
            Ok(link)
        })
    }
}

/// Server side of an in-memory link.
pub(crate) struct PeerEnd {
    pub endpoint: Endpoint,
    incoming: fmpsc::UnboundedReceiver<String>,
    outgoing: Option<fmpsc::UnboundedSender<Result<String, TransportError>>>,
}

impl PeerEnd {
    /// Next frame from the client, `None` once the client closed the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.incoming.next().await
    }

    pub async fn recv_json(&mut self) -> Value {
        let text = self.recv_text().await.expect("link closed");
        serde_json::from_str(&text).unwrap()
    }

    /// Skip frames until one of type `kind` arrives.
    pub async fn recv_type(&mut self, kind: &str) -> Value {
        loop {
            let message = self.recv_json().await;
            if message["type"] == kind {
                return message;
            }
        }
    }

    pub fn send_text(&self, text: &str) {
        if let Some(tx) = &self.outgoing {
            let _ = tx.unbounded_send(Ok(text.to_string()));
        }
    }

    pub fn send_json(&self, message: Value) {
        self.send_text(&message.to_string());
    }

    /// End the link cleanly from the server side.
    pub fn hang_up(&mut self) {
        self.outgoing = None;
    }

    /// Fail the link with a transport error.
    pub fn fail(&mut self) {
        if let Some(tx) = self.outgoing.take() {
            let _ = tx.unbounded_send(Err(TransportError::Closed));
        }
    }
}

pub(crate) fn offer(connection_id: &str) -> Value {
    json!({
        "type": "offer",
        "sdp": format!("offer-sdp-{connection_id}"),
        "connection_id": connection_id,
        "client_id": "client",
        "session_id": "session",
    })
}

#[derive(Default)]
pub(crate) struct FakeMedia {
    sessions: Mutex<Vec<Arc<FakeMediaSession>>>,
    fail_create: AtomicBool,
    manual_ice: AtomicBool,
}

impl FakeMedia {
    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Do not report ICE connected when an answer is created.
    pub fn manual_ice(&self) {
        self.manual_ice.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<FakeMediaSession> {
        self.sessions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no media session")
    }
}

impl MediaEngine for FakeMedia {
    fn create_session(
        &self,
        request: MediaRequest,
        observer: Arc<dyn MediaObserver>,
    ) -> Result<Arc<dyn MediaSession>, MediaError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MediaError::Engine("refused".to_string()));
        }
        let session = Arc::new(FakeMediaSession {
            observer,
            request,
            auto_ice: !self.manual_ice.load(Ordering::SeqCst),
            remote: Mutex::default(),
            answers: AtomicUsize::new(0),
            open: Mutex::default(),
            sent: Mutex::default(),
            encodings: Mutex::default(),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

pub(crate) struct FakeMediaSession {
    observer: Arc<dyn MediaObserver>,
    pub request: MediaRequest,
    auto_ice: bool,
    remote: Mutex<Vec<String>>,
    answers: AtomicUsize,
    open: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    encodings: Mutex<Vec<(Option<String>, Vec<Value>)>>,
    closed: AtomicBool,
}

impl FakeMediaSession {
    pub fn open_channel(&self, label: &str) {
        self.open.lock().unwrap().insert(label.to_string());
        self.observer.on_data_channel_state(label, true);
    }

    pub fn close_channel(&self, label: &str) {
        self.open.lock().unwrap().remove(label);
        self.observer.on_data_channel_state(label, false);
    }

    pub fn deliver(&self, label: &str, data: Vec<u8>) {
        self.observer.on_data_channel_message(label, data);
    }

    pub fn ice(&self, state: IceConnectionState) {
        self.observer.on_ice_connection_state(state);
    }

    pub fn candidate(&self, candidate: &str) {
        self.observer.on_ice_candidate(candidate.to_string());
    }

    pub fn remote(&self) -> Vec<String> {
        self.remote.lock().unwrap().clone()
    }

    pub fn sent_on(&self, label: &str) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn encodings(&self) -> Vec<(Option<String>, Vec<Value>)> {
        self.encodings.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MediaSession for FakeMediaSession {
    fn set_remote_offer(&self, sdp: String) -> BoxFuture<'_, Result<(), MediaError>> {
        self.remote.lock().unwrap().push(sdp);
        Box::pin(async { Ok(()) })
    }

    fn create_answer(&self) -> BoxFuture<'_, Result<String, MediaError>> {
        let n = self.answers.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 1 && self.auto_ice {
            self.observer
                .on_ice_connection_state(IceConnectionState::Connected);
        }
        Box::pin(async move { Ok(format!("answer-sdp-{n}")) })
    }

    fn stats(&self) -> BoxFuture<'_, Result<Value, MediaError>> {
        Box::pin(async { Ok(json!([{ "type": "outbound-rtp", "packetsSent": 1 }])) })
    }

    fn set_encodings(&self, mid: Option<&str>, encodings: &[Value]) -> Result<(), MediaError> {
        self.encodings
            .lock()
            .unwrap()
            .push((mid.map(str::to_string), encodings.to_vec()));
        Ok(())
    }

    fn send_data(&self, label: &str, data: Vec<u8>) -> Result<(), MediaError> {
        if !self.open.lock().unwrap().contains(label) {
            return Err(MediaError::ChannelClosed(label.to_string()));
        }
        self.sent.lock().unwrap().push((label.to_string(), data));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A timeline wired to fakes, with its event tap.
pub(crate) struct Harness {
    pub dialer: Arc<FakeDialer>,
    pub media: Arc<FakeMedia>,
    pub handle: TimelineHandle,
    timeline: Option<Timeline>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
}

pub(crate) const URL: &str = "ws://signaling.test/signaling";

pub(crate) fn config() -> SessionConfig {
    SessionConfig::new("load-test", &[URL])
}

impl Harness {
    pub fn new() -> Self {
        let dialer = Arc::new(FakeDialer::new());
        let media = Arc::new(FakeMedia::default());
        let mut timeline = Timeline::new(dialer.clone(), media.clone());
        let events = timeline.event_tap();
        Self {
            dialer,
            media,
            handle: timeline.handle(),
            timeline: Some(timeline),
            events,
        }
    }

    pub fn timeline(&mut self) -> &mut Timeline {
        self.timeline.as_mut().expect("timeline already started")
    }

    pub fn take_timeline(&mut self) -> Timeline {
        self.timeline.take().expect("timeline already started")
    }

    pub fn add(&mut self, config: SessionConfig) -> ClientId {
        self.timeline().add_client(config).unwrap()
    }

    pub fn start(&mut self) -> JoinHandle<()> {
        tokio::spawn(self.take_timeline().run())
    }

    pub async fn next_event(&mut self) -> ClientEvent {
        self.events.recv().await.expect("timeline stopped")
    }

    /// Skip events until one matches.
    pub async fn wait_for(&mut self, matches: impl Fn(&SessionEvent) -> bool) -> ClientEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event.event) {
                return event;
            }
        }
    }

    /// Every event up to and including the first match.
    pub async fn collect_until(
        &mut self,
        matches: impl Fn(&SessionEvent) -> bool,
    ) -> Vec<SessionEvent> {
        let mut seen = vec![];
        loop {
            let event = self.next_event().await.event;
            let done = matches(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    /// Connect `client` and complete the initial offer/answer exchange.
    pub async fn establish(&mut self, client: ClientId) -> PeerEnd {
        self.handle.connect(client);
        let mut peer = self.dialer.next_peer().await;
        let connect = peer.recv_type("connect").await;
        assert_eq!(connect["channel_id"], "load-test");
        peer.send_json(offer("conn-1"));
        assert_eq!(peer.recv_type("answer").await["sdp"], "answer-sdp-1");
        peer
    }
}
