//! Signaling session state machine.
//!
//! A [`Session`] is owned by the timeline and only ever touched there. Work that has to
//! wait on the network or the media stack runs in spawned tasks that report back as a
//! [`SessionInput`] tagged with the token of the resource it belongs to. Inputs whose
//! token no longer matches are stale and get dropped, which is how a late handshake,
//! timer or media callback is kept from acting on a session that has moved on.
use crate::compress::CompressedLabels;
use crate::connector::Connector;
use crate::error::{ConnectError, MediaError};
use crate::event::{ClientEvent, SessionEvent};
use crate::media::{IceConnectionState, MediaEngine, MediaObserver, MediaSession};
use crate::message::{Connect, Outbound};
use crate::registry::ClientId;
use crate::task::AbortOnDrop;
use crate::timeline::{Event, EventSender};
use crate::transport::{Dial, WsEvent, WsHandle, WsLink};
use flock_core::{reconnect_delay, ClientStats, Endpoint, SessionConfig, SIGNALING_LABEL, STATS_LABEL};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

mod signaling;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    WebSocket,
    DataChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected(Transport),
    SwitchingToDataChannel,
    Closing,
    ReconnectPending,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected(Transport::WebSocket) => "connected(websocket)",
            SessionState::Connected(Transport::DataChannel) => "connected(datachannel)",
            SessionState::SwitchingToDataChannel => "switching",
            SessionState::Closing => "closing",
            SessionState::ReconnectPending => "reconnect-pending",
        };
        f.write_str(s)
    }
}

pub(crate) enum SessionInput {
    Connected {
        attempt: u64,
        redirect: bool,
        result: Result<(Endpoint, WsLink), ConnectError>,
    },
    Ws {
        link: u64,
        event: WsEvent,
    },
    Media {
        media: u64,
        event: MediaEvent,
    },
    RetryDue {
        token: u64,
    },
    CloseTimeout {
        token: u64,
    },
}

impl SessionInput {
    /// Release anything the input carries when its session is gone.
    pub fn discard(self) {
        if let SessionInput::Connected {
            result: Ok((endpoint, link)),
            ..
        } = self
        {
            debug!("Closing connection to {endpoint} for a removed client");
            tokio::spawn(link.close());
        }
    }
}

pub(crate) enum MediaEvent {
    Ice(IceConnectionState),
    Candidate(String),
    DataChannelState {
        label: String,
        open: bool,
    },
    DataChannelMessage {
        label: String,
        data: Vec<u8>,
    },
    RemoteApplied {
        kind: Negotiation,
        result: Result<(), MediaError>,
    },
    AnswerCreated {
        kind: Negotiation,
        result: Result<String, MediaError>,
    },
    Stats {
        reply: StatsReply,
        result: Result<Value, MediaError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Negotiation {
    Offer,
    Update,
    ReOffer,
}

impl Negotiation {
    fn answer_type(&self) -> &'static str {
        match self {
            Negotiation::Offer => "answer",
            Negotiation::Update => "update",
            Negotiation::ReOffer => "re-answer",
        }
    }
}

/// Where collected stats should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatsReply {
    Pong,
    DataChannel,
}

#[derive(Clone)]
pub(crate) struct Services {
    pub dialer: Arc<dyn Dial>,
    pub media: Arc<dyn MediaEngine>,
    pub events: EventSender,
    pub tap: Option<mpsc::UnboundedSender<ClientEvent>>,
}

struct Scheduled {
    token: u64,
    _task: AbortOnDrop,
}

struct MediaHandle {
    token: u64,
    session: Arc<dyn MediaSession>,
}

/// Marshals media notifications onto the timeline for one media session.
struct SessionObserver {
    client: ClientId,
    media: u64,
    events: EventSender,
}

impl SessionObserver {
    fn post(&self, event: MediaEvent) {
        let input = SessionInput::Media {
            media: self.media,
            event,
        };
        let _ = self.events.send(Event::Session(self.client, input));
    }
}

impl MediaObserver for SessionObserver {
    fn on_ice_connection_state(&self, state: IceConnectionState) {
        self.post(MediaEvent::Ice(state));
    }

    fn on_ice_candidate(&self, candidate: String) {
        self.post(MediaEvent::Candidate(candidate));
    }

    fn on_data_channel_state(&self, label: &str, open: bool) {
        self.post(MediaEvent::DataChannelState {
            label: label.to_string(),
            open,
        });
    }

    fn on_data_channel_message(&self, label: &str, data: Vec<u8>) {
        self.post(MediaEvent::DataChannelMessage {
            label: label.to_string(),
            data,
        });
    }
}

pub(crate) struct Session {
    id: ClientId,
    config: Arc<SessionConfig>,
    endpoints: Vec<Endpoint>,
    services: Services,
    state: SessionState,
    retry: u32,
    next_token: u64,
    attempt: Option<Scheduled>,
    retry_timer: Option<Scheduled>,
    close_timer: Option<Scheduled>,
    ws: Option<WsHandle>,
    media: Option<MediaHandle>,
    using_data_channel: bool,
    open_labels: HashSet<String>,
    compressed: CompressedLabels,
    connection_id: Option<String>,
    session_id: Option<String>,
    connected_url: Option<String>,
    encodings: Option<(Option<String>, Vec<Value>)>,
    reconnect_after_close: bool,
    halted: bool,
}

impl Session {
    pub fn new(
        id: ClientId,
        config: Arc<SessionConfig>,
        endpoints: Vec<Endpoint>,
        services: Services,
    ) -> Self {
        Self {
            id,
            config,
            endpoints,
            services,
            state: SessionState::Idle,
            retry: 0,
            next_token: 0,
            attempt: None,
            retry_timer: None,
            close_timer: None,
            ws: None,
            media: None,
            using_data_channel: false,
            open_labels: HashSet::new(),
            compressed: CompressedLabels::default(),
            connection_id: None,
            session_id: None,
            connected_url: None,
            encodings: None,
            reconnect_after_close: false,
            halted: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn disconnect_wait_timeout(&self) -> Duration {
        self.config.disconnect_wait_timeout
    }

    pub fn set_tap(&mut self, tap: mpsc::UnboundedSender<ClientEvent>) {
        self.services.tap = Some(tap);
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            client: self.id.index(),
            channel_id: self.config.channel_id.clone(),
            connection_id: self.connection_id.clone(),
            session_id: self.session_id.clone(),
            role: self.config.role.as_str().to_string(),
            state: self.state.to_string(),
            connected_url: self.connected_url.clone(),
            websocket_connected: self.ws.is_some(),
            datachannel_connected: self.using_data_channel && self.is_open(SIGNALING_LABEL),
            retry: self.retry,
        }
    }

    /// Open the session, or restart it if it is already up.
    pub fn connect(&mut self) {
        if self.halted {
            return;
        }
        match self.state {
            SessionState::Idle | SessionState::ReconnectPending => {
                self.retry_timer = None;
                self.start_connect(self.endpoints.clone(), false);
            }
            SessionState::Closing => self.reconnect_after_close = true,
            SessionState::Connecting
            | SessionState::Connected(_)
            | SessionState::SwitchingToDataChannel => {
                self.reconnect_after_close = true;
                self.close();
            }
        }
    }

    /// Close gracefully. The session ends up Idle, possibly after waiting for the
    /// server to acknowledge a data-channel disconnect.
    pub fn close(&mut self) {
        match self.state {
            SessionState::Idle => {}
            SessionState::Closing => self.reconnect_after_close = false,
            SessionState::ReconnectPending => {
                self.retry_timer = None;
                self.set_state(SessionState::Idle);
                self.emit(SessionEvent::Closed);
            }
            SessionState::Connecting => self.finish_close(),
            SessionState::Connected(_) | SessionState::SwitchingToDataChannel => {
                if self.using_data_channel && self.media.is_some() && self.is_open(SIGNALING_LABEL)
                {
                    self.send_dc(SIGNALING_LABEL, &Outbound::Disconnect);
                    let token = self.token();
                    let wait = self.config.disconnect_wait_timeout;
                    self.close_timer = Some(Scheduled {
                        token,
                        _task: self.post_after(wait, SessionInput::CloseTimeout { token }),
                    });
                    self.set_state(SessionState::Closing);
                } else {
                    self.send_ws(&Outbound::Disconnect);
                    self.finish_close();
                }
            }
        }
    }

    /// Close for good: no reconnect will be scheduled afterwards.
    pub fn shutdown(&mut self) {
        self.halted = true;
        self.reconnect_after_close = false;
        self.close();
    }

    /// Drop the session on the spot, without a disconnect handshake.
    pub fn terminate(&mut self) {
        self.halted = true;
        self.reconnect_after_close = false;
        if self.state != SessionState::Idle {
            self.teardown();
            self.set_state(SessionState::Idle);
            self.emit(SessionEvent::Closed);
        }
    }

    pub fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Connected {
                attempt,
                redirect,
                result,
            } => self.on_connected(attempt, redirect, result),
            SessionInput::Ws { link, event } => {
                if self.ws.as_ref().map(|ws| ws.token) != Some(link) {
                    trace!(client = %self.id, "Dropping event from stale websocket");
                    return;
                }
                match event {
                    WsEvent::Text(text) => {
                        self.on_signaling_text(signaling::Source::WebSocket, &text)
                    }
                    WsEvent::Closed(err) => {
                        let reason = err
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "closed by peer".to_string());
                        self.on_ws_closed(reason);
                    }
                }
            }
            SessionInput::Media { media, event } => {
                if self.media.as_ref().map(|m| m.token) != Some(media) {
                    trace!(client = %self.id, "Dropping event from stale media session");
                    return;
                }
                self.on_media_event(event);
            }
            SessionInput::RetryDue { token } => {
                if self.retry_timer.as_ref().is_some_and(|t| t.token == token) {
                    self.retry_timer = None;
                    self.start_connect(self.endpoints.clone(), false);
                }
            }
            SessionInput::CloseTimeout { token } => {
                if self.state == SessionState::Closing
                    && self.close_timer.as_ref().is_some_and(|t| t.token == token)
                {
                    debug!(client = %self.id, "Timed out waiting for the data channel to close");
                    self.finish_close();
                }
            }
        }
    }

    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn emit(&self, event: SessionEvent) {
        crate::metrics::record(&event);
        if let Some(tap) = &self.services.tap {
            let _ = tap.send(ClientEvent {
                client: self.id,
                event,
            });
        }
    }

    fn set_state(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to);
        debug!(client = %self.id, "{from} -> {to}");
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn post_after(&self, delay: Duration, input: SessionInput) -> AbortOnDrop {
        let events = self.services.events.clone();
        let id = self.id;
        AbortOnDrop::new(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::Session(id, input));
        }))
    }

    /// Run a media operation off the timeline and post its outcome back.
    fn post_media<F>(&self, token: u64, fut: F)
    where
        F: Future<Output = MediaEvent> + Send + 'static,
    {
        let events = self.services.events.clone();
        let id = self.id;
        tokio::spawn(
            async move {
                let event = fut.await;
                let _ = events.send(Event::Session(
                    id,
                    SessionInput::Media {
                        media: token,
                        event,
                    },
                ));
            }
            .in_current_span(),
        );
    }

    fn start_connect(&mut self, candidates: Vec<Endpoint>, redirect: bool) {
        let attempt = self.token();
        let mut connector = Connector::new(self.services.dialer.clone());
        if redirect || self.config.disable_signaling_url_randomization {
            connector = connector.fixed_order();
        }

        self.emit(SessionEvent::Connecting {
            candidates: candidates.len(),
            redirect,
        });
        self.set_state(SessionState::Connecting);

        let events = self.services.events.clone();
        let id = self.id;
        let task = tokio::spawn(
            async move {
                let result = connector.race(candidates).await;
                let input = SessionInput::Connected {
                    attempt,
                    redirect,
                    result,
                };
                if let Err(unsent) = events.send(Event::Session(id, input)) {
                    if let Event::Session(_, input) = unsent.0 {
                        input.discard();
                    }
                }
            }
            .in_current_span(),
        );
        self.attempt = Some(Scheduled {
            token: attempt,
            _task: AbortOnDrop::new(task),
        });
    }

    fn on_connected(
        &mut self,
        attempt: u64,
        redirect: bool,
        result: Result<(Endpoint, WsLink), ConnectError>,
    ) {
        let current = self.state == SessionState::Connecting
            && self.attempt.as_ref().is_some_and(|a| a.token == attempt);
        if !current {
            if let Ok((endpoint, link)) = result {
                debug!(client = %self.id, "Closing late connection to {endpoint}");
                tokio::spawn(link.close());
            }
            return;
        }
        self.attempt = None;

        match result {
            Ok((endpoint, link)) => {
                let token = self.token();
                self.ws = Some(WsHandle::spawn(
                    self.id,
                    token,
                    link,
                    self.services.events.clone(),
                ));
                info!(client = %self.id, "Connected to {endpoint}");
                self.connected_url = Some(endpoint.to_string());
                self.set_state(SessionState::Connected(Transport::WebSocket));
                self.emit(SessionEvent::Connected {
                    url: endpoint.to_string(),
                    redirect,
                });
                let connect = Outbound::Connect(Box::new(Connect::new(&self.config, redirect)));
                self.send_ws(&connect);
            }
            Err(err) => {
                warn!(client = %self.id, "Connect failed: {err}");
                self.emit(SessionEvent::ConnectFailed {
                    reason: err.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        self.teardown();
        self.reconnect_after_close = false;
        if self.halted {
            self.set_state(SessionState::Idle);
            return;
        }
        if let Some(max) = self.config.max_retry {
            if self.retry >= max {
                warn!(client = %self.id, "Giving up after {} retries", self.retry);
                self.emit(SessionEvent::GaveUp { retry: self.retry });
                self.set_state(SessionState::Idle);
                return;
            }
        }

        let retry = self.retry;
        let delay = reconnect_delay(retry);
        self.retry += 1;
        info!(
            client = %self.id,
            "Reconnecting in {} (retry {retry})",
            humantime::format_duration(delay)
        );

        let token = self.token();
        self.retry_timer = Some(Scheduled {
            token,
            _task: self.post_after(delay, SessionInput::RetryDue { token }),
        });
        self.emit(SessionEvent::ReconnectScheduled { retry, delay });
        self.set_state(SessionState::ReconnectPending);
    }

    fn finish_close(&mut self) {
        self.teardown();
        self.set_state(SessionState::Idle);
        self.emit(SessionEvent::Closed);
        if std::mem::take(&mut self.reconnect_after_close) && !self.halted {
            self.start_connect(self.endpoints.clone(), false);
        }
    }

    /// Give up on the session after the server broke the protocol. No reconnect.
    fn abort(&mut self, reason: String) {
        error!(client = %self.id, "Aborting session: {reason}");
        self.emit(SessionEvent::ProtocolViolation { reason });
        self.reconnect_after_close = false;
        self.teardown();
        self.set_state(SessionState::Idle);
    }

    /// Drop every transport and timer without sending anything.
    fn teardown(&mut self) {
        self.attempt = None;
        self.retry_timer = None;
        self.close_timer = None;
        if let Some(ws) = self.ws.take() {
            ws.close();
        }
        if let Some(media) = self.media.take() {
            media.session.close();
        }
        self.using_data_channel = false;
        self.open_labels.clear();
        self.compressed.clear();
        self.encodings = None;
        self.connection_id = None;
        self.session_id = None;
        self.connected_url = None;
    }

    fn on_ws_closed(&mut self, reason: String) {
        self.ws = None;
        match self.state {
            SessionState::Closing => debug!(client = %self.id, "WebSocket closed while closing"),
            _ if self.using_data_channel => {
                info!(client = %self.id, "WebSocket closed after switching to the data channel: {reason}")
            }
            _ if self.media.is_some() => {
                warn!(client = %self.id, "WebSocket failed: {reason}");
                self.emit(SessionEvent::TransportFailed { reason });
                self.schedule_reconnect();
            }
            _ => {
                warn!(client = %self.id, "WebSocket failed without a media session: {reason}");
                self.emit(SessionEvent::TransportFailed { reason });
                self.teardown();
                self.set_state(SessionState::Idle);
            }
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Ice(state) => self.on_ice_state(state),
            MediaEvent::Candidate(candidate) => {
                self.send_signaling(&Outbound::Candidate { candidate });
            }
            MediaEvent::DataChannelState { label, open } => self.on_data_channel_state(label, open),
            MediaEvent::DataChannelMessage { label, data } => {
                self.on_data_channel_message(label, data)
            }
            MediaEvent::RemoteApplied { kind, result } => self.on_remote_applied(kind, result),
            MediaEvent::AnswerCreated { kind, result } => self.on_answer_created(kind, result),
            MediaEvent::Stats { reply, result } => self.on_stats(reply, result),
        }
    }

    fn on_ice_state(&mut self, state: IceConnectionState) {
        self.emit(SessionEvent::Ice(state));
        match state {
            IceConnectionState::Connected | IceConnectionState::Completed => {
                debug!(client = %self.id, "ICE connected");
                self.retry = 0;
            }
            IceConnectionState::Failed if self.state != SessionState::Closing => {
                warn!(client = %self.id, "ICE failed");
                self.emit(SessionEvent::MediaFailed {
                    reason: "ICE connection failed".to_string(),
                });
                self.schedule_reconnect();
            }
            other => debug!(client = %self.id, "ICE {other:?}"),
        }
    }

    fn on_data_channel_state(&mut self, label: String, open: bool) {
        debug!(client = %self.id, label = %label, open, "Data channel state");
        if open {
            let switching = label == SIGNALING_LABEL
                && self.config.data_channel_signaling == Some(true)
                && self.state == SessionState::Connected(Transport::WebSocket);
            self.open_labels.insert(label);
            if switching {
                self.set_state(SessionState::SwitchingToDataChannel);
            }
        } else {
            self.open_labels.remove(&label);
            if label == SIGNALING_LABEL && self.state == SessionState::Closing {
                self.finish_close();
            }
        }
    }

    fn apply_remote(&self, kind: Negotiation, sdp: String) {
        let Some(media) = &self.media else {
            return;
        };
        let session = media.session.clone();
        self.post_media(media.token, async move {
            let result = session.set_remote_offer(sdp).await;
            MediaEvent::RemoteApplied { kind, result }
        });
    }

    fn on_remote_applied(&mut self, kind: Negotiation, result: Result<(), MediaError>) {
        if let Err(err) = result {
            error!(client = %self.id, "Failed to apply remote {kind:?}: {err}");
            self.emit(SessionEvent::MediaFailed {
                reason: err.to_string(),
            });
            self.schedule_reconnect();
            return;
        }
        let Some(media) = &self.media else {
            return;
        };
        if let Some((mid, encodings)) = &self.encodings {
            if let Err(err) = media.session.set_encodings(mid.as_deref(), encodings) {
                warn!(client = %self.id, "Failed to apply simulcast encodings: {err}");
            }
        }
        let session = media.session.clone();
        self.post_media(media.token, async move {
            let result = session.create_answer().await;
            MediaEvent::AnswerCreated { kind, result }
        });
    }

    fn on_answer_created(&mut self, kind: Negotiation, result: Result<String, MediaError>) {
        let sdp = match result {
            Ok(sdp) => sdp,
            Err(err) => {
                error!(client = %self.id, "Failed to create {}: {err}", kind.answer_type());
                self.emit(SessionEvent::MediaFailed {
                    reason: err.to_string(),
                });
                self.schedule_reconnect();
                return;
            }
        };
        let sent = match kind {
            Negotiation::Offer => self.send_ws(&Outbound::Answer { sdp }),
            Negotiation::Update => self.send_signaling(&Outbound::Update { sdp }),
            Negotiation::ReOffer => self.send_signaling(&Outbound::ReAnswer { sdp }),
        };
        if sent {
            self.emit(SessionEvent::AnswerSent {
                kind: kind.answer_type(),
            });
        }
    }

    fn request_stats(&self, reply: StatsReply) -> bool {
        let Some(media) = &self.media else {
            return false;
        };
        let session = media.session.clone();
        self.post_media(media.token, async move {
            let result = session.stats().await;
            MediaEvent::Stats { reply, result }
        });
        true
    }

    fn on_stats(&mut self, reply: StatsReply, result: Result<Value, MediaError>) {
        match (reply, result) {
            (StatsReply::Pong, Ok(reports)) => {
                if self.using_data_channel && self.is_open(STATS_LABEL) {
                    self.send_dc(STATS_LABEL, &Outbound::Stats { reports });
                } else {
                    self.send_ws(&Outbound::Pong {
                        stats: Some(reports),
                    });
                }
                self.emit(SessionEvent::PongSent { with_stats: true });
            }
            (StatsReply::Pong, Err(err)) => {
                warn!(client = %self.id, "Failed to collect stats for pong: {err}");
                if self.send_ws(&Outbound::Pong { stats: None }) {
                    self.emit(SessionEvent::PongSent { with_stats: false });
                }
            }
            (StatsReply::DataChannel, Ok(reports)) => {
                self.send_dc(STATS_LABEL, &Outbound::Stats { reports });
            }
            (StatsReply::DataChannel, Err(err)) => {
                warn!(client = %self.id, "Failed to collect requested stats: {err}");
            }
        }
    }

    fn is_open(&self, label: &str) -> bool {
        self.open_labels.contains(label)
    }

    fn send_ws(&self, message: &Outbound) -> bool {
        let Some(ws) = &self.ws else {
            debug!(client = %self.id, "No websocket to send {message:?}");
            return false;
        };
        match message.to_text() {
            Ok(text) => ws.send(text),
            Err(err) => {
                error!(client = %self.id, "{err}");
                false
            }
        }
    }

    fn send_dc(&self, label: &str, message: &Outbound) -> bool {
        match message.to_text() {
            Ok(text) => self.send_data(label, text.into_bytes()),
            Err(err) => {
                error!(client = %self.id, "{err}");
                false
            }
        }
    }

    fn send_data(&self, label: &str, data: Vec<u8>) -> bool {
        let Some(media) = &self.media else {
            return false;
        };
        if !self.is_open(label) {
            debug!(client = %self.id, "Data channel {label} is not open");
            return false;
        }
        let data = match self.compressed.encode(label, data) {
            Ok(data) => data,
            Err(err) => {
                warn!(client = %self.id, "Failed to compress message for {label}: {err}");
                return false;
            }
        };
        match media.session.send_data(label, data) {
            Ok(()) => true,
            Err(err) => {
                warn!(client = %self.id, "Failed to send on {label}: {err}");
                false
            }
        }
    }

    /// Send over the data channel once it is authoritative, otherwise the websocket.
    fn send_signaling(&self, message: &Outbound) -> bool {
        if self.using_data_channel && self.is_open(SIGNALING_LABEL) {
            self.send_dc(SIGNALING_LABEL, message)
        } else {
            self.send_ws(message)
        }
    }

    /// Whether application data can go out on `label` right now.
    pub fn can_send(&self, label: &str) -> bool {
        matches!(
            self.state,
            SessionState::Connected(_) | SessionState::SwitchingToDataChannel
        ) && self.media.is_some()
            && self.is_open(label)
    }

    /// Send an application payload on a data-channel label.
    pub fn send_message(&mut self, label: &str, payload: Vec<u8>) -> bool {
        if !self.can_send(label) {
            return false;
        }
        let size = payload.len();
        let sent = self.send_data(label, payload);
        if sent {
            self.emit(SessionEvent::MessageSent {
                label: label.to_string(),
                size,
            });
        }
        sent
    }
}
