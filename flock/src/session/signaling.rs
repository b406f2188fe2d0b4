//! Inbound signaling: the server's messages over the websocket and the data channel.
use super::{Negotiation, Session, SessionState, StatsReply, Transport};
use crate::compress::CompressedLabels;
use crate::event::SessionEvent;
use crate::frame::DiagnosticFrame;
use crate::media::MediaRequest;
use crate::message::{Inbound, Notify, Offer, Outbound, Ping, Redirect, Switched};
use flock_core::{Endpoint, DIAGNOSTIC_LABEL_PREFIX, SIGNALING_LABEL, STATS_LABEL};
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Source {
    WebSocket,
    DataChannel,
}

impl Session {
    /// Parse a frame, dropping malformed ones and aborting on protocol violations.
    fn parse_inbound(&mut self, text: &str) -> Option<Inbound> {
        match Inbound::parse(text) {
            Ok(message) => Some(message),
            Err(err) if err.is_violation() => {
                self.abort(err.to_string());
                None
            }
            Err(err) => {
                warn!(client = %self.id, "Dropping signaling message: {err}");
                self.emit(SessionEvent::MalformedMessage {
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    pub(super) fn on_signaling_text(&mut self, source: Source, text: &str) {
        let Some(message) = self.parse_inbound(text) else {
            return;
        };
        debug!(client = %self.id, "Received {} over {source:?}", message.kind());

        match (source, message) {
            (Source::WebSocket, Inbound::Offer(offer)) => self.on_offer(offer),
            (_, Inbound::Update(update)) => self.on_renegotiation(Negotiation::Update, update.sdp),
            (_, Inbound::ReOffer(offer)) => self.on_renegotiation(Negotiation::ReOffer, offer.sdp),
            (Source::WebSocket, Inbound::Ping(ping)) => self.on_ping(ping),
            (_, Inbound::Notify(notify)) => self.on_notify(notify),
            (Source::WebSocket, Inbound::Redirect(redirect)) => self.on_redirect(redirect),
            (Source::WebSocket, Inbound::Switched(switched)) => self.on_switched(switched),
            (_, Inbound::Unknown) => debug!(client = %self.id, "Ignoring unknown message type"),
            (source, message) => {
                debug!(client = %self.id, "Ignoring {} over {source:?}", message.kind())
            }
        }
    }

    fn on_offer(&mut self, offer: Offer) {
        if let Some(old) = self.media.take() {
            warn!(client = %self.id, "Replacing media session on repeated offer");
            old.session.close();
            self.open_labels.clear();
        }

        info!(client = %self.id, connection_id = %offer.connection_id, "Received offer");
        self.connection_id = Some(offer.connection_id);
        self.session_id = offer.session_id;
        self.compressed = CompressedLabels::new(
            offer
                .data_channels
                .iter()
                .filter(|c| c.compress)
                .map(|c| c.label.clone()),
        );
        self.encodings = match (self.config.simulcast, offer.encodings) {
            (true, Some(encodings)) => Some((offer.mid.and_then(|m| m.video), encodings)),
            _ => None,
        };

        let token = self.token();
        let observer = Arc::new(super::SessionObserver {
            client: self.id,
            media: token,
            events: self.services.events.clone(),
        });
        let request = MediaRequest {
            role: self.config.role,
            server_config: offer.config,
            simulcast: self.config.simulcast,
        };

        match self.services.media.create_session(request, observer) {
            Ok(session) => {
                self.media = Some(super::MediaHandle { token, session });
                self.apply_remote(Negotiation::Offer, offer.sdp);
            }
            Err(err) => {
                error!(client = %self.id, "Failed to create media session: {err}");
                self.emit(SessionEvent::MediaFailed {
                    reason: err.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    fn on_renegotiation(&mut self, kind: Negotiation, sdp: String) {
        if self.media.is_none() {
            warn!(client = %self.id, "Ignoring {kind:?} without a media session");
            return;
        }
        self.apply_remote(kind, sdp);
    }

    fn on_ping(&mut self, ping: Ping) {
        if ping.stats && self.request_stats(StatsReply::Pong) {
            return;
        }
        if self.send_ws(&Outbound::Pong { stats: None }) {
            self.emit(SessionEvent::PongSent { with_stats: false });
        }
    }

    fn on_notify(&mut self, notify: Notify) {
        match notify.event_type.as_str() {
            "connection.created" | "connection.destroyed" => info!(
                client = %self.id,
                "{}: client_id={} connection_id={}",
                notify.event_type,
                notify.field("client_id"),
                notify.field("connection_id"),
            ),
            "network.status" => info!(
                client = %self.id,
                "network.status: unstable_level={}",
                notify.field("unstable_level"),
            ),
            "spotlight.changed" => info!(
                client = %self.id,
                "spotlight.changed: spotlight_id={}",
                notify.field("spotlight_id"),
            ),
            other => debug!(client = %self.id, "notify: {other}"),
        }
        self.emit(SessionEvent::Notify {
            event_type: notify.event_type,
        });
    }

    fn on_redirect(&mut self, redirect: Redirect) {
        info!(client = %self.id, "Redirected to {}", redirect.location);
        // The server closes this socket next; stop reading it now.
        if let Some(ws) = self.ws.take() {
            ws.close();
        }
        self.emit(SessionEvent::Redirected {
            location: redirect.location.clone(),
        });

        match Endpoint::parse(&redirect.location) {
            Ok(endpoint) => self.start_connect(vec![endpoint], true),
            Err(err) => {
                warn!(client = %self.id, "Invalid redirect location: {err}");
                self.emit(SessionEvent::ConnectFailed {
                    reason: err.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    fn on_switched(&mut self, switched: Switched) {
        info!(client = %self.id, "Switched to data channel signaling");
        self.using_data_channel = true;
        self.set_state(SessionState::Connected(Transport::DataChannel));
        self.emit(SessionEvent::Switched);

        let ignore_ws = switched.ignore_disconnect_websocket
            || self.config.ignore_disconnect_websocket == Some(true);
        if ignore_ws {
            if let Some(ws) = self.ws.take() {
                debug!(client = %self.id, "Closing websocket after switch");
                ws.close();
            }
        }
    }

    pub(super) fn on_data_channel_message(&mut self, label: String, data: Vec<u8>) {
        let data = match self.compressed.decode(&label, data) {
            Ok(data) => data,
            Err(err) => {
                warn!(client = %self.id, "Dropping message on {label}: {err}");
                return;
            }
        };

        if label.starts_with(DIAGNOSTIC_LABEL_PREFIX) {
            match DiagnosticFrame::parse(&data) {
                Ok(frame) => debug!(
                    client = %self.id,
                    "Received frame {} on {label} from {} sent at {}us ({} bytes)",
                    frame.counter,
                    frame.connection_id,
                    frame.timestamp_us,
                    data.len(),
                ),
                Err(err) => debug!(client = %self.id, "Ignoring message on {label}: {err}"),
            }
            return;
        }

        if !self.using_data_channel {
            trace!(client = %self.id, "Ignoring {label} message before switching");
            return;
        }

        let text = match String::from_utf8(data) {
            Ok(text) => text,
            Err(err) => {
                warn!(client = %self.id, "Dropping non-UTF-8 message on {label}");
                self.emit(SessionEvent::MalformedMessage {
                    reason: err.to_string(),
                });
                return;
            }
        };

        match label.as_str() {
            SIGNALING_LABEL => self.on_signaling_text(Source::DataChannel, &text),
            STATS_LABEL => match self.parse_inbound(&text) {
                Some(Inbound::ReqStats) => {
                    self.request_stats(StatsReply::DataChannel);
                }
                Some(other) => debug!(client = %self.id, "Ignoring {} on stats", other.kind()),
                None => {}
            },
            _ => trace!(client = %self.id, "Ignoring message on {label}"),
        }
    }
}
