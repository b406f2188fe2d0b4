use crate::media::IceConnectionState;
use crate::registry::ClientId;
use crate::session::SessionState;
use std::time::Duration;

/// Something that happened to one session.
///
/// Every failure that moves a session's state machine shows up here, so a consumer of
/// the event tap can reconstruct why a client is where it is.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    Connecting {
        candidates: usize,
        redirect: bool,
    },
    Connected {
        url: String,
        redirect: bool,
    },
    ConnectFailed {
        reason: String,
    },
    ReconnectScheduled {
        retry: u32,
        delay: Duration,
    },
    GaveUp {
        retry: u32,
    },
    Redirected {
        location: String,
    },
    AnswerSent {
        kind: &'static str,
    },
    PongSent {
        with_stats: bool,
    },
    Switched,
    Notify {
        event_type: String,
    },
    Ice(IceConnectionState),
    MessageSent {
        label: String,
        size: usize,
    },
    TransportFailed {
        reason: String,
    },
    MediaFailed {
        reason: String,
    },
    MalformedMessage {
        reason: String,
    },
    ProtocolViolation {
        reason: String,
    },
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    pub client: ClientId,
    pub event: SessionEvent,
}
