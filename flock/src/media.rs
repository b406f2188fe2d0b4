//! Seams to the media stack.
//!
//! The engine never calls into a session directly. It receives a [`MediaObserver`] when
//! a session is created and every notification it makes is marshalled onto the timeline.
use crate::error::MediaError;
use flock_core::Role;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// What the engine needs to build a peer connection for an offer.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub role: Role,
    /// Peer connection configuration from the offer (ICE servers and friends).
    pub server_config: Option<Value>,
    pub simulcast: bool,
}

/// Notifications from the media stack back to the owning session.
pub trait MediaObserver: Send + Sync {
    fn on_ice_connection_state(&self, state: IceConnectionState);
    fn on_ice_candidate(&self, candidate: String);
    fn on_data_channel_state(&self, label: &str, open: bool);
    fn on_data_channel_message(&self, label: &str, data: Vec<u8>);
}

pub trait MediaEngine: Send + Sync {
    fn create_session(
        &self,
        request: MediaRequest,
        observer: Arc<dyn MediaObserver>,
    ) -> Result<Arc<dyn MediaSession>, MediaError>;
}

pub trait MediaSession: Send + Sync {
    fn set_remote_offer(&self, sdp: String) -> BoxFuture<'_, Result<(), MediaError>>;
    fn create_answer(&self) -> BoxFuture<'_, Result<String, MediaError>>;
    fn stats(&self) -> BoxFuture<'_, Result<Value, MediaError>>;
    /// Apply simulcast encodings to the sender bound to `mid`.
    fn set_encodings(&self, mid: Option<&str>, encodings: &[Value]) -> Result<(), MediaError>;
    fn send_data(&self, label: &str, data: Vec<u8>) -> Result<(), MediaError>;
    fn close(&self);
}

/// Media engine for signaling-only runs.
///
/// Answers every offer with a fixed SDP, reports ICE connected once the answer exists
/// and never opens data channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMediaEngine;

impl MediaEngine for NullMediaEngine {
    fn create_session(
        &self,
        _request: MediaRequest,
        observer: Arc<dyn MediaObserver>,
    ) -> Result<Arc<dyn MediaSession>, MediaError> {
        Ok(Arc::new(NullMediaSession { observer }))
    }
}

struct NullMediaSession {
    observer: Arc<dyn MediaObserver>,
}

const NULL_ANSWER: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

impl MediaSession for NullMediaSession {
    fn set_remote_offer(&self, _sdp: String) -> BoxFuture<'_, Result<(), MediaError>> {
        Box::pin(async { Ok(()) })
    }

    fn create_answer(&self) -> BoxFuture<'_, Result<String, MediaError>> {
        Box::pin(async move {
            self.observer
                .on_ice_connection_state(IceConnectionState::Connected);
            Ok(NULL_ANSWER.to_string())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<Value, MediaError>> {
        Box::pin(async { Ok(json!([])) })
    }

    fn set_encodings(&self, _mid: Option<&str>, _encodings: &[Value]) -> Result<(), MediaError> {
        Ok(())
    }

    fn send_data(&self, label: &str, _data: Vec<u8>) -> Result<(), MediaError> {
        Err(MediaError::ChannelClosed(label.to_string()))
    }

    fn close(&self) {}
}
