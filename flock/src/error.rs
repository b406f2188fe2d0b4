use flock_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Error in Tungstenite: {0}")]
    Tungstenite(#[from] tungstenite::Error),

    #[error("Transport closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("No signaling URL candidates")]
    NoCandidates,

    #[error("All {0} signaling URL candidates failed")]
    AllFailed(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Media engine error: {0}")]
    Engine(String),

    #[error("Data channel {0} is not open")]
    ChannelClosed(String),

    #[error("Media session is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed signaling message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Signaling message has no type")]
    MissingType,

    #[error("Invalid {kind} message: {source}")]
    Violation {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode signaling message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Whether the message is broken badly enough to abort the session.
    pub fn is_violation(&self) -> bool {
        matches!(self, ProtocolError::Violation { .. })
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("zlib error: {0}")]
    Zlib(#[from] std::io::Error),

    #[error("Decompressed payload exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Diagnostic frame is {0} bytes, at least 48 are required")]
    Short(usize),

    #[error("Diagnostic frame does not start with the expected magic")]
    Magic,
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Timeline is not running")]
    Stopped,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
