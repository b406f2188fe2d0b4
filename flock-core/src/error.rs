use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid signaling URL {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Signaling URL must use ws:// or wss://, found {0}")]
    Scheme(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No signaling URLs configured")]
    NoSignalingUrls,

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("Channel id must not be empty")]
    EmptyChannelId,

    #[error("Data channel {label}: {reason}")]
    DataChannel { label: String, reason: String },

    #[error("Hatch rate must be a positive number, found {0}")]
    HatchRate(String),

    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("Scenario has no operations")]
    Empty,

    #[error("Loop index {index} is out of bounds for {len} operations")]
    LoopIndex { index: usize, len: usize },

    #[error("Sleep range is inverted: {min_ms}ms > {max_ms}ms")]
    SleepRange { min_ms: u64, max_ms: u64 },

    #[error("Message size range for {label} is inverted: {min} > {max}")]
    SizeRange {
        label: String,
        min: usize,
        max: usize,
    },
}
