use std::time::Duration;

/// Base step of the reconnect backoff, in seconds.
pub const BACKOFF_STEP_SECS: u64 = 5;

/// How long a data-channel close waits for the server before the WebSocket is torn down.
pub const DEFAULT_DISCONNECT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_DATA_CHANNEL_INTERVAL_MS: u64 = 500;

/// Smallest application message. Matches the diagnostic frame header length.
pub const MESSAGE_SIZE_MIN: usize = 48;
pub const MESSAGE_SIZE_MAX: usize = 256_000;

/// Size of the shared pseudo-random payload pool.
pub const PAYLOAD_POOL_SIZE: usize = 1024 * 1024;

/// Upper bound on a decompressed data-channel payload.
pub const MAX_DECOMPRESSED_SIZE: usize = 4 * 1024 * 1024;

/// The first stats snapshot is taken this long after start.
pub const FIRST_STATS_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Idle sleep used by the default program when no duration is configured.
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 10_000;

pub const DEFAULT_HATCH_RATE: f64 = 1.0;

/// Label used for signaling once the data channel becomes authoritative.
pub const SIGNALING_LABEL: &str = "signaling";
/// Label used for stats replies over the data channel.
pub const STATS_LABEL: &str = "stats";
/// Labels starting with this prefix carry the diagnostic frame.
pub const DIAGNOSTIC_LABEL_PREFIX: char = '#';
