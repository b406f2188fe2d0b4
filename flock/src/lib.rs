#![doc = include_str!("../README.md")]

pub mod compress;
pub mod connector;
pub mod error;
pub mod event;
pub mod frame;
pub mod media;
pub mod message;
pub mod payload;
pub mod stats;
pub mod timeline;
pub mod transport;

pub(crate) mod metrics;
pub(crate) mod registry;
pub(crate) mod scheduler;
pub(crate) mod session;
pub(crate) mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use event::{ClientEvent, SessionEvent};
pub use media::{MediaEngine, MediaObserver, MediaSession, NullMediaEngine};
pub use registry::ClientId;
pub use session::{SessionState, Transport};
pub use stats::StatsSink;
pub use timeline::{Timeline, TimelineHandle};
pub use transport::{Dial, TungsteniteDialer, WsLink};

pub mod prelude {
    pub use crate::media::{IceConnectionState, MediaEngine, NullMediaEngine};
    pub use crate::stats::StatsSink;
    pub use crate::timeline::{Timeline, TimelineHandle};
    pub use crate::{ClientEvent, ClientId, SessionEvent, SessionState};

    pub use flock_core::{
        DataChannelSpec, Direction, Role, ScenarioProgram, SessionConfig, SimulationConfig,
        StatsBatch,
    };
}
