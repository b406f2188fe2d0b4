//! Runs whole flock simulations: one scenario program per simulated client, periodic
//! stats, keyboard control and graceful shutdown on Ctrl-C.
pub mod program;
pub mod runtime;
pub mod sink;

mod error;
mod keys;

pub use crate::error::RuntimeError;
pub use crate::runtime::{FlockRuntime, Simulation};
pub use crate::sink::{ChannelSink, LogSink};
