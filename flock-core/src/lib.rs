mod backoff;
mod channels;
mod config;
mod constants;
mod endpoint;
mod error;
mod scenario;
mod stats;

pub use backoff::*;
pub use channels::*;
pub use config::*;
pub use constants::*;
pub use endpoint::*;
pub use error::*;
pub use scenario::*;
pub use stats::*;
