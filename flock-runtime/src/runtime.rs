//! Default flock runtime.
//!
//! Builds one scenario program per simulated client from a [`SimulationConfig`], runs them
//! on a single [`Timeline`] and takes care of the surroundings: periodic stats, Ctrl-C,
//! and optional keyboard control.
use crate::error::RuntimeError;
use crate::keys::spawn_key_control;
use crate::program::{client_program, hatched_program};
use crate::sink::LogSink;
use flock::media::{MediaEngine, NullMediaEngine};
use flock::stats::StatsSink;
use flock::transport::{Dial, TungsteniteDialer};
use flock::{ClientEvent, Timeline, TimelineHandle};
use flock_core::{SessionConfig, SimulationConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Builder for a simulation.
///
/// # Example
///
/// ```no_run
/// use flock_core::{SessionConfig, SimulationConfig};
/// use flock_runtime::FlockRuntime;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), flock_runtime::RuntimeError> {
///     let session = SessionConfig::new("my-channel", &["wss://sora.example.com/signaling"]);
///     let simulation = SimulationConfig::new(100)
///         .hatch_rate(10.0)
///         .duration(Duration::from_secs(60));
///
///     FlockRuntime::new(session, simulation)
///         .key_control(true)
///         .run()
///         .await
/// }
/// ```
pub struct FlockRuntime {
    session: SessionConfig,
    simulation: SimulationConfig,
    dialer: Arc<dyn Dial>,
    media: Arc<dyn MediaEngine>,
    sink: Arc<dyn StatsSink>,
    key_control: bool,
    ctrl_c: bool,
}

impl FlockRuntime {
    /// Real websockets, signaling-only media, stats to the log, Ctrl-C handling on.
    pub fn new(session: SessionConfig, simulation: SimulationConfig) -> Self {
        Self {
            session,
            simulation,
            dialer: Arc::new(TungsteniteDialer),
            media: Arc::new(NullMediaEngine),
            sink: Arc::new(LogSink),
            key_control: false,
            ctrl_c: true,
        }
    }

    pub fn media(mut self, media: Arc<dyn MediaEngine>) -> Self {
        self.media = media;
        self
    }

    pub fn dialer(mut self, dialer: Arc<dyn Dial>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn stats_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Read `p`/`r`/`q` from stdin to pause, resume and quit.
    pub fn key_control(mut self, enabled: bool) -> Self {
        self.key_control = enabled;
        self
    }

    /// Shut down gracefully on Ctrl-C.
    pub fn ctrl_c(mut self, enabled: bool) -> Self {
        self.ctrl_c = enabled;
        self
    }

    /// Validate the configuration and register every client.
    pub fn build(self) -> Result<Simulation, RuntimeError> {
        let session = self.session.validate()?;
        let simulation = self.simulation.validate()?;
        let program = client_program(&session, &simulation)?;

        let mut timeline = Timeline::new(self.dialer, self.media).stats_sink(self.sink);
        for index in 0..simulation.clients {
            let client = timeline.add_client(session.clone())?;
            timeline.play(
                client,
                hatched_program(&program, index, simulation.hatch_rate),
            );
        }
        info!(
            "Prepared {} clients for channel {} at {}/s, stats every {}",
            simulation.clients,
            session.channel_id,
            simulation.hatch_rate,
            humantime::format_duration(simulation.stats_interval)
        );

        Ok(Simulation {
            handle: timeline.handle(),
            timeline,
            first_stats_delay: simulation.first_stats_delay,
            stats_interval: simulation.stats_interval,
            key_control: self.key_control,
            ctrl_c: self.ctrl_c,
        })
    }

    pub async fn run(self) -> Result<(), RuntimeError> {
        self.build()?.run().await;
        Ok(())
    }
}

/// A fully prepared simulation, ready to run.
pub struct Simulation {
    timeline: Timeline,
    handle: TimelineHandle,
    first_stats_delay: Duration,
    stats_interval: Duration,
    key_control: bool,
    ctrl_c: bool,
}

impl Simulation {
    pub fn handle(&self) -> TimelineHandle {
        self.handle.clone()
    }

    pub fn event_tap(&mut self) -> mpsc::UnboundedReceiver<ClientEvent> {
        self.timeline.event_tap()
    }

    pub fn clients(&self) -> usize {
        self.timeline.len()
    }

    /// Run until every client exits or a shutdown completes.
    #[instrument(name = "flock", skip_all, fields(clients = self.timeline.len()))]
    pub async fn run(self) {
        if self.timeline.is_empty() {
            warn!("No clients to run");
            return;
        }

        let stats = tokio::spawn(
            stats_task(
                self.handle.clone(),
                self.first_stats_delay,
                self.stats_interval,
            )
            .in_current_span(),
        );
        let signal = self
            .ctrl_c
            .then(|| tokio::spawn(ctrl_c_task(self.handle.clone()).in_current_span()));
        if self.key_control {
            if let Err(err) = spawn_key_control(self.handle.clone()) {
                error!("Failed to start key control: {err}");
            }
        }

        self.timeline.run().await;

        stats.abort();
        if let Some(signal) = signal {
            signal.abort();
        }
        info!("Simulation finished");
    }
}

/// First batch after `first`, then one every `every`.
async fn stats_task(handle: TimelineHandle, first: Duration, every: Duration) {
    tokio::time::sleep(first).await;
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if !handle.publish_stats() {
            return;
        }
    }
}

async fn ctrl_c_task(handle: TimelineHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received, shutting down");
            handle.shutdown();
        }
        Err(err) => error!("Failed to listen for Ctrl-C: {err}"),
    }
}
