//! The single task that owns every session and scenario cursor.
//!
//! Everything that changes client state goes through one queue: commands from a
//! [`TimelineHandle`], results of network and media work, timers, and scenario steps.
//! The timeline drains it in order, so two events for the same client never race.
use crate::error::TimelineError;
use crate::event::ClientEvent;
use crate::media::MediaEngine;
use crate::registry::{ClientId, Registry};
use crate::scheduler::{Scheduler, TrackId};
use crate::session::{Services, Session, SessionInput};
use crate::stats::StatsSink;
use crate::task::AbortOnDrop;
use crate::transport::{Dial, TungsteniteDialer};
use flock_core::{ClientStats, ConfigError, ScenarioProgram, SessionConfig, StatsBatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;

pub(crate) enum Event {
    Command(Command),
    Session(ClientId, SessionInput),
    Step {
        client: ClientId,
        track: TrackId,
        token: u64,
    },
    SleepDone {
        client: ClientId,
        track: TrackId,
        token: u64,
    },
    ShutdownDeadline,
}

pub(crate) enum Command {
    AddClient {
        config: Box<SessionConfig>,
        reply: oneshot::Sender<Result<ClientId, ConfigError>>,
    },
    RemoveClient(ClientId),
    Play(ClientId, ScenarioProgram),
    Connect(ClientId),
    Disconnect(ClientId),
    PauseAll,
    ResumeAll,
    Snapshot(oneshot::Sender<Vec<ClientStats>>),
    PublishStats,
    Shutdown,
}

/// Cloneable way to drive a running [`Timeline`] from other tasks.
#[derive(Clone)]
pub struct TimelineHandle {
    events: EventSender,
}

impl TimelineHandle {
    fn send(&self, command: Command) -> bool {
        self.events.send(Event::Command(command)).is_ok()
    }

    pub async fn add_client(&self, config: SessionConfig) -> Result<ClientId, TimelineError> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::AddClient {
            config: Box::new(config),
            reply,
        }) {
            return Err(TimelineError::Stopped);
        }
        Ok(rx.await.map_err(|_| TimelineError::Stopped)??)
    }

    pub fn remove_client(&self, client: ClientId) -> bool {
        self.send(Command::RemoveClient(client))
    }

    pub fn play(&self, client: ClientId, program: ScenarioProgram) -> bool {
        self.send(Command::Play(client, program))
    }

    pub fn connect(&self, client: ClientId) -> bool {
        self.send(Command::Connect(client))
    }

    pub fn disconnect(&self, client: ClientId) -> bool {
        self.send(Command::Disconnect(client))
    }

    pub fn pause_all(&self) -> bool {
        self.send(Command::PauseAll)
    }

    pub fn resume_all(&self) -> bool {
        self.send(Command::ResumeAll)
    }

    /// Ask the stats sink to record a batch now.
    pub fn publish_stats(&self) -> bool {
        self.send(Command::PublishStats)
    }

    /// Close every session and stop once they are idle or the close deadline passes.
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    /// Current stats of every client, or `None` once the timeline has stopped.
    pub async fn snapshot(&self) -> Option<Vec<ClientStats>> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Snapshot(reply)) {
            return None;
        }
        rx.await.ok()
    }
}

pub struct Timeline {
    registry: Registry,
    scheduler: Scheduler,
    services: Services,
    events: EventSender,
    inbox: mpsc::UnboundedReceiver<Event>,
    sink: Option<Arc<dyn StatsSink>>,
    shutting_down: bool,
    deadline: Option<AbortOnDrop>,
    deadline_passed: bool,
}

impl Timeline {
    pub fn new(dialer: Arc<dyn Dial>, media: Arc<dyn MediaEngine>) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        Self {
            registry: Registry::default(),
            scheduler: Scheduler::new(events.clone()),
            services: Services {
                dialer,
                media,
                events: events.clone(),
                tap: None,
            },
            events,
            inbox,
            sink: None,
            shutting_down: false,
            deadline: None,
            deadline_passed: false,
        }
    }

    /// A timeline that dials real websockets.
    pub fn with_media(media: Arc<dyn MediaEngine>) -> Self {
        Self::new(Arc::new(TungsteniteDialer), media)
    }

    pub fn handle(&self) -> TimelineHandle {
        TimelineHandle {
            events: self.events.clone(),
        }
    }

    /// Subscribe to every [`ClientEvent`]. Replaces any earlier subscription.
    pub fn event_tap(&mut self) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for session in self.registry.iter_mut() {
            session.set_tap(tx.clone());
        }
        self.services.tap = Some(tx);
        rx
    }

    pub fn stats_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn add_client(&mut self, config: SessionConfig) -> Result<ClientId, ConfigError> {
        let config = config.validate()?;
        let endpoints = config.endpoints()?;
        let config = Arc::new(config);
        let services = self.services.clone();
        let id = self
            .registry
            .insert(|id| Session::new(id, config, endpoints, services));
        debug!(client = %id, "Added client");
        Ok(id)
    }

    /// Start `program` for `client`. Returns false when the client does not exist.
    pub fn play(&mut self, client: ClientId, program: ScenarioProgram) -> bool {
        if self.shutting_down || self.registry.get(client).is_none() {
            return false;
        }
        self.scheduler.play(client, program);
        true
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Drive every client until the scenarios exit or a shutdown completes.
    #[instrument(name = "timeline", skip_all)]
    pub async fn run(mut self) {
        info!("Running {} clients", self.registry.len());
        while let Some(event) = self.inbox.recv().await {
            self.dispatch(event);
            if self.finished() {
                break;
            }
        }

        let open = self.registry.iter().filter(|s| !s.is_idle()).count();
        if open > 0 {
            warn!("{open} sessions still open, dropping them");
        }
        for session in self.registry.iter_mut() {
            session.terminate();
        }
        info!("Timeline finished");
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.on_command(command),
            Event::Session(client, input) => match self.registry.get_mut(client) {
                Some(session) => session.handle(input),
                None => input.discard(),
            },
            Event::Step {
                client,
                track,
                token,
            } => {
                if !self.shutting_down {
                    self.scheduler
                        .step(client, &track, token, &mut self.registry);
                }
            }
            Event::SleepDone {
                client,
                track,
                token,
            } => {
                if !self.shutting_down {
                    self.scheduler.sleep_done(client, &track, token);
                }
            }
            Event::ShutdownDeadline => {
                warn!("Shutdown deadline passed");
                self.deadline_passed = true;
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::AddClient { config, reply } => {
                let _ = reply.send(self.add_client(*config));
            }
            Command::RemoveClient(client) => {
                self.scheduler.remove(client);
                if let Some(mut session) = self.registry.remove(client) {
                    session.terminate();
                    debug!(%client, "Removed client");
                }
            }
            Command::Play(client, program) => {
                if !self.play(client, program) {
                    debug!(%client, "Not playing scenario");
                }
            }
            Command::Connect(client) => {
                if let Some(session) = self.registry.get_mut(client) {
                    session.connect();
                }
            }
            Command::Disconnect(client) => {
                if let Some(session) = self.registry.get_mut(client) {
                    session.close();
                }
            }
            Command::PauseAll => self.scheduler.pause_all(),
            Command::ResumeAll => self.scheduler.resume_all(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::PublishStats => {
                if let Some(sink) = &self.sink {
                    sink.record(StatsBatch::new(self.snapshot()));
                }
            }
            Command::Shutdown => self.begin_shutdown(),
        }
    }

    fn snapshot(&self) -> Vec<ClientStats> {
        self.registry.iter().map(Session::stats).collect()
    }

    fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.scheduler.stop_all();

        let wait = self
            .registry
            .iter()
            .map(Session::disconnect_wait_timeout)
            .max()
            .unwrap_or_default()
            + Duration::from_secs(1);
        info!(
            "Shutting down {} clients, waiting up to {}",
            self.registry.len(),
            humantime::format_duration(wait)
        );
        for session in self.registry.iter_mut() {
            session.shutdown();
        }

        let events = self.events.clone();
        self.deadline = Some(AbortOnDrop::new(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = events.send(Event::ShutdownDeadline);
        })));
    }

    fn finished(&self) -> bool {
        let all_idle = self.registry.iter().all(Session::is_idle);
        if self.shutting_down {
            self.deadline_passed || all_idle
        } else {
            self.scheduler.all_exited() && all_idle
        }
    }
}
