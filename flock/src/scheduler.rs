//! Runs scenario programs against sessions.
//!
//! Each client has a main cursor plus one cursor per named sub-scenario. A cursor only
//! moves when the timeline delivers a step or a finished sleep carrying the cursor's
//! current token; pausing, replaying or exiting changes the token, so anything already
//! in flight for the old position is ignored.
use crate::frame::DiagnosticFrame;
use crate::payload::PayloadPool;
use crate::registry::{ClientId, Registry};
use crate::task::AbortOnDrop;
use crate::timeline::{Event, EventSender};
use flock_core::{Operation, ScenarioProgram, DIAGNOSTIC_LABEL_PREFIX, PAYLOAD_POOL_SIZE};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TrackId {
    Main,
    Sub(String),
}

struct Cursor {
    program: Arc<ScenarioProgram>,
    index: usize,
    token: u64,
    paused: bool,
    sleep: Option<AbortOnDrop>,
}

#[derive(Default)]
struct Tracks {
    main: Option<Cursor>,
    subs: HashMap<String, Cursor>,
    /// Diagnostic frame counters per label.
    counters: HashMap<String, u64>,
    exited: bool,
}

impl Tracks {
    fn cursor(&self, track: &TrackId) -> Option<&Cursor> {
        match track {
            TrackId::Main => self.main.as_ref(),
            TrackId::Sub(name) => self.subs.get(name),
        }
    }

    fn cursor_mut(&mut self, track: &TrackId) -> Option<&mut Cursor> {
        match track {
            TrackId::Main => self.main.as_mut(),
            TrackId::Sub(name) => self.subs.get_mut(name),
        }
    }

    fn cursors_mut(&mut self) -> impl Iterator<Item = (TrackId, &mut Cursor)> + '_ {
        let main = self.main.as_mut().map(|c| (TrackId::Main, c));
        let subs = self
            .subs
            .iter_mut()
            .map(|(name, c)| (TrackId::Sub(name.clone()), c));
        main.into_iter().chain(subs)
    }

    fn clear(&mut self) {
        self.main = None;
        self.subs.clear();
    }
}

pub(crate) struct Scheduler {
    clients: HashMap<ClientId, Tracks>,
    paused: bool,
    next_token: u64,
    rng: SmallRng,
    pool: PayloadPool,
    events: EventSender,
}

impl Scheduler {
    pub fn new(events: EventSender) -> Self {
        let mut rng = SmallRng::from_entropy();
        let pool = PayloadPool::new(PAYLOAD_POOL_SIZE, &mut rng);
        Self {
            clients: HashMap::new(),
            paused: false,
            next_token: 0,
            rng,
            pool,
            events,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Start `program` on the client's main cursor, replacing whatever ran there.
    pub fn play(&mut self, client: ClientId, program: ScenarioProgram) {
        self.clients.entry(client).or_default().exited = false;
        self.play_track(client, TrackId::Main, Arc::new(program));
    }

    fn play_track(&mut self, client: ClientId, track: TrackId, program: Arc<ScenarioProgram>) {
        self.next_token += 1;
        let token = self.next_token;
        let paused = self.paused;

        let tracks = self.clients.entry(client).or_default();
        if tracks.exited {
            return;
        }
        let cursor = Cursor {
            program,
            index: 0,
            token,
            paused,
            sleep: None,
        };
        match &track {
            TrackId::Main => tracks.main = Some(cursor),
            TrackId::Sub(name) => {
                tracks.subs.insert(name.clone(), cursor);
            }
        }

        debug!(%client, ?track, "Playing scenario");
        if !paused {
            self.post_step(client, track, token);
        }
    }

    fn post_step(&self, client: ClientId, track: TrackId, token: u64) {
        let _ = self.events.send(Event::Step {
            client,
            track,
            token,
        });
    }

    /// Execute the operation under the cursor.
    pub fn step(&mut self, client: ClientId, track: &TrackId, token: u64, registry: &mut Registry) {
        let Some(op) = self.current_op(client, track, token) else {
            return;
        };
        trace!(%client, ?track, ?op, "Step");

        match op {
            Operation::Sleep { min_ms, max_ms } => {
                let ms = self.rng.gen_range(min_ms..=max_ms);
                self.arm_sleep(client, track, token, Duration::from_millis(ms));
                return;
            }
            Operation::SendMessage {
                label,
                min_size,
                max_size,
            } => self.send_message(client, &label, min_size, max_size, registry),
            Operation::Disconnect => {
                if let Some(session) = registry.get_mut(client) {
                    session.close();
                }
            }
            Operation::Reconnect => {
                if let Some(session) = registry.get_mut(client) {
                    session.connect();
                }
            }
            Operation::PlaySubScenario { name, program } => {
                self.play_track(client, TrackId::Sub(name), Arc::new(*program));
            }
            Operation::Exit => {
                info!(%client, "Exiting");
                if let Some(session) = registry.get_mut(client) {
                    session.close();
                }
                if let Some(tracks) = self.clients.get_mut(&client) {
                    tracks.exited = true;
                    tracks.clear();
                }
                return;
            }
        }

        self.advance(client, track, token);
    }

    /// A sleep armed by [`Scheduler::step`] finished.
    pub fn sleep_done(&mut self, client: ClientId, track: &TrackId, token: u64) {
        self.advance(client, track, token);
    }

    fn current_op(&self, client: ClientId, track: &TrackId, token: u64) -> Option<Operation> {
        let tracks = self.clients.get(&client)?;
        if tracks.exited {
            return None;
        }
        let cursor = tracks.cursor(track)?;
        if cursor.paused || cursor.token != token {
            return None;
        }
        cursor.program.get(cursor.index).cloned()
    }

    fn advance(&mut self, client: ClientId, track: &TrackId, token: u64) {
        let Some(cursor) = self
            .clients
            .get_mut(&client)
            .and_then(|tracks| tracks.cursor_mut(track))
        else {
            return;
        };
        // Replaced or paused while the operation ran.
        if cursor.paused || cursor.token != token {
            return;
        }
        cursor.index = cursor.program.next_index(cursor.index);
        cursor.sleep = None;
        self.post_step(client, track.clone(), token);
    }

    fn arm_sleep(&mut self, client: ClientId, track: &TrackId, token: u64, delay: Duration) {
        let events = self.events.clone();
        let fired = track.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::SleepDone {
                client,
                track: fired,
                token,
            });
        });
        if let Some(cursor) = self
            .clients
            .get_mut(&client)
            .and_then(|tracks| tracks.cursor_mut(track))
        {
            cursor.sleep = Some(AbortOnDrop::new(task));
        }
    }

    fn send_message(
        &mut self,
        client: ClientId,
        label: &str,
        min_size: usize,
        max_size: usize,
        registry: &mut Registry,
    ) {
        let Some(session) = registry.get_mut(client) else {
            return;
        };
        if !session.can_send(label) {
            trace!(%client, "{label} is not open, skipping message");
            return;
        }

        let size = self.rng.gen_range(min_size..=max_size);
        let frame = if label.starts_with(DIAGNOSTIC_LABEL_PREFIX) {
            let counter = self
                .clients
                .get_mut(&client)
                .map(|tracks| {
                    let counter = tracks.counters.entry(label.to_string()).or_default();
                    *counter += 1;
                    *counter
                })
                .unwrap_or_default();
            Some(DiagnosticFrame::now(
                counter,
                session.connection_id().unwrap_or_default(),
            ))
        } else {
            None
        };

        match self.pool.message(size, frame.as_ref(), &mut self.rng) {
            Ok(payload) => {
                session.send_message(label, payload);
            }
            Err(err) => warn!(%client, "Failed to build payload for {label}: {err}"),
        }
    }

    pub fn pause_all(&mut self) {
        self.paused = true;
        let mut next = self.next_token;
        for tracks in self.clients.values_mut() {
            for (_, cursor) in tracks.cursors_mut() {
                next += 1;
                cursor.token = next;
                cursor.paused = true;
                cursor.sleep = None;
            }
        }
        self.next_token = next;
        info!("Paused all scenarios");
    }

    /// Resume every cursor at the operation it was paused on.
    pub fn resume_all(&mut self) {
        self.paused = false;
        let mut next = self.next_token;
        let mut resumed = Vec::new();
        for (client, tracks) in self.clients.iter_mut() {
            if tracks.exited {
                continue;
            }
            for (track, cursor) in tracks.cursors_mut() {
                next += 1;
                cursor.token = next;
                cursor.paused = false;
                resumed.push((*client, track, next));
            }
        }
        self.next_token = next;
        info!("Resumed {} scenario cursors", resumed.len());
        for (client, track, token) in resumed {
            self.post_step(client, track, token);
        }
    }

    pub fn remove(&mut self, client: ClientId) {
        self.clients.remove(&client);
    }

    /// Drop every cursor. Used on shutdown.
    pub fn stop_all(&mut self) {
        self.clients.values_mut().for_each(Tracks::clear);
    }

    /// True once at least one client ran a program and every such client exited.
    pub fn all_exited(&self) -> bool {
        !self.clients.is_empty() && self.clients.values().all(|tracks| tracks.exited)
    }
}
