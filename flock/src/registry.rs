use crate::session::Session;
use std::fmt;

/// Stable handle to a registered client.
///
/// The generation changes when a slot is reused, so events addressed to a removed
/// client never reach its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId {
    index: u32,
    generation: u32,
}

impl ClientId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.index)
    }
}

struct Slot {
    generation: u32,
    session: Option<Session>,
}

/// Owner of every live session, indexed by [`ClientId`].
#[derive(Default)]
pub(crate) struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    pub fn insert(&mut self, build: impl FnOnce(ClientId) -> Session) -> ClientId {
        let free = self.slots.iter().position(|slot| slot.session.is_none());
        let index = free.unwrap_or(self.slots.len());
        if free.is_none() {
            self.slots.push(Slot {
                generation: 0,
                session: None,
            });
        }

        let slot = &mut self.slots[index];
        let id = ClientId {
            index: index as u32,
            generation: slot.generation,
        };
        slot.session = Some(build(id));
        id
    }

    pub fn get(&self, id: ClientId) -> Option<&Session> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.session.as_ref())
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Session> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.session.as_mut())
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Session> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let session = slot.session.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(session)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().filter_map(|slot| slot.session.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.slots.iter_mut().filter_map(|slot| slot.session.as_mut())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
