//! Slot tables mapping ConnectionIds to link objects
//!
//! Each table is a growable vector of optional entries. A ConnectionId is the
//! slot index plus one. Freed slots are emptied in place and never compacted,
//! so removing one connection never renumbers another.

use std::sync::{Mutex, MutexGuard};

use log::{error, trace};

use super::ids::ConnectionId;

/// Number of slots reserved up front
pub const INITIAL_CONNECTIONS: usize = 4;

/// A slot table guarded by a single lock. Each operation is atomic on its
/// own; sequences of operations are not.
#[derive(Debug)]
pub struct ConnectionRegistry<T> {
    name: &'static str,
    slots: Mutex<Vec<Option<T>>>,
}

impl<T: Clone + PartialEq> ConnectionRegistry<T> {
    /// Constructor. The name is only used for logging.
    pub fn new(name: &'static str) -> Self {
        Self { name, slots: Mutex::new(Vec::with_capacity(INITIAL_CONNECTIONS)) }
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Option<T>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a link in the first free slot (or a new one) and return its id
    pub fn add(&self, link: T) -> ConnectionId {
        let mut slots = self.slots();
        let slot = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = Some(link);
                free
            }
            None => {
                slots.push(Some(link));
                slots.len() - 1
            }
        };
        let conn_id = ConnectionId::from_slot(slot);
        trace!("{}: allocated {conn_id}", self.name);
        conn_id
    }

    /// Clear the slot for this id, returning what it held
    pub fn remove(&self, conn_id: ConnectionId) -> Option<T> {
        let mut slots = self.slots();
        match conn_id.slot().and_then(|slot| slots.get_mut(slot)) {
            Some(entry) => {
                let old = entry.take();
                if old.is_none() {
                    trace!("{}: {conn_id} was already free", self.name);
                }
                old
            }
            None => {
                error!("{}: trying to remove unknown connId {conn_id}", self.name);
                None
            }
        }
    }

    /// Look up the link for this id
    pub fn get(&self, conn_id: ConnectionId) -> Option<T> {
        let slots = self.slots();
        match conn_id.slot().and_then(|slot| slots.get(slot)) {
            Some(entry) => entry.clone(),
            None => {
                error!("{}: unknown connId {conn_id}", self.name);
                None
            }
        }
    }

    /// Find the id of a link, or ConnectionId::NONE if it is not present
    pub fn find(&self, link: &T) -> ConnectionId {
        self.slots()
            .iter()
            .position(|entry| entry.as_ref() == Some(link))
            .map(ConnectionId::from_slot)
            .unwrap_or(ConnectionId::NONE)
    }

    /// Number of occupied slots
    pub fn active_count(&self) -> usize {
        self.slots().iter().filter(|entry| entry.is_some()).count()
    }
}
