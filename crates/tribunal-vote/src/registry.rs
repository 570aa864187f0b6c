//! Room-keyed registry of live vote sessions.

use crate::session::VoteSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Owns every live [`VoteSession`], keyed by room.
///
/// The single source of truth for "is there a vote in this room". All
/// operations go through one `std::sync::Mutex`; the working set is a
/// handful of rooms and no acquisition spans an `.await`, so a single lock
/// keeps create-if-absent and mutate linearizable without per-room locks.
#[derive(Debug, Clone, Default)]
pub struct VoteSessionRegistry {
    sessions: Arc<Mutex<HashMap<String, VoteSession>>>,
}

impl VoteSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the session built by `factory` unless `room_id` already has
    /// one.
    ///
    /// Returns a snapshot of the session now occupying the room and whether
    /// this call created it. `factory` only runs when the slot is empty.
    pub fn try_create<F>(&self, room_id: &str, factory: F) -> (VoteSession, bool)
    where
        F: FnOnce() -> VoteSession,
    {
        let mut sessions = self.lock();
        if let Some(existing) = sessions.get(room_id) {
            return (existing.clone(), false);
        }
        let session = factory();
        debug_assert_eq!(session.room_id(), room_id);
        sessions.insert(room_id.to_string(), session.clone());
        (session, true)
    }

    /// A snapshot of the room's session, if any.
    pub fn get(&self, room_id: &str) -> Option<VoteSession> {
        self.lock().get(room_id).cloned()
    }

    /// Runs `f` against the room's session while holding the lock.
    ///
    /// Returns `None` when the room has no session. This is the only path
    /// through which ballots and resolution change a session.
    pub fn mutate<R, F>(&self, room_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut VoteSession) -> R,
    {
        self.lock().get_mut(room_id).map(f)
    }

    /// Deletes the room's session. Removing an empty slot is a no-op.
    pub fn remove(&self, room_id: &str) -> Option<VoteSession> {
        let removed = self.lock().remove(room_id);
        if let Some(ref session) = removed {
            tracing::debug!(
                room_id = %room_id,
                session_id = %session.id(),
                "removed vote session"
            );
        }
        removed
    }

    /// Deletes the room's session only if it is still `session_id`.
    ///
    /// Returns `true` if something was removed.
    pub fn remove_session(&self, room_id: &str, session_id: Uuid) -> bool {
        let mut sessions = self.lock();
        match sessions.get(room_id) {
            Some(session) if session.id() == session_id => {
                sessions.remove(room_id);
                true
            }
            _ => false,
        }
    }

    /// Rooms that currently have a session, sorted.
    pub fn active_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.lock().keys().cloned().collect();
        rooms.sort();
        rooms
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VoteSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| {
            // Mutations are single map or counter updates; poisoned state
            // is still consistent.
            tracing::error!("vote session registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
