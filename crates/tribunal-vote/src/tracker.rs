//! Voice room occupancy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Tracks which voice room each known participant currently occupies.
///
/// Fed by the presence feed; read when a vote starts or a ballot arrives.
/// Reads may trail a presence event delivered moments earlier, which is
/// accepted rather than corrected.
///
/// Uses `std::sync::RwLock`: every acquisition is a brief `HashMap`
/// operation that never spans an `.await`.
#[derive(Debug, Clone, Default)]
pub struct VoiceRoomTracker {
    /// participant -> room.
    rooms: Arc<RwLock<HashMap<String, String>>>,
}

impl VoiceRoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the participant's current room.
    ///
    /// `None` (or an empty room id) means the participant left voice.
    /// Returns the room they were in before, if any.
    pub fn record_presence(&self, participant: &str, room: Option<&str>) -> Option<String> {
        let room = room.map(str::trim).filter(|r| !r.is_empty());
        let mut rooms = self.write();
        let previous = match room {
            Some(room) => rooms.insert(participant.to_string(), room.to_string()),
            None => rooms.remove(participant),
        };
        tracing::debug!(
            participant = %participant,
            room = room.unwrap_or("<none>"),
            previous = previous.as_deref().unwrap_or("<none>"),
            "updated voice presence"
        );
        previous
    }

    /// The room the participant currently occupies, if any.
    pub fn room_of(&self, participant: &str) -> Option<String> {
        self.read().get(participant).cloned()
    }

    /// Number of participants currently in `room`.
    ///
    /// This is a snapshot; callers that size a vote from it keep the value
    /// fixed for the lifetime of the vote.
    pub fn occupants_of(&self, room: &str) -> usize {
        let count = self.read().values().filter(|r| r.as_str() == room).count();
        tracing::debug!(room_id = %room, count, "counted room occupants");
        count
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.rooms.read().unwrap_or_else(|poisoned| {
            tracing::error!("voice room tracker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.rooms.write().unwrap_or_else(|poisoned| {
            tracing::error!("voice room tracker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_overwrites_previous_room() {
        let tracker = VoiceRoomTracker::new();
        assert_eq!(tracker.record_presence("alice", Some("lobby")), None);
        assert_eq!(
            tracker.record_presence("alice", Some("raid")),
            Some("lobby".to_string())
        );
        assert_eq!(tracker.room_of("alice").as_deref(), Some("raid"));
        assert_eq!(tracker.occupants_of("lobby"), 0);
        assert_eq!(tracker.occupants_of("raid"), 1);
    }

    #[test]
    fn leaving_clears_the_room() {
        let tracker = VoiceRoomTracker::new();
        tracker.record_presence("alice", Some("lobby"));
        tracker.record_presence("alice", None);
        assert_eq!(tracker.room_of("alice"), None);

        tracker.record_presence("bob", Some("lobby"));
        tracker.record_presence("bob", Some("  "));
        assert_eq!(tracker.room_of("bob"), None);
        assert_eq!(tracker.occupants_of("lobby"), 0);
    }

    #[test]
    fn counts_only_the_requested_room() {
        let tracker = VoiceRoomTracker::new();
        for (who, room) in [("a", "one"), ("b", "one"), ("c", "two"), ("d", "one")] {
            tracker.record_presence(who, Some(room));
        }
        assert_eq!(tracker.occupants_of("one"), 3);
        assert_eq!(tracker.occupants_of("two"), 1);
        assert_eq!(tracker.occupants_of("three"), 0);
        assert_eq!(tracker.room_of("nobody"), None);
    }

    #[test]
    fn clones_share_state() {
        let tracker = VoiceRoomTracker::new();
        let other = tracker.clone();
        other.record_presence("alice", Some("lobby"));
        assert_eq!(tracker.room_of("alice").as_deref(), Some("lobby"));
    }
}
