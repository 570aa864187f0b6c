//! Vote lifecycle events and session views.
//!
//! [`VoteEvent`] is what the server fans out over its broadcast channel and
//! SSE stream. [`SessionSummary`] is the read-only view of a live session
//! returned by the status endpoint.

use crate::{SessionState, VoteOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point-in-time view of a vote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub room_id: String,
    pub target_id: String,
    pub initiator_id: String,
    pub votes_for: u32,
    pub votes_needed: u32,
    pub voter_count: usize,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Events emitted over the course of a vote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoteEvent {
    /// A session was opened in a room.
    Started {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        #[serde(rename = "initiatorId")]
        initiator_id: String,
        #[serde(rename = "votesNeeded")]
        votes_needed: u32,
        deadline: DateTime<Utc>,
    },
    /// A vote was accepted. Individual ballots are not disclosed.
    VoteRecorded {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "votesFor")]
        votes_for: u32,
        #[serde(rename = "votesNeeded")]
        votes_needed: u32,
        #[serde(rename = "voterCount")]
        voter_count: usize,
    },
    /// A session reached its terminal decision.
    Resolved {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        outcome: VoteOutcome,
        #[serde(rename = "votesFor")]
        votes_for: u32,
        #[serde(rename = "votesNeeded")]
        votes_needed: u32,
    },
    /// A session was dropped without a decision.
    Cancelled {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "roomId")]
        room_id: String,
    },
}

impl VoteEvent {
    /// The room the event belongs to.
    pub fn room_id(&self) -> &str {
        match self {
            Self::Started { room_id, .. }
            | Self::VoteRecorded { room_id, .. }
            | Self::Resolved { room_id, .. }
            | Self::Cancelled { room_id, .. } => room_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_event_wire_format() {
        let event = VoteEvent::Resolved {
            session_id: Uuid::nil(),
            room_id: "voice-1".to_string(),
            target_id: "mallory".to_string(),
            outcome: VoteOutcome::Passed,
            votes_for: 3,
            votes_needed: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "resolved");
        assert_eq!(json["roomId"], "voice-1");
        assert_eq!(json["targetId"], "mallory");
        assert_eq!(json["outcome"], "passed");
        assert_eq!(json["votesFor"], 3);
        assert_eq!(event.room_id(), "voice-1");
    }

    #[test]
    fn vote_recorded_hides_ballots() {
        let event = VoteEvent::VoteRecorded {
            session_id: Uuid::nil(),
            room_id: "voice-1".to_string(),
            votes_for: 1,
            votes_needed: 3,
            voter_count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "vote_recorded");
        assert_eq!(json["voterCount"], 2);
        assert!(json.get("voterId").is_none());
    }
}
