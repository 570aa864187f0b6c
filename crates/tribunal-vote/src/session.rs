//! The per-room vote session state machine.

use crate::error::VoteError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tribunal_types::{SessionState, SessionSummary, VoteOutcome};
use uuid::Uuid;

/// Affirmative votes needed out of `occupants` at `percentage` percent.
///
/// Truncates: 3 occupants at 75% need 2 votes, not 3. Sessions can pass
/// with slightly less than the nominal share when the product is not an
/// integer.
pub fn threshold(occupants: usize, percentage: f64) -> u32 {
    // `as` saturates: negative and NaN products become 0.
    (occupants as f64 * percentage / 100.0).floor() as u32
}

/// Running totals after an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub votes_for: u32,
    pub votes_needed: u32,
    pub voter_count: usize,
}

impl Tally {
    pub fn quorum_reached(&self) -> bool {
        self.votes_for >= self.votes_needed
    }
}

/// The final record of a session, handed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: Uuid,
    pub room_id: String,
    pub target_id: String,
    pub initiator_id: String,
    pub outcome: VoteOutcome,
    pub votes_for: u32,
    pub votes_needed: u32,
}

/// A single vote to time out `target_id`, scoped to `room_id`.
///
/// Only the registry hands out mutable access, so every transition here
/// happens under the registry lock.
#[derive(Debug, Clone)]
pub struct VoteSession {
    id: Uuid,
    room_id: String,
    target_id: String,
    initiator_id: String,
    votes_needed: u32,
    votes_for: u32,
    voters: HashSet<String>,
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    state: SessionState,
}

impl VoteSession {
    pub fn new(
        room_id: impl Into<String>,
        target_id: impl Into<String>,
        initiator_id: impl Into<String>,
        votes_needed: u32,
        duration: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let deadline = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            target_id: target_id.into(),
            initiator_id: initiator_id.into(),
            votes_needed,
            votes_for: 0,
            voters: HashSet::new(),
            created_at,
            deadline,
            state: SessionState::Open,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn initiator_id(&self) -> &str {
        &self.initiator_id
    }

    pub fn votes_needed(&self) -> u32 {
        self.votes_needed
    }

    pub fn votes_for(&self) -> u32 {
        self.votes_for
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn has_voted(&self, participant: &str) -> bool {
        self.voters.contains(participant)
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Records one ballot from `participant`.
    ///
    /// A negative ballot only uses up the participant's vote; there is no
    /// opposing tally.
    ///
    /// # Errors
    ///
    /// - [`VoteError::NoActiveVote`] once the session has been resolved.
    /// - [`VoteError::AlreadyVoted`] if `participant` already voted.
    pub fn cast_vote(&mut self, participant: &str, affirmative: bool) -> Result<Tally, VoteError> {
        if self.state.is_terminal() {
            return Err(VoteError::NoActiveVote);
        }
        if !self.voters.insert(participant.to_string()) {
            return Err(VoteError::AlreadyVoted);
        }
        if affirmative {
            self.votes_for += 1;
        }
        Ok(self.tally())
    }

    pub fn tally(&self) -> Tally {
        Tally {
            votes_for: self.votes_for,
            votes_needed: self.votes_needed,
            voter_count: self.voters.len(),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.votes_for >= self.votes_needed
    }

    /// Moves an open session to its terminal state.
    ///
    /// Returns `None` if the session was already resolved, so at most one
    /// caller ever observes the decision.
    pub fn resolve(&mut self) -> Option<ResolvedSession> {
        if self.state.is_terminal() {
            return None;
        }
        let outcome = if self.is_passed() {
            VoteOutcome::Passed
        } else {
            VoteOutcome::Failed
        };
        self.state = outcome.state();
        Some(ResolvedSession {
            session_id: self.id,
            room_id: self.room_id.clone(),
            target_id: self.target_id.clone(),
            initiator_id: self.initiator_id.clone(),
            outcome,
            votes_for: self.votes_for,
            votes_needed: self.votes_needed,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            room_id: self.room_id.clone(),
            target_id: self.target_id.clone(),
            initiator_id: self.initiator_id.clone(),
            votes_for: self.votes_for,
            votes_needed: self.votes_needed,
            voter_count: self.voters.len(),
            state: self.state,
            created_at: self.created_at,
            deadline: self.deadline,
        }
    }
}
