//! The `StartVote` / `CastVote` command surface.

use crate::error::VoteError;
use crate::registry::VoteSessionRegistry;
use crate::scheduler::SessionScheduler;
use crate::session::{threshold, Tally, VoteSession};
use crate::tracker::VoiceRoomTracker;
use tribunal_types::{SessionSummary, VotePolicy};
use uuid::Uuid;

/// Result of an accepted ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastReceipt {
    pub session_id: Uuid,
    pub room_id: String,
    pub tally: Tally,
    /// Whether this ballot triggered early resolution.
    pub resolving_early: bool,
}

/// Validates commands against room occupancy and drives sessions through
/// the registry and scheduler.
#[derive(Clone)]
pub struct VoteCoordinator {
    tracker: VoiceRoomTracker,
    registry: VoteSessionRegistry,
    scheduler: SessionScheduler,
    policy: VotePolicy,
}

impl VoteCoordinator {
    pub fn new(
        tracker: VoiceRoomTracker,
        registry: VoteSessionRegistry,
        scheduler: SessionScheduler,
        policy: VotePolicy,
    ) -> Self {
        Self {
            tracker,
            registry,
            scheduler,
            policy,
        }
    }

    pub fn tracker(&self) -> &VoiceRoomTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &VoteSessionRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    pub fn policy(&self) -> &VotePolicy {
        &self.policy
    }

    /// Opens a vote in the initiator's room to time out `target`.
    ///
    /// The threshold is computed from the room's occupancy right now and
    /// does not change for the lifetime of the session.
    ///
    /// # Errors
    ///
    /// Checked in order: [`VoteError::NotInRoom`], [`VoteError::InvalidTarget`],
    /// [`VoteError::DifferentRooms`], [`VoteError::VoteAlreadyActive`].
    pub fn start_vote(&self, initiator: &str, target: &str) -> Result<SessionSummary, VoteError> {
        let room_id = self.tracker.room_of(initiator).ok_or(VoteError::NotInRoom)?;

        let target = target.trim();
        if target.is_empty() {
            return Err(VoteError::InvalidTarget);
        }

        if self.tracker.room_of(target).as_deref() != Some(room_id.as_str()) {
            return Err(VoteError::DifferentRooms);
        }

        let occupants = self.tracker.occupants_of(&room_id);
        let votes_needed = threshold(occupants, self.policy.percentage);
        let duration = self.policy.duration();

        let (session, created) = self.registry.try_create(&room_id, || {
            VoteSession::new(room_id.as_str(), target, initiator, votes_needed, duration)
        });
        if !created {
            tracing::info!(
                room_id = %room_id,
                session_id = %session.id(),
                initiator = %initiator,
                "vote start rejected: a vote is already running"
            );
            return Err(VoteError::VoteAlreadyActive(room_id));
        }

        self.scheduler.start(&session, duration);

        tracing::info!(
            room_id = %room_id,
            session_id = %session.id(),
            initiator = %initiator,
            target = %target,
            occupants,
            votes_needed,
            "vote session started"
        );

        Ok(session.summary())
    }

    /// Records `voter`'s ballot in the vote running in their room.
    ///
    /// # Errors
    ///
    /// [`VoteError::NotInRoom`], [`VoteError::NoActiveVote`] (also while a
    /// session is being resolved), [`VoteError::AlreadyVoted`].
    pub fn cast_vote(&self, voter: &str, affirmative: bool) -> Result<CastReceipt, VoteError> {
        self.cast_vote_then(voter, affirmative, |_| {})
    }

    /// Like [`cast_vote`](Self::cast_vote), but runs `on_recorded` after the
    /// ballot is counted and before early resolution is signalled, so
    /// anything it publishes is ordered ahead of the resolution.
    ///
    /// The receipt passed to `on_recorded` always has `resolving_early`
    /// unset.
    pub fn cast_vote_then(
        &self,
        voter: &str,
        affirmative: bool,
        on_recorded: impl FnOnce(&CastReceipt),
    ) -> Result<CastReceipt, VoteError> {
        let room_id = self.tracker.room_of(voter).ok_or(VoteError::NotInRoom)?;

        let (session_id, tally) = self
            .registry
            .mutate(&room_id, |s| {
                s.cast_vote(voter, affirmative).map(|tally| (s.id(), tally))
            })
            .ok_or(VoteError::NoActiveVote)??;

        tracing::info!(
            room_id = %room_id,
            session_id = %session_id,
            voter = %voter,
            affirmative,
            votes_for = tally.votes_for,
            votes_needed = tally.votes_needed,
            "vote recorded"
        );

        let mut receipt = CastReceipt {
            session_id,
            room_id,
            tally,
            resolving_early: false,
        };
        on_recorded(&receipt);

        receipt.resolving_early = self.policy.resolve_on_quorum
            && tally.quorum_reached()
            && self.scheduler.resolve_now(session_id);
        if receipt.resolving_early {
            tracing::info!(
                room_id = %receipt.room_id,
                session_id = %session_id,
                "quorum reached, resolving early"
            );
        }

        Ok(receipt)
    }

    /// Feeds a presence event into the tracker.
    pub fn record_presence(&self, participant: &str, room: Option<&str>) -> Option<String> {
        self.tracker.record_presence(participant, room)
    }

    /// The session currently running in `room_id`, if any.
    pub fn active_vote(&self, room_id: &str) -> Option<SessionSummary> {
        self.registry.get(room_id).map(|s| s.summary())
    }
}
