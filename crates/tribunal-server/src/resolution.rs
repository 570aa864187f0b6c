//! Side effects of a decided vote.

use crate::messages;
use crate::outbound::{MessagingSink, ModerationAction};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tribunal_types::{VoteEvent, VoteOutcome};
use tribunal_vote::{ResolvedSession, SessionResolver, VoteSessionRegistry};
use uuid::Uuid;

/// Carries out a resolved session: times out the target on a pass,
/// announces the result, and frees the room.
///
/// Platform failures are logged and dropped. The decision stands and the
/// room is freed regardless.
pub struct ResolutionExecutor {
    registry: VoteSessionRegistry,
    sink: Arc<dyn MessagingSink>,
    moderation: Arc<dyn ModerationAction>,
    events_tx: broadcast::Sender<VoteEvent>,
    timeout: Duration,
}

impl ResolutionExecutor {
    pub fn new(
        registry: VoteSessionRegistry,
        sink: Arc<dyn MessagingSink>,
        moderation: Arc<dyn ModerationAction>,
        events_tx: broadcast::Sender<VoteEvent>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            moderation,
            events_tx,
            timeout,
        }
    }

    async fn post(&self, room_id: &str, text: &str) {
        if let Err(e) = self.sink.post(room_id, text).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to send room message");
        }
    }
}

#[async_trait]
impl SessionResolver for ResolutionExecutor {
    async fn on_resolved(&self, resolved: ResolvedSession) {
        let room_id = resolved.room_id.as_str();

        match resolved.outcome {
            VoteOutcome::Passed => {
                self.post(
                    room_id,
                    &messages::vote_passed(&resolved.target_id, self.timeout.as_secs()),
                )
                .await;

                match self
                    .moderation
                    .timeout(room_id, &resolved.target_id, self.timeout)
                    .await
                {
                    Ok(()) => tracing::info!(
                        session_id = %resolved.session_id,
                        room_id = %room_id,
                        target_id = %resolved.target_id,
                        timeout_secs = self.timeout.as_secs(),
                        "target timed out"
                    ),
                    Err(e) => tracing::error!(
                        session_id = %resolved.session_id,
                        room_id = %room_id,
                        target_id = %resolved.target_id,
                        error = %e,
                        "failed to apply timeout"
                    ),
                }
            }
            VoteOutcome::Failed => {
                self.post(room_id, messages::vote_failed()).await;
                tracing::info!(
                    session_id = %resolved.session_id,
                    room_id = %room_id,
                    target_id = %resolved.target_id,
                    votes_for = resolved.votes_for,
                    votes_needed = resolved.votes_needed,
                    "vote failed, no action taken"
                );
            }
        }

        let _ = self.events_tx.send(VoteEvent::Resolved {
            session_id: resolved.session_id,
            room_id: resolved.room_id.clone(),
            target_id: resolved.target_id.clone(),
            outcome: resolved.outcome,
            votes_for: resolved.votes_for,
            votes_needed: resolved.votes_needed,
        });

        self.registry.remove(room_id);
    }

    async fn on_cancelled(&self, session_id: Uuid, room_id: &str) {
        self.post(room_id, messages::vote_cancelled()).await;
        let _ = self.events_tx.send(VoteEvent::Cancelled {
            session_id,
            room_id: room_id.to_string(),
        });
    }
}
