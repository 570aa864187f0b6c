//! Session lifetime timers.
//!
//! Each created session gets one spawned task that sleeps until the
//! session's deadline, resolves it through the registry, and hands the
//! decision to a [`SessionResolver`]. The task can be woken early through
//! its [`ScheduleHandle`], either to resolve immediately or to drop the
//! session without a decision.

use crate::registry::VoteSessionRegistry;
use crate::session::{ResolvedSession, VoteSession};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Receives sessions once the scheduler has decided them.
///
/// Implementations perform the side effects of a decision and are
/// responsible for freeing the room in the registry afterwards.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn on_resolved(&self, resolved: ResolvedSession);

    /// Called after a cancelled session has been removed from the registry.
    async fn on_cancelled(&self, _session_id: Uuid, _room_id: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    ResolveNow,
    Cancel,
}

/// Control handle for one scheduled session.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    session_id: Uuid,
    room_id: String,
    tx: mpsc::Sender<Signal>,
}

impl ScheduleHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Resolves the session now instead of at its deadline.
    ///
    /// Returns `false` if the timer already fired or another signal is
    /// pending.
    pub fn resolve_now(&self) -> bool {
        self.tx.try_send(Signal::ResolveNow).is_ok()
    }

    /// Drops the session without resolving it and frees the room.
    ///
    /// Returns `false` if the timer already fired or another signal is
    /// pending.
    pub fn cancel(&self) -> bool {
        self.tx.try_send(Signal::Cancel).is_ok()
    }
}

/// Starts and tracks one timer task per session.
#[derive(Clone)]
pub struct SessionScheduler {
    registry: VoteSessionRegistry,
    resolver: Arc<dyn SessionResolver>,
    /// Live timers: session id -> handle. Entries remove themselves when
    /// their task finishes.
    handles: Arc<Mutex<HashMap<Uuid, ScheduleHandle>>>,
}

impl SessionScheduler {
    pub fn new(registry: VoteSessionRegistry, resolver: Arc<dyn SessionResolver>) -> Self {
        Self {
            registry,
            resolver,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawns the timer for `session`, which fires `duration` after this
    /// call regardless of when the task is first polled.
    ///
    /// Must be called from within a tokio runtime. The registry guarantees
    /// one session per room, and therefore one timer per room.
    pub fn start(&self, session: &VoteSession, duration: Duration) -> ScheduleHandle {
        let session_id = session.id();
        let room_id = session.room_id().to_string();
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ScheduleHandle {
            session_id,
            room_id: room_id.clone(),
            tx,
        };
        self.lock().insert(session_id, handle.clone());

        let deadline = tokio::time::Instant::now() + duration;
        let registry = self.registry.clone();
        let resolver = self.resolver.clone();
        let handles = self.handles.clone();

        tracing::info!(
            session_id = %session_id,
            room_id = %room_id,
            duration_secs = duration.as_secs(),
            "scheduled vote resolution"
        );

        tokio::spawn(async move {
            let sleep = tokio::time::sleep_until(deadline);
            tokio::pin!(sleep);

            let signal = tokio::select! {
                () = &mut sleep => None,
                received = rx.recv() => match received {
                    Some(signal) => Some(signal),
                    None => {
                        (&mut sleep).await;
                        None
                    }
                },
            };

            match signal {
                Some(Signal::Cancel) => {
                    if registry.remove_session(&room_id, session_id) {
                        tracing::info!(
                            session_id = %session_id,
                            room_id = %room_id,
                            "vote session cancelled"
                        );
                        resolver.on_cancelled(session_id, &room_id).await;
                    }
                }
                Some(Signal::ResolveNow) | None => {
                    let early = signal.is_some();
                    let resolved = registry
                        .mutate(&room_id, |s| {
                            if s.id() == session_id {
                                s.resolve()
                            } else {
                                None
                            }
                        })
                        .flatten();
                    match resolved {
                        Some(resolved) => {
                            tracing::info!(
                                session_id = %session_id,
                                room_id = %room_id,
                                outcome = resolved.outcome.as_str(),
                                votes_for = resolved.votes_for,
                                votes_needed = resolved.votes_needed,
                                early,
                                "vote session resolved"
                            );
                            resolver.on_resolved(resolved).await;
                        }
                        None => {
                            tracing::warn!(
                                session_id = %session_id,
                                room_id = %room_id,
                                "vote session vanished before resolution"
                            );
                        }
                    }
                }
            }

            let mut handles = handles.lock().unwrap_or_else(|p| p.into_inner());
            handles.remove(&session_id);
        });

        handle
    }

    /// The handle for a live timer.
    pub fn handle(&self, session_id: Uuid) -> Option<ScheduleHandle> {
        self.lock().get(&session_id).cloned()
    }

    /// Shortcut for [`ScheduleHandle::resolve_now`]. `false` if no timer is live.
    pub fn resolve_now(&self, session_id: Uuid) -> bool {
        self.handle(session_id).is_some_and(|h| h.resolve_now())
    }

    /// Shortcut for [`ScheduleHandle::cancel`]. `false` if no timer is live.
    pub fn cancel(&self, session_id: Uuid) -> bool {
        self.handle(session_id).is_some_and(|h| h.cancel())
    }

    /// Number of timers still running.
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ScheduleHandle>> {
        self.handles.lock().unwrap_or_else(|poisoned| {
            tracing::error!("session scheduler lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
