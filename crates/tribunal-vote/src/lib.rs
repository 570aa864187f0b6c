//! Vote-session engine for Tribunal.
//!
//! Occupants of a voice room can open a time-bounded vote to time out
//! another occupant. This crate holds everything with real state: who sits
//! in which room, the per-room session registry, the session state machine,
//! and the timer that resolves each session exactly once.
//!
//! # Components
//!
//! - [`VoiceRoomTracker`]: room occupancy fed by presence events
//! - [`VoteSessionRegistry`]: at most one [`VoteSession`] per room
//! - [`SessionScheduler`]: one timer task per session, with a
//!   [`ScheduleHandle`] for early resolution or cancellation
//! - [`VoteCoordinator`]: the `StartVote` / `CastVote` command surface
//!
//! Side effects of a resolved session (moderation, notifications) live
//! behind the [`SessionResolver`] trait so this crate stays free of I/O.
//!
//! # Locking
//!
//! The tracker and the registry each own an independent lock. Neither is
//! ever held across an `.await`, and no operation takes both at once.

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod tracker;

pub use coordinator::{CastReceipt, VoteCoordinator};
pub use error::VoteError;
pub use registry::VoteSessionRegistry;
pub use scheduler::{ScheduleHandle, SessionResolver, SessionScheduler};
pub use session::{threshold, ResolvedSession, Tally, VoteSession};
pub use tracker::VoiceRoomTracker;
