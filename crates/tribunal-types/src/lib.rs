//! Shared types for the Tribunal vote-timeout service.
//!
//! This crate holds the serde-facing definitions used by both the core vote
//! engine (`tribunal-vote`) and the HTTP service (`tribunal-server`): the
//! configurable [`VotePolicy`], session state and outcome codes, and the
//! [`VoteEvent`] payloads streamed to observers.
//!
//! Participants and rooms are opaque string identifiers handed to us by the
//! host platform. They are kept as plain `String`s throughout the workspace.

use serde::{Deserialize, Serialize};

mod event;
mod policy;

pub use event::{SessionSummary, VoteEvent};
pub use policy::{PolicyError, VotePolicy};

/// Lifecycle state of a single vote session.
///
/// A session starts `Open` and moves to exactly one terminal state when it
/// is resolved. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting votes, clock running.
    #[default]
    Open,
    /// Resolved with enough affirmative votes.
    Passed,
    /// Resolved without enough affirmative votes.
    Failed,
}

impl SessionState {
    /// Returns `true` once the session has been resolved.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }

    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// The terminal decision of a vote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The target is timed out.
    Passed,
    /// Not enough affirmative votes; no action taken.
    Failed,
}

impl VoteOutcome {
    /// Returns the string label for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    /// Returns the terminal [`SessionState`] matching this outcome.
    pub fn state(self) -> SessionState {
        match self {
            Self::Passed => SessionState::Passed,
            Self::Failed => SessionState::Failed,
        }
    }
}
