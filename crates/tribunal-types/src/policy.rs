//! Vote policy configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Defines how vote sessions are sized, timed and enforced.
///
/// Loaded from the `[vote]` table of the server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotePolicy {
    /// Percentage of the room's occupants whose affirmative votes are needed.
    #[serde(default = "default_percentage")]
    pub percentage: f64,
    /// How long a session stays open, in seconds.
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,
    /// How long a passed vote times the target out, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Resolve as soon as the threshold is reached instead of waiting for
    /// the deadline. The decision is the same either way.
    #[serde(default)]
    pub resolve_on_quorum: bool,
}

/// Rejected policy values.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("vote percentage must be within (0, 100], got {0}")]
    Percentage(f64),

    #[error("vote duration must be at least one second")]
    Duration,

    #[error("timeout duration must be at least one second")]
    Timeout,
}

fn default_percentage() -> f64 {
    75.0
}

fn default_duration_seconds() -> u64 {
    60
}

fn default_timeout_seconds() -> u64 {
    300
}

impl Default for VotePolicy {
    fn default() -> Self {
        Self {
            percentage: default_percentage(),
            duration_seconds: default_duration_seconds(),
            timeout_seconds: default_timeout_seconds(),
            resolve_on_quorum: false,
        }
    }
}

impl VotePolicy {
    /// Checks that the policy can produce meaningful sessions.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] found.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !(self.percentage > 0.0 && self.percentage <= 100.0) {
            return Err(PolicyError::Percentage(self.percentage));
        }
        if self.duration_seconds == 0 {
            return Err(PolicyError::Duration);
        }
        if self.timeout_seconds == 0 {
            return Err(PolicyError::Timeout);
        }
        Ok(())
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.duration_seconds)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}
