//! User-facing message text.

/// Reply to the initiator of a new vote.
pub fn vote_started(target_id: &str, duration_secs: u64, votes_needed: u32) -> String {
    format!(
        "Vote to time out {} started. Cast your vote to participate. \
         {} votes are needed and this vote will conclude in {} seconds.",
        target_id, votes_needed, duration_secs
    )
}

pub fn vote_counted() -> &'static str {
    "Your vote has been counted."
}

/// Posted to the room after every accepted ballot.
pub fn vote_status(votes_for: u32, votes_needed: u32) -> String {
    format!(
        "Current votes: {}/{} required to time out the user.",
        votes_for, votes_needed
    )
}

pub fn vote_passed(target_id: &str, timeout_secs: u64) -> String {
    format!(
        "Vote passed. {} will be timed out for {} seconds.",
        target_id, timeout_secs
    )
}

pub fn vote_failed() -> &'static str {
    "Vote failed. Not enough votes."
}

pub fn vote_cancelled() -> &'static str {
    "Vote cancelled."
}

pub fn startup() -> &'static str {
    "Tribunal is now running and ready to receive commands!"
}
