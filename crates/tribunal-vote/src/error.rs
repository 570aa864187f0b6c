use thiserror::Error;

/// Rejections returned to the participant who issued a command.
///
/// None of these leave any state behind: a rejected command changes
/// neither the tracker nor the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("you need to be in a voice room to do that")]
    NotInRoom,

    #[error("invalid participant specified")]
    InvalidTarget,

    #[error("both you and the target must be in the same voice room")]
    DifferentRooms,

    #[error("a vote is already running in room {0}")]
    VoteAlreadyActive(String),

    #[error("there is no active vote in this voice room")]
    NoActiveVote,

    #[error("you have already voted")]
    AlreadyVoted,
}
