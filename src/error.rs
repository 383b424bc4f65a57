use thiserror::Error;

/// Reasons a room command is refused. None of them touch room state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The game already started; the joining connection gets closed
    #[error("Game already in progress")]
    RoomLocked,
    #[error("Only the host can {0}")]
    NotHost(&'static str),
    #[error("Game has not started")]
    GameNotStarted,
    #[error("Voting is not active")]
    VotingNotActive,
    #[error("You cannot vote for your own answer")]
    SelfVoteForbidden,
}

impl RoomError {
    /// Stable wire code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomLocked => "ROOM_LOCKED",
            RoomError::NotHost(_) => "NOT_HOST",
            RoomError::GameNotStarted => "GAME_NOT_STARTED",
            RoomError::VotingNotActive => "VOTING_NOT_ACTIVE",
            RoomError::SelfVoteForbidden => "SELF_VOTE_FORBIDDEN",
        }
    }
}
