use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
        #[serde(default)]
        nickname: String,
    },
    StartGame,
    SubmitAnswer {
        answer: String,
    },
    /// Host reveals the next anonymous answer
    NextAnswer,
    SubmitVote {
        answer_id: AnswerId,
    },
    /// Host reveals the next result row
    NextResult,
    NewRound,
    ResetGame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, directly after a successful join
    YouAre {
        participant_id: ParticipantId,
        server_now: String,
    },
    /// Join refused; the connection is closed after this message
    JoinRejected {
        reason: String,
    },
    SubmittedOk,
    VoteOk,
    Error {
        code: String,
        msg: String,
    },
    /// Everyone has answered; sent to the whole room before the state update
    RoundOver,
    RoomUpdate(RoomSnapshot),
}

/// Personalized view of a room, sent after every state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub room: RoomCode,
    pub players: Vec<String>,
    pub locked: bool,
    pub host_id: Option<ParticipantId>,
    pub phase: GamePhase,
    pub submitted_count: usize,
    pub total_players: usize,
    pub total_votes: usize,
    pub answer_count: usize,
    pub reveal_count: usize,
    /// Drip-revealed answers during REVEAL (text only, no author or id)
    pub revealed_answers: Vec<RevealedAnswer>,
    /// Anonymous voting options during VOTING and RESULTS
    pub voting_options: Vec<VotingOption>,
    pub results_reveal_count: usize,
    /// Results revealed so far during RESULTS
    pub results: Vec<ResultRow>,
    pub leaderboard: Vec<LeaderboardEntry>,

    // Recipient-specific fields
    pub you: ParticipantId,
    pub is_host: bool,
    pub you_submitted: bool,
    pub you_voted: bool,
    pub your_vote: Option<AnswerId>,
}

/// Answer text as shown during the reveal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevealedAnswer {
    pub text: String,
}

/// Answer as offered for voting (still anonymous)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingOption {
    pub id: AnswerId,
    pub text: String,
}

impl From<&AnswerEntry> for VotingOption {
    fn from(entry: &AnswerEntry) -> Self {
        Self {
            id: entry.id.clone(),
            text: entry.text.clone(),
        }
    }
}

/// Answer with its author and vote count, shown once the host reveals it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub id: AnswerId,
    pub text: String,
    pub vote_count: u32,
    pub author: String,
    pub is_ai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub score: i64,
}
