use serde::{Deserialize, Serialize};

/// Opaque ID types for readability
pub type ParticipantId = String;
pub type AnswerId = String;
pub type ConnectionId = String;
pub type RoomCode = String;

/// Ledger key of the synthetic answer's pseudo-participant
pub const AI_OWNER_ID: &str = "AI";

/// Display name used for the synthetic answer on the leaderboard and in results
pub const AI_DISPLAY_NAME: &str = "AI";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Lobby,
    Answering,
    Reveal,
    Voting,
    Results,
}

/// A connected member of a room. Lives exactly as long as its connection.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
    /// Connection that receives this participant's messages
    pub connection_id: ConnectionId,
}

/// One participant's answer for the current round
#[derive(Debug, Clone)]
pub struct Submission {
    pub nickname: String,
    pub text: String,
}

/// Who wrote an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOwner {
    Player(ParticipantId),
    Ai,
}

impl AnswerOwner {
    /// Key of this owner in the score ledger
    pub fn ledger_key(&self) -> &str {
        match self {
            AnswerOwner::Player(id) => id,
            AnswerOwner::Ai => AI_OWNER_ID,
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, AnswerOwner::Ai)
    }

    pub fn is_participant(&self, participant_id: &str) -> bool {
        matches!(self, AnswerOwner::Player(id) if id == participant_id)
    }
}

/// An entry of the round's shuffled answer deck. Never mutated after the deck is built.
#[derive(Debug, Clone)]
pub struct AnswerEntry {
    pub id: AnswerId,
    pub owner: AnswerOwner,
    pub nickname_snapshot: String,
    pub text: String,
}

/// Room-level limits and fixed content, derived from the server config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    pub max_nickname_chars: usize,
    pub max_answer_chars: usize,
    pub max_room_code_chars: usize,
    pub ai_answer_text: String,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_nickname_chars: 20,
            max_answer_chars: 280,
            max_room_code_chars: 8,
            ai_answer_text: DEFAULT_AI_ANSWER_TEXT.to_string(),
        }
    }
}

/// Placeholder text of the synthetic answer injected into every round
pub const DEFAULT_AI_ANSWER_TEXT: &str =
    "As a large language model, I find this question deeply fascinating.";

/// Fallback nickname for participants who join with a blank name
pub const DEFAULT_NICKNAME: &str = "Player";

/// Trim and cap free text to at most `max_chars` characters
pub fn clamp_text(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect::<String>().trim_end().to_string()
}
