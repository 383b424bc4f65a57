//! Room entity and its state machine
//!
//! Every operation validates first and mutates second, so a rejected command
//! leaves the room untouched. Operations report what should be sent through
//! [`Effects`]; rendering and delivery happen in the registry.

use super::{host, ids, score};
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Outbound consequences of a successful room operation
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Effects {
    /// Direct answer to the participant that issued the command
    pub reply: Option<ServerMessage>,
    /// Notices for every participant, delivered ahead of the state update
    pub notices: Vec<ServerMessage>,
    /// Whether every participant gets a fresh personalized snapshot
    pub broadcast: bool,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn broadcast() -> Self {
        Self {
            broadcast: true,
            ..Self::default()
        }
    }

    pub fn reply(msg: ServerMessage) -> Self {
        Self {
            reply: Some(msg),
            ..Self::default()
        }
    }

    pub fn with_reply(mut self, msg: ServerMessage) -> Self {
        self.reply = Some(msg);
        self
    }

    pub fn with_notice(mut self, msg: ServerMessage) -> Self {
        self.notices.push(msg);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub phase: GamePhase,
    /// Set once the host starts the game; blocks new joins
    pub locked: bool,
    pub host_id: Option<ParticipantId>,
    /// Connected participants in join order
    pub participants: IndexMap<ParticipantId, Participant>,
    pub submissions: IndexMap<ParticipantId, Submission>,
    pub answer_deck: Vec<AnswerEntry>,
    pub reveal_count: usize,
    pub votes: IndexMap<ParticipantId, AnswerId>,
    pub tallies: HashMap<AnswerId, u32>,
    pub results_reveal_count: usize,
    /// Persistent score ledger keyed by participant id or [`AI_OWNER_ID`]
    pub scores: HashMap<String, i64>,
    settings: RoomSettings,
}

impl Room {
    pub fn new(code: RoomCode, settings: RoomSettings) -> Self {
        let mut room = Self {
            code,
            phase: GamePhase::Lobby,
            locked: false,
            host_id: None,
            participants: IndexMap::new(),
            submissions: IndexMap::new(),
            answer_deck: Vec::new(),
            reveal_count: 0,
            votes: IndexMap::new(),
            tallies: HashMap::new(),
            results_reveal_count: 0,
            scores: HashMap::new(),
            settings,
        };
        room.ensure_score(AI_OWNER_ID);
        room
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_host(&self, participant_id: &str) -> bool {
        self.host_id.as_deref() == Some(participant_id)
    }

    pub fn score_of(&self, owner_id: &str) -> i64 {
        self.scores.get(owner_id).copied().unwrap_or(0)
    }

    fn require_host(&self, participant_id: &str, action: &'static str) -> Result<(), RoomError> {
        if self.is_host(participant_id) {
            Ok(())
        } else {
            Err(RoomError::NotHost(action))
        }
    }

    fn ensure_score(&mut self, owner_id: &str) {
        self.scores.entry(owner_id.to_string()).or_insert(0);
    }

    /// Answering closes once the submission count reaches the connected count.
    /// Submissions of departed participants still count.
    fn answering_complete(&self) -> bool {
        !self.participants.is_empty() && self.submissions.len() >= self.participants.len()
    }

    /// Same count rule as [`Self::answering_complete`], applied to votes
    fn voting_complete(&self) -> bool {
        !self.participants.is_empty() && self.votes.len() >= self.participants.len()
    }

    fn clear_round(&mut self) {
        self.submissions.clear();
        self.answer_deck.clear();
        self.reveal_count = 0;
        self.votes.clear();
        self.tallies.clear();
        self.results_reveal_count = 0;
    }

    /// Add a participant. Takes the host role if nobody holds it.
    pub fn join(&mut self, participant: Participant) -> Result<Effects, RoomError> {
        if self.locked {
            return Err(RoomError::RoomLocked);
        }

        let participant_id = participant.id.clone();
        tracing::info!(
            "{} joined room {} as {}",
            participant.nickname,
            self.code,
            participant_id
        );
        self.participants
            .insert(participant_id.clone(), participant);
        self.host_id = host::next_host(self.host_id.as_deref(), &self.participants);
        self.ensure_score(&participant_id);
        self.ensure_score(AI_OWNER_ID);

        Ok(Effects::broadcast().with_reply(ServerMessage::YouAre {
            participant_id,
            server_now: chrono::Utc::now().to_rfc3339(),
        }))
    }

    pub fn start_game(&mut self, participant_id: &str) -> Result<Effects, RoomError> {
        self.require_host(participant_id, "start the game")?;
        if self.phase != GamePhase::Lobby {
            tracing::debug!("Ignoring start_game in room {} ({:?})", self.code, self.phase);
            return Ok(Effects::none());
        }

        tracing::info!("Room {} started the game", self.code);
        self.locked = true;
        self.phase = GamePhase::Answering;
        self.clear_round();
        Ok(Effects::broadcast())
    }

    pub fn submit_answer<R: Rng + ?Sized>(
        &mut self,
        participant_id: &str,
        text: &str,
        rng: &mut R,
    ) -> Result<Effects, RoomError> {
        if self.phase != GamePhase::Answering || !self.locked {
            return Err(RoomError::GameNotStarted);
        }

        let text = clamp_text(text, self.settings.max_answer_chars);
        if text.is_empty() {
            return Ok(Effects::none());
        }
        if self.submissions.contains_key(participant_id) {
            return Ok(Effects::reply(ServerMessage::SubmittedOk));
        }

        let nickname = match self.participants.get(participant_id) {
            Some(p) => p.nickname.clone(),
            None => return Ok(Effects::none()),
        };
        self.submissions
            .insert(participant_id.to_string(), Submission { nickname, text });
        tracing::debug!(
            "Room {}: {}/{} answers in",
            self.code,
            self.submissions.len(),
            self.participants.len()
        );

        if self.answering_complete() {
            self.close_answering(rng);
            return Ok(Effects::broadcast().with_notice(ServerMessage::RoundOver));
        }
        Ok(Effects::broadcast())
    }

    /// Build the shuffled deck from all submissions plus the AI entry and open the reveal
    fn close_answering<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut deck: Vec<AnswerEntry> = Vec::with_capacity(self.submissions.len() + 1);
        for (owner_id, submission) in &self.submissions {
            push_entry(
                &mut deck,
                &mut *rng,
                AnswerOwner::Player(owner_id.clone()),
                &submission.nickname,
                &submission.text,
            );
        }
        push_entry(
            &mut deck,
            &mut *rng,
            AnswerOwner::Ai,
            AI_DISPLAY_NAME,
            &self.settings.ai_answer_text,
        );
        deck.shuffle(rng);

        tracing::info!(
            "Room {} closed answering with {} answers",
            self.code,
            deck.len()
        );
        self.answer_deck = deck;
        self.reveal_count = 0;
        self.votes.clear();
        self.tallies.clear();
        self.results_reveal_count = 0;
        self.phase = GamePhase::Reveal;
    }

    pub fn reveal_next(&mut self, participant_id: &str) -> Result<Effects, RoomError> {
        self.require_host(participant_id, "reveal answers")?;
        if self.phase != GamePhase::Reveal {
            return Ok(Effects::none());
        }

        if self.reveal_count < self.answer_deck.len() {
            self.reveal_count += 1;
            if self.reveal_count == self.answer_deck.len() {
                tracing::info!("Room {} opened voting", self.code);
                self.phase = GamePhase::Voting;
                self.votes.clear();
                self.tallies.clear();
            }
        }
        Ok(Effects::broadcast())
    }

    pub fn submit_vote(
        &mut self,
        participant_id: &str,
        answer_id: &str,
    ) -> Result<Effects, RoomError> {
        if self.phase != GamePhase::Voting {
            return Err(RoomError::VotingNotActive);
        }
        if self.votes.contains_key(participant_id) {
            return Ok(Effects::reply(ServerMessage::VoteOk));
        }

        let target = match self.answer_deck.iter().find(|entry| entry.id == answer_id) {
            Some(entry) => entry,
            None => {
                tracing::debug!("Room {}: vote for unknown answer {}", self.code, answer_id);
                return Ok(Effects::none());
            }
        };
        if target.owner.is_participant(participant_id) {
            return Err(RoomError::SelfVoteForbidden);
        }

        self.votes
            .insert(participant_id.to_string(), answer_id.to_string());
        if self.voting_complete() {
            self.close_voting();
        }
        Ok(Effects::broadcast())
    }

    /// Tally, score and open the results
    fn close_voting(&mut self) {
        self.tallies = score::tally_votes(&self.votes);
        score::apply_round_scores(&self.answer_deck, &self.votes, &mut self.scores);
        self.results_reveal_count = 0;
        self.phase = GamePhase::Results;
        tracing::info!(
            "Room {} closed voting with {} votes",
            self.code,
            self.votes.len()
        );
    }

    pub fn reveal_next_result(&mut self, participant_id: &str) -> Result<Effects, RoomError> {
        self.require_host(participant_id, "reveal results")?;
        if self.phase != GamePhase::Results || self.results_reveal_count >= self.answer_deck.len()
        {
            return Ok(Effects::none());
        }

        self.results_reveal_count += 1;
        Ok(Effects::broadcast())
    }

    /// Back to answering with scores and the lock kept
    pub fn new_round(&mut self, participant_id: &str) -> Result<Effects, RoomError> {
        self.require_host(participant_id, "start a new round")?;
        if !self.locked {
            return Err(RoomError::GameNotStarted);
        }

        tracing::info!("Room {} started a new round", self.code);
        self.phase = GamePhase::Answering;
        self.clear_round();
        Ok(Effects::broadcast())
    }

    /// Back to an unlocked lobby with every score zeroed
    pub fn reset_game(&mut self, participant_id: &str) -> Result<Effects, RoomError> {
        self.require_host(participant_id, "reset the game")?;

        tracing::info!("Room {} reset", self.code);
        self.locked = false;
        self.phase = GamePhase::Lobby;
        self.clear_round();
        self.scores.clear();
        let ids: Vec<ParticipantId> = self.participants.keys().cloned().collect();
        for id in ids {
            self.ensure_score(&id);
        }
        self.ensure_score(AI_OWNER_ID);
        Ok(Effects::broadcast())
    }

    /// Drop a participant. The score entry stays in the ledger.
    ///
    /// A departure can complete voting for everyone left behind, in which case
    /// the round is scored right away.
    pub fn disconnect(&mut self, participant_id: &str) -> Effects {
        let removed = match self.participants.shift_remove(participant_id) {
            Some(p) => p,
            None => return Effects::none(),
        };
        tracing::info!("{} left room {}", removed.nickname, self.code);

        self.host_id = host::next_host(self.host_id.as_deref(), &self.participants);
        if self.participants.is_empty() {
            return Effects::none();
        }

        if self.phase == GamePhase::Voting && self.voting_complete() {
            tracing::info!("Room {}: departure completed voting", self.code);
            self.close_voting();
        }
        Effects::broadcast()
    }
}

/// Append an entry with an id that is unique within the deck
fn push_entry<R: Rng + ?Sized>(
    deck: &mut Vec<AnswerEntry>,
    rng: &mut R,
    owner: AnswerOwner,
    nickname: &str,
    text: &str,
) {
    let id = ids::generate_unique_token(rng, ids::ANSWER_ID_LENGTH, |candidate| {
        deck.iter().any(|entry| entry.id == candidate)
    });
    deck.push(AnswerEntry {
        id,
        owner,
        nickname_snapshot: nickname.to_string(),
        text: text.to_string(),
    });
}
