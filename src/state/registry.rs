//! Room registry and command routing
//!
//! Owns every room of the server, the `connection -> (room, participant)`
//! session table and the random source used for ids and shuffling. All
//! methods are synchronous; callers serialize access.

use super::ids;
use super::room::{Effects, Room};
use super::view;
use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// A message addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub connection_id: ConnectionId,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn new(connection_id: impl Into<ConnectionId>, message: ServerMessage) -> Self {
        Self {
            connection_id: connection_id.into(),
            message,
        }
    }
}

/// Where a joined connection lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_code: RoomCode,
    pub participant_id: ParticipantId,
}

pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    sessions: HashMap<ConnectionId, Session>,
    settings: RoomSettings,
    rng: StdRng,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Deterministic registry for tests
    pub fn with_seed(settings: RoomSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: RoomSettings, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            settings,
            rng,
        }
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session(&self, connection_id: &str) -> Option<&Session> {
        self.sessions.get(connection_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Canonical form of a room code, or None if nothing usable is left
    pub fn normalize_room_code(&self, raw: &str) -> Option<RoomCode> {
        let code = clamp_text(raw, self.settings.max_room_code_chars).to_uppercase();
        (!code.is_empty()).then_some(code)
    }

    fn normalize_nickname(&self, raw: &str) -> String {
        let nickname = clamp_text(raw, self.settings.max_nickname_chars);
        if nickname.is_empty() {
            DEFAULT_NICKNAME.to_string()
        } else {
            nickname
        }
    }

    /// Route one inbound command and return everything that must be sent
    pub fn handle(&mut self, connection_id: &str, msg: ClientMessage) -> Vec<Envelope> {
        let session = match self.sessions.get(connection_id) {
            Some(session) => session.clone(),
            None => {
                return match msg {
                    ClientMessage::Join { room, nickname } => {
                        self.join(connection_id, &room, &nickname)
                    }
                    other => {
                        tracing::debug!(
                            "Dropping {:?} from connection {} that has not joined",
                            other,
                            connection_id
                        );
                        Vec::new()
                    }
                };
            }
        };

        let room = match self.rooms.get_mut(&session.room_code) {
            Some(room) => room,
            None => {
                tracing::warn!(
                    "Session of {} points at missing room {}",
                    connection_id,
                    session.room_code
                );
                return Vec::new();
            }
        };
        let participant_id = session.participant_id.as_str();

        let result = match msg {
            ClientMessage::Join { .. } => {
                tracing::debug!("Connection {} already joined, ignoring", connection_id);
                return Vec::new();
            }
            ClientMessage::StartGame => room.start_game(participant_id),
            ClientMessage::SubmitAnswer { answer } => {
                room.submit_answer(participant_id, &answer, &mut self.rng)
            }
            ClientMessage::NextAnswer => room.reveal_next(participant_id),
            ClientMessage::SubmitVote { answer_id } => room.submit_vote(participant_id, &answer_id),
            ClientMessage::NextResult => room.reveal_next_result(participant_id),
            ClientMessage::NewRound => room.new_round(participant_id),
            ClientMessage::ResetGame => room.reset_game(participant_id),
        };

        route(room, connection_id, result)
    }

    /// Get-or-create the room and add the connection to it
    fn join(&mut self, connection_id: &str, raw_room: &str, raw_nickname: &str) -> Vec<Envelope> {
        let code = match self.normalize_room_code(raw_room) {
            Some(code) => code,
            None => {
                tracing::debug!("Dropping join with empty room code from {}", connection_id);
                return Vec::new();
            }
        };
        let nickname = self.normalize_nickname(raw_nickname);

        let settings = &self.settings;
        let room = self.rooms.entry(code.clone()).or_insert_with(|| {
            tracing::info!("Creating room {}", code);
            Room::new(code.clone(), settings.clone())
        });

        let participant_id =
            ids::generate_unique_token(&mut self.rng, ids::PARTICIPANT_ID_LENGTH, |id| {
                id == AI_OWNER_ID || room.participants.contains_key(id)
            });
        let participant = Participant {
            id: participant_id.clone(),
            nickname,
            connection_id: connection_id.to_string(),
        };

        match room.join(participant) {
            Ok(effects) => {
                self.sessions.insert(
                    connection_id.to_string(),
                    Session {
                        room_code: code,
                        participant_id,
                    },
                );
                route(room, connection_id, Ok(effects))
            }
            Err(RoomError::RoomLocked) => {
                tracing::info!("Rejected join to locked room {}", code);
                vec![Envelope::new(
                    connection_id,
                    ServerMessage::JoinRejected {
                        reason: RoomError::RoomLocked.to_string(),
                    },
                )]
            }
            Err(e) => route(room, connection_id, Err(e)),
        }
    }

    /// Forget a closed connection. Destroys its room when it was the last member.
    pub fn disconnect(&mut self, connection_id: &str) -> Vec<Envelope> {
        let session = match self.sessions.remove(connection_id) {
            Some(session) => session,
            None => return Vec::new(),
        };

        let room = match self.rooms.get_mut(&session.room_code) {
            Some(room) => room,
            None => return Vec::new(),
        };
        let effects = room.disconnect(&session.participant_id);

        if room.is_empty() {
            self.rooms.remove(&session.room_code);
            tracing::info!("Room {} closed (last participant left)", session.room_code);
            return Vec::new();
        }

        route(room, connection_id, Ok(effects))
    }
}

/// Turn the outcome of a room operation into addressed messages.
///
/// Order: reply to the sender, then room-wide notices, then one snapshot per participant.
fn route(room: &Room, sender: &str, result: Result<Effects, RoomError>) -> Vec<Envelope> {
    let effects = match result {
        Ok(effects) => effects,
        Err(e) => {
            tracing::warn!("Room {}: command from {} rejected: {}", room.code, sender, e);
            return vec![Envelope::new(
                sender,
                ServerMessage::Error {
                    code: e.code().to_string(),
                    msg: e.to_string(),
                },
            )];
        }
    };

    let mut envelopes = Vec::new();
    if let Some(reply) = effects.reply {
        envelopes.push(Envelope::new(sender, reply));
    }
    for notice in effects.notices {
        for participant in room.participants.values() {
            envelopes.push(Envelope::new(
                participant.connection_id.clone(),
                notice.clone(),
            ));
        }
    }
    if effects.broadcast {
        for (connection_id, snapshot) in view::render_for_all(room) {
            envelopes.push(Envelope::new(
                connection_id,
                ServerMessage::RoomUpdate(snapshot),
            ));
        }
    }
    envelopes
}
