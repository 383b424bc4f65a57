//! Personalized room snapshots
//!
//! Hidden data is gated by phase: authorship and vote counts only appear in
//! RESULTS, one row at a time as the host reveals them.

use super::room::Room;
use crate::protocol::{LeaderboardEntry, ResultRow, RevealedAnswer, RoomSnapshot, VotingOption};
use crate::types::*;

/// Render the room as seen by one participant
pub fn render(room: &Room, participant_id: &str) -> RoomSnapshot {
    personalize(shared_snapshot(room), room, participant_id)
}

/// Render one snapshot per connected participant, addressed by connection
pub fn render_for_all(room: &Room) -> Vec<(ConnectionId, RoomSnapshot)> {
    room.participants
        .values()
        .map(|p| (p.connection_id.clone(), render(room, &p.id)))
        .collect()
}

/// Everything that is identical for the whole room
fn shared_snapshot(room: &Room) -> RoomSnapshot {
    let revealed_answers = if room.phase == GamePhase::Reveal {
        room.answer_deck
            .iter()
            .take(room.reveal_count)
            .map(|entry| RevealedAnswer {
                text: entry.text.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let voting_options = match room.phase {
        GamePhase::Voting | GamePhase::Results => {
            room.answer_deck.iter().map(VotingOption::from).collect()
        }
        _ => Vec::new(),
    };

    let results = if room.phase == GamePhase::Results {
        room.answer_deck
            .iter()
            .take(room.results_reveal_count)
            .map(|entry| ResultRow {
                id: entry.id.clone(),
                text: entry.text.clone(),
                vote_count: room.tallies.get(&entry.id).copied().unwrap_or(0),
                author: entry.nickname_snapshot.clone(),
                is_ai: entry.owner.is_ai(),
            })
            .collect()
    } else {
        Vec::new()
    };

    RoomSnapshot {
        room: room.code.clone(),
        players: room
            .participants
            .values()
            .map(|p| p.nickname.clone())
            .collect(),
        locked: room.locked,
        host_id: room.host_id.clone(),
        phase: room.phase,
        submitted_count: room.submissions.len(),
        total_players: room.participants.len(),
        total_votes: room.votes.len(),
        answer_count: room.answer_deck.len(),
        reveal_count: room.reveal_count,
        revealed_answers,
        voting_options,
        results_reveal_count: room.results_reveal_count,
        results,
        leaderboard: leaderboard(room),
        you: String::new(),
        is_host: false,
        you_submitted: false,
        you_voted: false,
        your_vote: None,
    }
}

fn personalize(mut snapshot: RoomSnapshot, room: &Room, participant_id: &str) -> RoomSnapshot {
    snapshot.you = participant_id.to_string();
    snapshot.is_host = room.is_host(participant_id);
    snapshot.you_submitted = room.submissions.contains_key(participant_id);
    snapshot.your_vote = room.votes.get(participant_id).cloned();
    snapshot.you_voted = snapshot.your_vote.is_some();
    snapshot
}

/// Connected participants plus the AI, highest score first.
/// Departed participants keep their ledger entry but are not listed.
pub fn leaderboard(room: &Room) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = room
        .participants
        .values()
        .map(|p| LeaderboardEntry {
            id: p.id.clone(),
            name: p.nickname.clone(),
            score: room.score_of(&p.id),
        })
        .collect();
    entries.push(LeaderboardEntry {
        id: AI_OWNER_ID.to_string(),
        name: AI_DISPLAY_NAME.to_string(),
        score: room.score_of(AI_OWNER_ID),
    });

    // Stable sort keeps join order among ties
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}
