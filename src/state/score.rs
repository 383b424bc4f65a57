use crate::types::*;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Points a voter gains for spotting the synthetic answer
pub const SPOTTED_AI_POINTS: i64 = 1;
/// Points a voter loses for picking a human answer
pub const FOOLED_PENALTY: i64 = -1;
/// Points an answer's owner gains for every vote it receives
pub const VOTE_RECEIVED_POINTS: i64 = 1;

/// Count how many votes each answer received
pub fn tally_votes(votes: &IndexMap<ParticipantId, AnswerId>) -> HashMap<AnswerId, u32> {
    let mut tallies: HashMap<AnswerId, u32> = HashMap::new();
    for answer_id in votes.values() {
        *tallies.entry(answer_id.clone()).or_insert(0) += 1;
    }
    tallies
}

/// Apply the score deltas of a closed voting round to the ledger.
///
/// The voter gains a point for picking the AI answer and loses one otherwise.
/// The picked answer's owner, human or AI, always gains a point.
pub fn apply_round_scores(
    deck: &[AnswerEntry],
    votes: &IndexMap<ParticipantId, AnswerId>,
    scores: &mut HashMap<String, i64>,
) {
    for (voter_id, answer_id) in votes {
        let Some(target) = deck.iter().find(|entry| entry.id == *answer_id) else {
            tracing::warn!("Vote by {} for unknown answer {}, skipping", voter_id, answer_id);
            continue;
        };

        let voter_delta = if target.owner.is_ai() {
            SPOTTED_AI_POINTS
        } else {
            FOOLED_PENALTY
        };
        *scores.entry(voter_id.clone()).or_insert(0) += voter_delta;
        *scores
            .entry(target.owner.ledger_key().to_string())
            .or_insert(0) += VOTE_RECEIVED_POINTS;
    }
}
