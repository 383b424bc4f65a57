use crate::types::*;
use indexmap::IndexMap;

/// Decide who holds host privileges after membership changed.
///
/// A host that is still connected keeps the role. Otherwise it passes to the
/// longest-connected member, which is the first entry in join order.
pub fn next_host(
    current: Option<&str>,
    participants: &IndexMap<ParticipantId, Participant>,
) -> Option<ParticipantId> {
    match current {
        Some(id) if participants.contains_key(id) => Some(id.to_string()),
        _ => participants.keys().next().cloned(),
    }
}
