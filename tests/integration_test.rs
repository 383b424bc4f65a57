use tokio::sync::mpsc::Receiver;
use whodunai::config::ServerConfig;
use whodunai::protocol::{ClientMessage, RoomSnapshot, ServerMessage};
use whodunai::state::registry::RoomRegistry;
use whodunai::state::AppState;
use whodunai::types::{AnswerEntry, AnswerOwner, GamePhase, AI_OWNER_ID};
use whodunai::ws::handlers::handle_text;

const ROOM: &str = "ABCD";

struct Client {
    conn: String,
    rx: Receiver<ServerMessage>,
    id: String,
}

impl Client {
    /// Everything queued for this client so far
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn last_snapshot(&mut self) -> RoomSnapshot {
        self.drain()
            .into_iter()
            .rev()
            .find_map(|msg| match msg {
                ServerMessage::RoomUpdate(snapshot) => Some(snapshot),
                _ => None,
            })
            .expect("Expected a room_update")
    }
}

fn seeded_state() -> AppState {
    let config = ServerConfig::default();
    let registry = RoomRegistry::with_seed(config.room.clone(), 7);
    AppState::with_registry(config, registry)
}

async fn join(state: &AppState, nickname: &str) -> Client {
    let (conn, mut rx) = state.connect().await;
    state
        .handle_message(
            &conn,
            ClientMessage::Join {
                room: ROOM.to_lowercase(),
                nickname: nickname.to_string(),
            },
        )
        .await;
    let id = match rx.try_recv() {
        Ok(ServerMessage::YouAre { participant_id, .. }) => participant_id,
        other => panic!("Expected you_are, got {:?}", other),
    };
    Client { conn, rx, id }
}

async fn send(state: &AppState, client: &Client, msg: ClientMessage) {
    state.handle_message(&client.conn, msg).await;
}

async fn deck(state: &AppState) -> Vec<AnswerEntry> {
    state
        .with_room(ROOM, |room| room.answer_deck.clone())
        .await
        .expect("Room should exist")
}

fn entry_of<'a>(deck: &'a [AnswerEntry], owner: &str) -> &'a AnswerEntry {
    deck.iter()
        .find(|entry| entry.owner.ledger_key() == owner)
        .expect("Owner should have an entry")
}

/// Two players answered, ready for reveal
async fn answered_room(state: &AppState) -> (Client, Client) {
    let mut ann = join(state, "Ann").await;
    let mut bo = join(state, "Bo").await;
    send(state, &ann, ClientMessage::StartGame).await;
    send(state, &ann, ClientMessage::SubmitAnswer { answer: "red".to_string() }).await;
    send(state, &bo, ClientMessage::SubmitAnswer { answer: "blue".to_string() }).await;
    ann.drain();
    bo.drain();
    (ann, bo)
}

/// Two players, all answers revealed, voting open
async fn voting_room(state: &AppState) -> (Client, Client) {
    let (mut ann, mut bo) = answered_room(state).await;
    for _ in 0..3 {
        send(state, &ann, ClientMessage::NextAnswer).await;
    }
    ann.drain();
    bo.drain();
    (ann, bo)
}

#[tokio::test]
async fn test_start_and_answer_builds_deck() {
    let state = seeded_state();
    let mut ann = join(&state, "Ann").await;
    let mut bo = join(&state, "Bo").await;

    send(&state, &ann, ClientMessage::StartGame).await;
    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Answering);
    assert!(snapshot.locked);
    assert_eq!(snapshot.host_id.as_deref(), Some(ann.id.as_str()));
    bo.drain();

    send(&state, &ann, ClientMessage::SubmitAnswer { answer: "red".to_string() }).await;
    let snapshot = bo.last_snapshot();
    assert_eq!(snapshot.submitted_count, 1);
    assert!(!snapshot.you_submitted);
    assert!(ann.last_snapshot().you_submitted);

    send(&state, &bo, ClientMessage::SubmitAnswer { answer: "blue".to_string() }).await;
    let messages = bo.drain();
    let round_over = messages
        .iter()
        .position(|m| matches!(m, ServerMessage::RoundOver))
        .expect("round_over should be broadcast");
    let update = messages
        .iter()
        .position(|m| matches!(m, ServerMessage::RoomUpdate(_)))
        .expect("room_update should follow");
    assert!(round_over < update);

    let deck = deck(&state).await;
    assert_eq!(deck.len(), 3);
    assert_eq!(deck.iter().filter(|e| e.owner.is_ai()).count(), 1);
    assert_eq!(entry_of(&deck, &ann.id).text, "red");
    assert_eq!(entry_of(&deck, &bo.id).text, "blue");

    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Reveal);
    assert_eq!(snapshot.reveal_count, 0);
    assert_eq!(snapshot.answer_count, 3);
    assert!(snapshot.revealed_answers.is_empty());
}

#[tokio::test]
async fn test_paced_reveal_opens_voting() {
    let state = seeded_state();
    let (mut ann, mut bo) = answered_room(&state).await;

    send(&state, &ann, ClientMessage::NextAnswer).await;
    send(&state, &ann, ClientMessage::NextAnswer).await;
    let snapshot = bo.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Reveal);
    assert_eq!(snapshot.revealed_answers.len(), 2);
    assert!(snapshot.voting_options.is_empty());

    // Non-host cannot pace the reveal
    send(&state, &bo, ClientMessage::NextAnswer).await;
    assert!(matches!(
        bo.drain().as_slice(),
        [ServerMessage::Error { code, .. }] if code == "NOT_HOST"
    ));

    send(&state, &ann, ClientMessage::NextAnswer).await;
    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Voting);
    assert_eq!(snapshot.total_votes, 0);
    assert_eq!(snapshot.voting_options.len(), 3);

    let tallies_empty = state
        .with_room(ROOM, |room| room.votes.is_empty() && room.tallies.is_empty())
        .await;
    assert_eq!(tallies_empty, Some(true));
}

#[tokio::test]
async fn test_voting_scores_round() {
    let state = seeded_state();
    let (mut ann, mut bo) = voting_room(&state).await;
    let deck = deck(&state).await;
    let bo_entry = entry_of(&deck, &bo.id).id.clone();
    let ai_entry = entry_of(&deck, AI_OWNER_ID).id.clone();

    send(&state, &ann, ClientMessage::SubmitVote { answer_id: bo_entry.clone() }).await;
    assert!(ann.last_snapshot().you_voted);
    send(&state, &bo, ClientMessage::SubmitVote { answer_id: ai_entry }).await;

    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Results);
    assert_eq!(snapshot.your_vote.as_deref(), Some(bo_entry.as_str()));
    assert!(snapshot.results.is_empty());

    for _ in 0..4 {
        send(&state, &ann, ClientMessage::NextResult).await;
    }
    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.results_reveal_count, 3);
    assert_eq!(snapshot.results.iter().filter(|row| row.is_ai).count(), 1);
    let vote_sum: u32 = snapshot.results.iter().map(|row| row.vote_count).sum();
    assert_eq!(vote_sum, 2);

    let score = |name: &str| {
        snapshot
            .leaderboard
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.score)
    };
    assert_eq!(score("Ann"), Some(-1));
    assert_eq!(score("Bo"), Some(2));
    assert_eq!(score("AI"), Some(1));
    assert_eq!(snapshot.leaderboard[0].name, "Bo");
    bo.drain();
}

#[tokio::test]
async fn test_self_vote_rejected_and_duplicate_vote_acknowledged() {
    let state = seeded_state();
    let (mut ann, mut bo) = voting_room(&state).await;
    let deck = deck(&state).await;
    let own = entry_of(&deck, &ann.id).id.clone();
    let ai_entry = entry_of(&deck, AI_OWNER_ID).id.clone();

    send(&state, &ann, ClientMessage::SubmitVote { answer_id: own }).await;
    match ann.drain().as_slice() {
        [ServerMessage::Error { code, .. }] => assert_eq!(code, "SELF_VOTE_FORBIDDEN"),
        other => panic!("Expected SELF_VOTE_FORBIDDEN, got {:?}", other),
    }
    assert!(bo.drain().is_empty());

    send(&state, &ann, ClientMessage::SubmitVote { answer_id: ai_entry.clone() }).await;
    ann.drain();
    send(&state, &ann, ClientMessage::SubmitVote { answer_id: ai_entry }).await;
    assert_eq!(ann.drain(), vec![ServerMessage::VoteOk]);

    let votes = state.with_room(ROOM, |room| room.votes.len()).await;
    assert_eq!(votes, Some(1));
}

#[tokio::test]
async fn test_departure_completes_voting_and_moves_host() {
    let state = seeded_state();
    let (ann, mut bo) = voting_room(&state).await;
    let deck = deck(&state).await;
    let ann_entry = entry_of(&deck, &ann.id).id.clone();

    send(&state, &bo, ClientMessage::SubmitVote { answer_id: ann_entry }).await;
    assert_eq!(bo.last_snapshot().phase, GamePhase::Voting);

    state.disconnect(&ann.conn).await;

    let snapshot = bo.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Results);
    assert_eq!(snapshot.total_players, 1);
    assert_eq!(snapshot.host_id.as_deref(), Some(bo.id.as_str()));
    assert!(snapshot.is_host);

    // New host can drive the results reveal
    send(&state, &bo, ClientMessage::NextResult).await;
    assert_eq!(bo.last_snapshot().results_reveal_count, 1);
}

#[tokio::test]
async fn test_reset_game_zeroes_scores_and_unlocks() {
    let state = seeded_state();
    let (mut ann, mut bo) = voting_room(&state).await;
    let deck = deck(&state).await;
    let ai_entry = entry_of(&deck, AI_OWNER_ID).id.clone();
    send(&state, &ann, ClientMessage::SubmitVote { answer_id: ai_entry.clone() }).await;
    send(&state, &bo, ClientMessage::SubmitVote { answer_id: ai_entry }).await;
    assert_eq!(ann.last_snapshot().phase, GamePhase::Results);
    bo.drain();

    send(&state, &bo, ClientMessage::ResetGame).await;
    assert!(matches!(
        bo.drain().as_slice(),
        [ServerMessage::Error { code, .. }] if code == "NOT_HOST"
    ));

    send(&state, &ann, ClientMessage::ResetGame).await;
    let snapshot = bo.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Lobby);
    assert!(!snapshot.locked);
    assert!(snapshot.leaderboard.iter().all(|entry| entry.score == 0));

    let scores = state
        .with_room(ROOM, |room| {
            (
                room.score_of(&ann.id),
                room.score_of(&bo.id),
                room.score_of(AI_OWNER_ID),
            )
        })
        .await;
    assert_eq!(scores, Some((0, 0, 0)));
}

#[tokio::test]
async fn test_new_round_keeps_scores() {
    let state = seeded_state();
    let (mut ann, bo) = voting_room(&state).await;
    let deck = deck(&state).await;
    let ai_entry = entry_of(&deck, AI_OWNER_ID).id.clone();
    let ann_entry = entry_of(&deck, &ann.id).id.clone();
    send(&state, &ann, ClientMessage::SubmitVote { answer_id: ai_entry }).await;
    send(&state, &bo, ClientMessage::SubmitVote { answer_id: ann_entry }).await;
    ann.drain();

    send(&state, &ann, ClientMessage::NewRound).await;
    let snapshot = ann.last_snapshot();
    assert_eq!(snapshot.phase, GamePhase::Answering);
    assert!(snapshot.locked);
    assert_eq!(snapshot.submitted_count, 0);
    assert!(snapshot.results.is_empty());

    let ann_score = state.with_room(ROOM, |room| room.score_of(&ann.id)).await;
    assert_eq!(ann_score, Some(2));
}

#[tokio::test]
async fn test_join_rejected_once_locked() {
    let state = seeded_state();
    let ann = join(&state, "Ann").await;
    send(&state, &ann, ClientMessage::StartGame).await;

    let (late, mut rx) = state.connect().await;
    handle_text(&state, &late, r#"{"t":"join","room":"abcd","nickname":"Cy"}"#).await;

    match rx.try_recv() {
        Ok(ServerMessage::JoinRejected { reason }) => assert_eq!(reason, "Game already in progress"),
        other => panic!("Expected join_rejected, got {:?}", other),
    }
    assert!(state.participant_id(&late).await.is_none());
    let count = state.with_room(ROOM, |room| room.participants.len()).await;
    assert_eq!(count, Some(1));
}

#[tokio::test]
async fn test_commands_before_join_are_errors_or_ignored() {
    let state = seeded_state();
    let (conn, mut rx) = state.connect().await;

    handle_text(&state, &conn, r#"{"t":"start_game"}"#).await;
    handle_text(&state, &conn, r#"{"t":"submit_answer","answer":"hi"}"#).await;

    for msg in std::iter::from_fn(|| rx.try_recv().ok()) {
        assert!(
            !matches!(msg, ServerMessage::RoomUpdate(_)),
            "Unjoined connection must not see room state"
        );
    }
    assert_eq!(state.room_count().await, 0);
}

#[tokio::test]
async fn test_views_never_leak_authorship_before_results() {
    let state = seeded_state();
    let (mut ann, mut bo) = answered_room(&state).await;
    for _ in 0..3 {
        send(&state, &ann, ClientMessage::NextAnswer).await;
    }

    for snapshot in [ann.last_snapshot(), bo.last_snapshot()] {
        let json = serde_json::to_string(&ServerMessage::RoomUpdate(snapshot)).unwrap();
        assert!(!json.contains("\"author\""));
        assert!(!json.contains("\"is_ai\""));
    }

    let deck = deck(&state).await;
    assert!(deck
        .iter()
        .any(|entry| matches!(&entry.owner, AnswerOwner::Player(id) if *id == bo.id)));
}

#[tokio::test]
async fn test_last_departure_destroys_room() {
    let state = seeded_state();
    let ann = join(&state, "Ann").await;
    let bo = join(&state, "Bo").await;
    assert_eq!(state.room_count().await, 1);

    state.disconnect(&ann.conn).await;
    assert_eq!(state.room_count().await, 1);
    state.disconnect(&bo.conn).await;
    assert_eq!(state.room_count().await, 0);
    assert_eq!(state.connection_count().await, 0);
}
