//! Integration tests for the session registry and per-chat actors.
//!
//! Drives complete games through `SessionRegistry::dispatch`: lobby, clue
//! rounds, voting, tiebreaks, guesses, aborts, result delivery and the
//! isolation of concurrent chats.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use word_impostor::{
    Audience, ChatId, Content, DisplayIntent, EndReason, EngineEvent, ErrorKind, InboundEvent,
    InMemoryStatsStore, Outcome, Phase, PlayerId, RegistryConfig, SessionError,
    SessionRegistry, SessionResult, SessionSettings, StaticSettingsProvider, Winner,
    deck::WordBank,
    settings::{SettingsError, SettingsProvider},
};

/// Helper to create a registry backed by the built-in decks
fn setup_registry() -> (Arc<SessionRegistry>, Arc<InMemoryStatsStore>) {
    let store = Arc::new(InMemoryStatsStore::new());
    let registry = SessionRegistry::new(
        Arc::new(WordBank::builtin()),
        store.clone(),
        RegistryConfig::default(),
    );
    (Arc::new(registry), store)
}

async fn send(
    registry: &SessionRegistry,
    chat_id: ChatId,
    player_id: PlayerId,
    event: EngineEvent,
) -> SessionResult<Vec<DisplayIntent>> {
    registry
        .dispatch(InboundEvent::new(chat_id, player_id, event))
        .await
}

fn join_event(player_id: PlayerId) -> EngineEvent {
    EngineEvent::Join {
        display_name: format!("player{player_id}"),
    }
}

/// A started game and the roles learned through word reveals
struct Game {
    impostor: PlayerId,
    defenders: Vec<PlayerId>,
    common: String,
}

/// Helper to create, fill and start a game, then identify the impostor
async fn setup_game(registry: &SessionRegistry, chat_id: ChatId, players: i64) -> Game {
    registry
        .create(chat_id, SessionSettings::default())
        .await
        .unwrap();
    for id in 1..=players {
        send(registry, chat_id, id, join_event(id)).await.unwrap();
    }
    send(registry, chat_id, 1, EngineEvent::Start).await.unwrap();

    let mut words: HashMap<PlayerId, String> = HashMap::new();
    for id in 1..=players {
        let intents = send(registry, chat_id, id, EngineEvent::RevealWordQuery)
            .await
            .unwrap();
        match &intents[0].content {
            Content::WordReveal { word } => {
                words.insert(id, word.clone());
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words.values() {
        *counts.entry(word.as_str()).or_default() += 1;
    }
    let impostor = *words
        .iter()
        .find(|(_, w)| counts[w.as_str()] == 1)
        .map(|(id, _)| id)
        .unwrap();
    let common = words
        .values()
        .find(|w| counts[w.as_str()] > 1)
        .cloned()
        .unwrap();
    let mut defenders: Vec<PlayerId> = (1..=players).filter(|id| *id != impostor).collect();
    defenders.sort_unstable();

    Game {
        impostor,
        defenders,
        common,
    }
}

/// Helper to let every current turn holder give a clue until voting opens
async fn give_clues(registry: &SessionRegistry, chat_id: ChatId) {
    loop {
        let snapshot = registry.snapshot(chat_id).await.unwrap();
        let Some(holder) = snapshot.turn_holder else {
            break;
        };
        send(
            registry,
            chat_id,
            holder,
            EngineEvent::SubmitClue {
                text: format!("clue from {holder}"),
            },
        )
        .await
        .unwrap();
    }
}

async fn vote(
    registry: &SessionRegistry,
    chat_id: ChatId,
    voter: PlayerId,
    target: PlayerId,
) -> SessionResult<Vec<DisplayIntent>> {
    send(registry, chat_id, voter, EngineEvent::CastVote { target }).await
}

fn game_over(intents: &[DisplayIntent]) -> Option<&word_impostor::GameResult> {
    intents.iter().find_map(|i| match &i.content {
        Content::GameOver { result } => Some(result.as_ref()),
        _ => None,
    })
}

#[tokio::test]
async fn test_defenders_catch_impostor() {
    let (registry, store) = setup_registry();
    let game = setup_game(&registry, 1, 5).await;

    give_clues(&registry, 1).await;
    assert_eq!(registry.snapshot(1).await.unwrap().phase, Phase::Voting);

    for defender in &game.defenders {
        vote(&registry, 1, *defender, game.impostor).await.unwrap();
    }
    let intents = vote(&registry, 1, game.impostor, game.defenders[0])
        .await
        .unwrap();

    let result = game_over(&intents).expect("game over intent");
    assert_eq!(result.winner, Some(Winner::Defenders));
    assert_eq!(result.reason, EndReason::ImpostorEliminated);
    for defender in &game.defenders {
        let player = result.player(*defender).unwrap();
        assert_eq!(player.outcome, Outcome::Win);
        assert_eq!(player.score_delta, 2);
    }
    assert_eq!(result.player(game.impostor).unwrap().score_delta, 0);

    // Unregistered before dispatch returned
    assert!(registry.get(1).await.is_none());
    assert_eq!(store.result_count().await, 1);
}

#[tokio::test]
async fn test_impostor_outlasts_defenders() {
    let (registry, store) = setup_registry();
    let game = setup_game(&registry, 2, 4).await;
    let [d1, d2, d3] = [game.defenders[0], game.defenders[1], game.defenders[2]];

    give_clues(&registry, 2).await;
    vote(&registry, 2, game.impostor, d1).await.unwrap();
    vote(&registry, 2, d2, d1).await.unwrap();
    vote(&registry, 2, d3, d1).await.unwrap();
    let intents = vote(&registry, 2, d1, d2).await.unwrap();
    assert!(intents.iter().any(|i| matches!(
        i.content,
        Content::PlayerEliminated { player, was_impostor: false, votes: 3 } if player == d1
    )));

    let snapshot = registry.snapshot(2).await.unwrap();
    assert_eq!(snapshot.phase, Phase::ClueRound);
    assert_eq!(snapshot.round, 2);

    // Eliminated players can no longer vote
    give_clues(&registry, 2).await;
    assert_eq!(
        vote(&registry, 2, d1, d2).await.unwrap_err(),
        SessionError::PlayerEliminated(d1)
    );

    vote(&registry, 2, game.impostor, d2).await.unwrap();
    vote(&registry, 2, d3, d2).await.unwrap();
    let intents = vote(&registry, 2, d2, d3).await.unwrap();

    let result = game_over(&intents).expect("game over intent");
    assert_eq!(result.winner, Some(Winner::Impostor));
    assert_eq!(result.reason, EndReason::ImpostorSurvived);
    assert_eq!(result.player(game.impostor).unwrap().score_delta, 3);
    assert_eq!(result.total_score(), 3);

    store.reload_sorted_players().await;
    let board = store.leaderboard(1).await;
    assert_eq!(board[0].player_id, game.impostor);
}

#[tokio::test]
async fn test_tiebreak_restricts_votes_to_tied_players() {
    let (registry, _) = setup_registry();
    let game = setup_game(&registry, 3, 4).await;
    let [d1, d2, d3] = [game.defenders[0], game.defenders[1], game.defenders[2]];

    give_clues(&registry, 3).await;
    vote(&registry, 3, d1, game.impostor).await.unwrap();
    vote(&registry, 3, d2, game.impostor).await.unwrap();
    vote(&registry, 3, game.impostor, d1).await.unwrap();
    let intents = vote(&registry, 3, d3, d1).await.unwrap();
    assert!(
        intents
            .iter()
            .any(|i| matches!(i.content, Content::TiebreakStarted { .. }))
    );

    let snapshot = registry.snapshot(3).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Tiebreak);
    let mut tied = vec![d1, game.impostor];
    tied.sort_unstable();
    assert_eq!(snapshot.candidates, tied);

    // Only the tied players give clues
    let holder = snapshot.turn_holder.unwrap();
    assert!(tied.contains(&holder));
    give_clues(&registry, 3).await;

    // Only the tied players vote, and only on each other
    let snapshot = registry.snapshot(3).await.unwrap();
    assert_eq!(snapshot.pending_voters, tied);
    assert_eq!(
        vote(&registry, 3, d2, d1).await.unwrap_err(),
        SessionError::NotAVoter(d2)
    );
    assert_eq!(
        vote(&registry, 3, d1, d3).await.unwrap_err(),
        SessionError::InvalidVoteTarget(d3)
    );

    // The pair ties again: nobody leaves and the next round starts
    vote(&registry, 3, d1, game.impostor).await.unwrap();
    let intents = vote(&registry, 3, game.impostor, d1).await.unwrap();
    assert!(game_over(&intents).is_none());
    assert!(
        intents
            .iter()
            .any(|i| matches!(i.content, Content::NoElimination { .. }))
    );
    let snapshot = registry.snapshot(3).await.unwrap();
    assert_eq!(snapshot.phase, Phase::ClueRound);
    assert_eq!(snapshot.round, 2);
    assert!(snapshot.players.iter().all(|p| p.alive));
}

#[tokio::test]
async fn test_correct_guess_ends_game_mid_vote() {
    let (registry, _) = setup_registry();
    let game = setup_game(&registry, 4, 3).await;

    give_clues(&registry, 4).await;
    vote(&registry, 4, game.defenders[0], game.impostor)
        .await
        .unwrap();

    // A wrong guess changes nothing
    let intents = send(
        &registry,
        4,
        game.defenders[1],
        EngineEvent::SubmitGuess {
            text: "definitely not it".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(intents.is_empty());

    let intents = send(
        &registry,
        4,
        game.defenders[1],
        EngineEvent::SubmitGuess {
            text: format!("  {}  ", game.common),
        },
    )
    .await
    .unwrap();
    let result = game_over(&intents).expect("game over intent");
    assert_eq!(
        result.reason,
        EndReason::WordGuessed {
            by: game.defenders[1]
        }
    );
    assert!(registry.get(4).await.is_none());
}

#[tokio::test]
async fn test_abort_mid_vote_emits_single_neutral_result() {
    let (registry, store) = setup_registry();
    let game = setup_game(&registry, 5, 4).await;

    give_clues(&registry, 5).await;
    vote(&registry, 5, game.defenders[0], game.impostor)
        .await
        .unwrap();

    let intents = send(&registry, 5, game.defenders[1], EngineEvent::Abort)
        .await
        .unwrap();
    let result = game_over(&intents).expect("game over intent");
    assert!(result.is_aborted());
    assert!(result.players.iter().all(|p| p.score_delta == 0));
    assert!(result.players.iter().all(|p| p.outcome == Outcome::Aborted));

    assert!(registry.get(5).await.is_none());
    assert_eq!(
        vote(&registry, 5, game.defenders[2], game.impostor)
            .await
            .unwrap_err(),
        SessionError::NoActiveSession(5)
    );
    assert_eq!(store.result_count().await, 1);
}

#[tokio::test]
async fn test_abort_mid_tiebreak_emits_single_result() {
    let (registry, store) = setup_registry();
    let game = setup_game(&registry, 11, 4).await;
    let [d1, d2, d3] = [game.defenders[0], game.defenders[1], game.defenders[2]];

    give_clues(&registry, 11).await;
    vote(&registry, 11, d1, game.impostor).await.unwrap();
    vote(&registry, 11, d2, game.impostor).await.unwrap();
    vote(&registry, 11, game.impostor, d1).await.unwrap();
    vote(&registry, 11, d3, d1).await.unwrap();
    give_clues(&registry, 11).await;
    vote(&registry, 11, d1, game.impostor).await.unwrap();
    assert_eq!(registry.snapshot(11).await.unwrap().phase, Phase::Tiebreak);

    // An observer of the tiebreak may still abort it
    let intents = send(&registry, 11, d3, EngineEvent::Abort).await.unwrap();
    let result = game_over(&intents).expect("game over intent");
    assert_eq!(result.reason, EndReason::Aborted { by: d3 });
    assert!(result.players.iter().all(|p| p.score_delta == 0));

    assert!(registry.get(11).await.is_none());
    assert_eq!(
        vote(&registry, 11, game.impostor, d1).await.unwrap_err(),
        SessionError::NoActiveSession(11)
    );
    assert_eq!(store.result_count().await, 1);
    assert_eq!(store.chat_stats(11).await.aborted, 1);
}

#[tokio::test]
async fn test_next_game_notice_and_migration() {
    let (registry, store) = setup_registry();
    let game = setup_game(&registry, -12, 3).await;
    registry.subscribe_next_game(-12, 50).await;
    registry.subscribe_next_game(-12, game.impostor).await;

    // The chat is upgraded mid-game
    registry.migrate(-12, -10012).await.unwrap();
    give_clues(&registry, -10012).await;
    for defender in &game.defenders {
        vote(&registry, -10012, *defender, game.impostor)
            .await
            .unwrap();
    }
    let intents = vote(&registry, -10012, game.impostor, game.defenders[0])
        .await
        .unwrap();
    let result = game_over(&intents).expect("game over intent");
    assert_eq!(result.chat_id, -10012);
    assert_eq!(store.chat_stats(-10012).await.defender_wins, 1);
    assert_eq!(registry.recent_pairs(-10012).await.len(), 1);

    let opened = registry
        .create(-10012, SessionSettings::default())
        .await
        .unwrap();
    let mut notified: Vec<PlayerId> = opened
        .notices
        .iter()
        .filter(|i| i.content == Content::NextGameOpened)
        .map(|i| match i.audience {
            Audience::Player(player) => player,
            Audience::Broadcast => panic!("notice must be private"),
        })
        .collect();
    notified.sort_unstable();
    let mut expected = vec![50, game.impostor];
    expected.sort_unstable();
    assert_eq!(notified, expected);
}

#[tokio::test]
async fn test_abort_requires_authorization() {
    let (registry, _) = setup_registry();
    setup_game(&registry, 6, 3).await;

    let err = send(&registry, 6, 99, EngineEvent::Abort).await.unwrap_err();
    assert_eq!(err, SessionError::Unauthorized);
    assert!(registry.get(6).await.is_some());
}

#[tokio::test]
async fn test_lobby_errors_leave_state_untouched() {
    let (registry, _) = setup_registry();
    registry
        .create(7, SessionSettings::default())
        .await
        .unwrap();
    send(&registry, 7, 1, join_event(1)).await.unwrap();
    send(&registry, 7, 2, join_event(2)).await.unwrap();

    assert_eq!(
        send(&registry, 7, 1, join_event(1)).await.unwrap_err(),
        SessionError::AlreadyJoined
    );
    let err = send(&registry, 7, 1, EngineEvent::Start)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        send(&registry, 7, 1, EngineEvent::RevealWordQuery)
            .await
            .unwrap_err(),
        SessionError::NotAssigned
    );

    let snapshot = registry.snapshot(7).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Lobby);
    assert_eq!(snapshot.players.len(), 2);

    send(&registry, 7, 3, join_event(3)).await.unwrap();
    send(&registry, 7, 1, EngineEvent::Start).await.unwrap();
    assert_eq!(
        send(&registry, 7, 2, EngineEvent::Start).await.unwrap_err(),
        SessionError::AlreadyStarted
    );
    assert_eq!(
        send(&registry, 7, 2, EngineEvent::Leave).await.unwrap_err(),
        SessionError::NotInLobby
    );
}

#[tokio::test]
async fn test_concurrent_create_same_chat() {
    let (registry, _) = setup_registry();

    let a = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.create(8, SessionSettings::default()).await })
    };
    let b = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.create(8, SessionSettings::default()).await })
    };
    let outcomes = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    let err = outcomes.into_iter().find_map(|o| o.err()).unwrap();
    assert_eq!(err, SessionError::SessionAlreadyActive(8));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_chats_progress_independently() {
    let (registry, store) = setup_registry();

    let mut tasks = vec![];
    for chat_id in 100..110 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let game = setup_game(&registry, chat_id, 3).await;
            give_clues(&registry, chat_id).await;
            for defender in &game.defenders {
                vote(&registry, chat_id, *defender, game.impostor)
                    .await
                    .unwrap();
            }
            vote(&registry, chat_id, game.impostor, game.defenders[0])
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        let intents = task.await.unwrap();
        assert!(game_over(&intents).is_some());
    }

    assert!(registry.active_sessions().await.is_empty());
    assert_eq!(store.result_count().await, 10);
    assert_eq!(store.chat_stats(105).await.defender_wins, 1);
}

#[tokio::test]
async fn test_concurrent_votes_in_one_chat_are_serialized() {
    let (registry, _) = setup_registry();
    let game = setup_game(&registry, 9, 6).await;
    give_clues(&registry, 9).await;

    let mut tasks = vec![];
    for defender in game.defenders.clone() {
        let registry = registry.clone();
        let target = game.impostor;
        tasks.push(tokio::spawn(async move {
            vote(&registry, 9, defender, target).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = registry.snapshot(9).await.unwrap();
    assert_eq!(snapshot.pending_voters, vec![game.impostor]);
}

struct FailingProvider;

#[async_trait]
impl SettingsProvider for FailingProvider {
    async fn settings_for(&self, _chat_id: ChatId) -> Result<SessionSettings, SettingsError> {
        Err(SettingsError::Unavailable("store offline".to_string()))
    }
}

#[tokio::test]
async fn test_create_from_provider() {
    let (registry, _) = setup_registry();

    let err = registry
        .create_from_provider(10, &FailingProvider)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    assert!(registry.get(10).await.is_none());

    let provider = StaticSettingsProvider::default();
    provider
        .set_override(
            10,
            SessionSettings {
                max_players: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    registry.create_from_provider(10, &provider).await.unwrap();
    for id in 1..=3 {
        send(&registry, 10, id, join_event(id)).await.unwrap();
    }
    assert_eq!(
        send(&registry, 10, 4, join_event(4)).await.unwrap_err(),
        SessionError::RosterFull { max: 3 }
    );
}
