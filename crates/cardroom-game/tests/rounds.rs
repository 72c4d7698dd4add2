//! Integration tests that play whole rounds through the public API.

use cardroom_game::{Deck, GameError, GameSettings, GameState};
use cardroom_protocol::{Phase, PlayerId, PromptCard, ResponseCard, Role};
use rand::SeedableRng;
use rand::rngs::StdRng;

// =========================================================================
// Helpers
// =========================================================================

fn deck(picks: &[u8], responses: usize) -> Deck {
    Deck::new(
        "rounds",
        picks
            .iter()
            .enumerate()
            .map(|(i, &pick)| PromptCard::new(format!("Prompt {i}: ___"), pick))
            .collect(),
        (0..responses)
            .map(|i| ResponseCard::new(format!("Answer {i}")))
            .collect(),
    )
    .unwrap()
}

fn seated(picks: &[u8], names: &[(u64, &str)]) -> GameState<StdRng> {
    let settings = GameSettings {
        hand_size: 5,
        ..GameSettings::default()
    };
    let mut game =
        GameState::with_rng(settings, deck(picks, 100), StdRng::seed_from_u64(42)).unwrap();
    for &(id, name) in names {
        game.upsert_player(PlayerId(id), name, None).unwrap();
    }
    game
}

fn hand(game: &GameState<StdRng>, id: u64) -> Vec<ResponseCard> {
    game.player(PlayerId(id)).unwrap().hand.clone()
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_pick_two_advances_only_after_every_contestant_has_two() {
    let mut game = seated(&[2, 2], &[(1, "Ana"), (2, "Bo"), (3, "Cy")]);
    game.advance_phase().unwrap();
    assert_eq!(game.prompt().unwrap().pick, 2);

    // One card is not a valid pick-2 submission.
    let bo = hand(&game, 2);
    assert!(matches!(
        game.select_cards(PlayerId(2), bo[..1].to_vec()),
        Err(GameError::InvalidSelection(_))
    ));

    game.select_cards(PlayerId(2), bo[..2].to_vec()).unwrap();
    assert_eq!(game.advance_phase(), Err(GameError::SubmissionsPending(1)));
    assert_eq!(game.phase(), Phase::PlayCards);

    let cy = hand(&game, 3);
    let phase = game.select_cards(PlayerId(3), cy[1..3].to_vec()).unwrap();
    assert_eq!(phase, Phase::Judgement);
}

#[test]
fn test_winner_scores_and_becomes_judge_old_judge_reverts() {
    let mut game = seated(&[1, 1], &[(1, "Ana"), (2, "Bo"), (3, "Cy")]);
    game.advance_phase().unwrap();
    for id in [2, 3] {
        let card = hand(&game, id)[0].clone();
        game.select_cards(PlayerId(id), vec![card]).unwrap();
    }

    game.choose_winner(PlayerId(1), PlayerId(2)).unwrap();

    let snapshot = game.snapshot();
    let ana = snapshot.player(PlayerId(1)).unwrap();
    let bo = snapshot.player(PlayerId(2)).unwrap();
    let cy = snapshot.player(PlayerId(3)).unwrap();
    assert_eq!(bo.score, 1);
    assert_eq!(bo.role, Role::Judge);
    assert_eq!(ana.role, Role::Contestant);
    assert_eq!(ana.score, 0);
    assert_eq!(cy.score, 0);
    assert_eq!(snapshot.round, 2);
    assert_eq!(snapshot.last_winner, Some(PlayerId(2)));
    assert_eq!(snapshot.phase, Phase::PlayCards);
    for player in &snapshot.players {
        assert_eq!(player.hand.len(), 5, "{} has a short hand", player.name);
    }
    game.verify().unwrap();
}

#[test]
fn test_judge_drop_reassigns_to_lowest_remaining_id() {
    let mut game = seated(&[1], &[(10, "Ana"), (30, "Cy"), (20, "Bo")]);
    game.advance_phase().unwrap();
    assert_eq!(game.judge().unwrap().name, "Ana");

    let left = game.remove_player(PlayerId(10)).unwrap();

    assert!(left.is_judge());
    let judge = game.judge().unwrap();
    assert_eq!(judge.id, PlayerId(20));
    assert!(judge.selected.is_empty());
    assert_eq!(game.players().filter(|p| p.is_judge()).count(), 1);
    game.verify().unwrap();
}

#[test]
fn test_submitted_judge_replacement_clears_selection() {
    let mut game = seated(&[1], &[(1, "Ana"), (2, "Bo"), (3, "Cy")]);
    game.advance_phase().unwrap();
    let card = hand(&game, 2)[0].clone();
    game.select_cards(PlayerId(2), vec![card]).unwrap();

    game.remove_player(PlayerId(1));

    // Bo submitted, then became judge; Cy is the only contestant left.
    let bo = game.player(PlayerId(2)).unwrap();
    assert!(bo.is_judge());
    assert!(bo.selected.is_empty());
    assert_eq!(game.phase(), Phase::PlayCards);
}

#[test]
fn test_upsert_is_idempotent_on_identity() {
    let mut game = seated(&[1], &[]);
    for _ in 0..3 {
        game.upsert_player(PlayerId(5), "Ana", Some("teal")).unwrap();
    }
    assert_eq!(game.player_count(), 1);
    assert_eq!(game.snapshot().players.len(), 1);
}

#[test]
fn test_exactly_one_judge_through_many_rounds() {
    let mut game = seated(&[1; 8], &[(1, "Ana"), (2, "Bo"), (3, "Cy"), (4, "Di")]);
    game.advance_phase().unwrap();

    // Winning score is 5 and there are four players, so no champion yet.
    for _ in 0..6 {
        let judge = game.judge().unwrap().id;
        let contestants: Vec<PlayerId> = game
            .players()
            .filter(|p| !p.is_judge())
            .map(|p| p.id)
            .collect();
        for &id in &contestants {
            let card = hand(&game, id.0)[0].clone();
            game.select_cards(id, vec![card]).unwrap();
        }
        assert_eq!(game.phase(), Phase::Judgement);

        game.choose_winner(judge, contestants[0]).unwrap();

        assert_eq!(game.players().filter(|p| p.is_judge()).count(), 1);
        game.verify().unwrap();
    }
    assert_eq!(game.round(), 7);
    assert!(game.champion().is_none());
}

#[test]
fn test_snapshot_lists_players_in_id_order() {
    let game = seated(&[1], &[(9, "Zed"), (2, "Bo"), (5, "Mo")]);
    let ids: Vec<u64> = game.snapshot().players.iter().map(|p| p.id.0).collect();
    assert_eq!(ids, vec![2, 5, 9]);
}
