//! Integration tests for the rules engine through its public API

use hexlegion_core::{
    Color, Command, Game, GameEvent, Marker, Phase, PlayerId, PlayerSetup, Rejection, RuleOptions, ScriptedDice,
    SetupError, Variant,
};
use std::sync::Arc;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn seats(n: usize) -> Vec<PlayerSetup> {
    Color::ALL
        .iter()
        .take(n)
        .enumerate()
        .map(|(i, &c)| PlayerSetup::new(format!("seat{i}"), c))
        .collect()
}

/// Two players, every roll a three
fn simple_game() -> Game {
    Game::new(
        Arc::new(Variant::standard()),
        RuleOptions::default(),
        &seats(2),
        Box::new(ScriptedDice::new([]).with_fallback(3)),
    )
    .unwrap()
}

fn only_marker(game: &Game, player: PlayerId) -> Marker {
    game.legions_of(player)[0].marker.clone()
}

fn split_command(game: &Game, player: PlayerId, names: &[&str]) -> Command {
    let table = &game.variant().species;
    Command::Split {
        parent: only_marker(game, player),
        child: game.player(player).unwrap().markers.first().unwrap().clone(),
        creatures: names.iter().map(|n| table.id(n).unwrap()).collect(),
    }
}

// ============================================================================
// SETUP
// ============================================================================

#[test]
fn test_setup_rejects_bad_seats() {
    let variant = Arc::new(Variant::standard());
    let err = Game::new(Arc::clone(&variant), RuleOptions::default(), &seats(1), Box::new(ScriptedDice::new([])))
        .unwrap_err();
    assert!(matches!(err, SetupError::PlayerCount { got: 1, .. }));

    let twins = [PlayerSetup::new("a", Color::Red), PlayerSetup::new("b", Color::Red)];
    let err = Game::new(variant, RuleOptions::default(), &twins, Box::new(ScriptedDice::new([]))).unwrap_err();
    assert!(matches!(err, SetupError::DuplicateColor(Color::Red)));
}

#[test]
fn test_starting_legions_come_from_the_pool() {
    let game = simple_game();
    let table = &game.variant().species;
    let pool = game.pool();
    let titan = table.id("Titan").unwrap();
    let ogre = table.id("Ogre").unwrap();

    assert_eq!(pool.max_count(titan), 2);
    assert_eq!(pool.remaining(titan), 0);
    assert_eq!(pool.number_in_play(ogre), 4);
    assert_eq!(pool.remaining(ogre) + pool.number_in_play(ogre), pool.max_count(ogre));
    for player in [PlayerId(0), PlayerId(1)] {
        let legions = game.legions_of(player);
        assert_eq!(legions.len(), 1);
        assert_eq!(legions[0].height(), 8);
        assert!(game.board().is_tower(legions[0].hex));
    }
}

// ============================================================================
// TURN FLOW
// ============================================================================

#[test]
fn test_opening_split_must_be_four_and_four() {
    let mut game = simple_game();

    let lopsided = split_command(&game, PlayerId(0), &["Angel", "Ogre", "Ogre", "Centaur", "Gargoyle"]);
    let err = game.apply(PlayerId(0), lopsided).unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::IllegalSplit));

    let two_lords = split_command(&game, PlayerId(0), &["Titan", "Angel", "Ogre", "Centaur"]);
    let err = game.apply(PlayerId(0), two_lords).unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::IllegalSplit));
    assert_eq!(game.legions_of(PlayerId(0)).len(), 1);

    let out_of_turn = split_command(&game, PlayerId(1), &["Angel", "Ogre", "Centaur", "Gargoyle"]);
    let err = game.apply(PlayerId(1), out_of_turn).unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::NotYourTurn));

    let even = split_command(&game, PlayerId(0), &["Angel", "Ogre", "Centaur", "Gargoyle"]);
    let events = game.apply(PlayerId(0), even).unwrap();
    assert!(matches!(events[0], GameEvent::LegionSplit { .. }));
    assert!(game.legions_of(PlayerId(0)).iter().all(|l| l.height() == 4));
}

#[test]
fn test_full_turn_hands_over_to_next_player() {
    let mut game = simple_game();
    let split = split_command(&game, PlayerId(0), &["Angel", "Ogre", "Centaur", "Gargoyle"]);
    game.apply_and_settle(PlayerId(0), split).unwrap();

    let events = game.apply_and_settle(PlayerId(0), Command::DoneSplits).unwrap();
    assert_eq!(events[0], GameEvent::SplitsDone { player: PlayerId(0), roll: 3 });
    assert_eq!(game.phase(), Phase::Move);

    let mover = game
        .legions_of(PlayerId(0))
        .iter()
        .find(|l| l.split_from.is_some())
        .unwrap()
        .marker
        .clone();
    let to = game.legal_moves(&mover)[0].hex;
    let command = Command::MoveLegion { marker: mover, to, entry_side: None, teleport: false };
    game.apply_and_settle(PlayerId(0), command).unwrap();
    game.apply_and_settle(PlayerId(0), Command::DoneMoves).unwrap();

    // Nothing to fight, so settle moves on to the muster
    assert_eq!(game.phase(), Phase::Muster);
    game.apply_and_settle(PlayerId(0), Command::DoneRecruits).unwrap();
    assert_eq!(game.active_player(), PlayerId(1));
    assert_eq!(game.phase(), Phase::Split);
    assert_eq!(game.actor(), Some(PlayerId(1)));
}

#[test]
fn test_commands_arrive_as_json() {
    let mut game = simple_game();
    let parent = only_marker(&game, PlayerId(0));
    let child = game.player(PlayerId(0)).unwrap().markers.first().unwrap().clone();
    let table = &game.variant().species;
    let half: Vec<_> = ["Angel", "Ogre", "Centaur", "Gargoyle"].iter().map(|n| table.id(n).unwrap()).collect();
    let wire = serde_json::json!({
        "type": "Split",
        "parent": parent,
        "child": child,
        "creatures": half,
    });

    let command: Command = serde_json::from_value(wire).unwrap();
    let events = game.apply(PlayerId(0), command).unwrap();
    let echoed = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(echoed["type"], "LegionSplit");
}

// ============================================================================
// ROBUSTNESS
// ============================================================================

#[test]
fn test_unknown_player_is_ignored() {
    let mut game = simple_game();
    let events = game.apply(PlayerId(9), Command::DoneSplits).unwrap();
    assert!(events.is_empty());
    assert_eq!(game.phase(), Phase::Split);
}

#[test]
fn test_settle_is_idempotent() {
    let mut game = simple_game();
    assert!(game.settle().is_empty());
    assert!(game.settle().is_empty());
    assert_eq!(game.phase(), Phase::Split);
}

#[test]
fn test_stale_marker_is_a_no_op() {
    let mut game = simple_game();
    let command = Command::UndoSplit { child: Marker::new("Zz99") };
    let events = game.apply(PlayerId(0), command).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_variant_file_round_trip() {
    let path = std::env::temp_dir().join(format!("hexlegion-core-variant-{}.json", std::process::id()));
    let variant = Variant::standard();
    variant.save(&path).unwrap();
    let loaded = Variant::load(&path).unwrap();
    assert_eq!(loaded, variant);
    let _ = std::fs::remove_file(&path);
}
