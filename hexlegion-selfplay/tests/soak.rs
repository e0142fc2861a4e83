//! Seeded random games through the public API, audited after every command

use hexlegion_core::{RuleOptions, Variant};
use hexlegion_selfplay::{play_game, run_batch, BatchConfig, GameEnd, SelfPlayConfig};
use std::sync::Arc;

#[test]
fn test_two_player_batch_stays_consistent() {
    let config = BatchConfig::new(8)
        .with_first_seed(100)
        .with_game(SelfPlayConfig::default().with_max_turns(25));
    let summary = run_batch(Arc::new(Variant::standard()), &config);

    assert_eq!(summary.games, 8);
    assert!(summary.invariant_failures.is_empty(), "{:?}", summary.invariant_failures);
    assert_eq!(summary.halted, 0);
    assert!(summary.avg_commands > 20.0);
}

#[test]
fn test_multi_player_games_progress() {
    let variant = Arc::new(Variant::standard());
    for (players, seed) in [(3, 7), (4, 8), (6, 9)] {
        let config = SelfPlayConfig::default()
            .with_players(players)
            .with_seed(seed)
            .with_max_turns(8);
        let record = play_game(Arc::clone(&variant), &config).unwrap();
        assert_eq!(record.scores.len(), players);
        assert!(record.commands > 10, "{players} players stalled: {:?}", record.end);
        assert!(!matches!(record.end, GameEnd::Halted(_)), "{:?}", record.end);
    }
}

#[test]
fn test_short_battles_and_rich_scores_stay_consistent() {
    let options = RuleOptions::default()
        .with_battle_turn_limit(2)
        .with_titan_teleport_score(0);
    let config = BatchConfig::new(4)
        .with_first_seed(900)
        .sequential()
        .with_game(SelfPlayConfig::default().with_options(options).with_max_turns(20));
    let summary = run_batch(Arc::new(Variant::standard()), &config);
    assert!(summary.is_clean(), "{summary:?}");
}

#[test]
fn test_record_serializes() {
    let config = SelfPlayConfig::default().with_seed(2).with_max_turns(3).with_events(true);
    let record = play_game(Arc::new(Variant::standard()), &config).unwrap();
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"seed\":2"));
    assert!(json.contains("LegionSplit"));
}
