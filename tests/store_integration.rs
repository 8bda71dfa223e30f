//! Versioned battle store integration tests

use std::sync::{Arc, Barrier};
use std::thread;

use battle_core::battle::*;
use battle_core::core::config::CombatConfig;
use battle_core::core::error::CombatError;
use battle_core::core::types::BattleId;

fn duel() -> BattleState {
    BattleState::new(
        "arena-7",
        7,
        vec![
            BattleUnit::new("a", "A", OffsetCoord::new(1, 1)).with_village("leaf"),
            BattleUnit::new("b", "B", OffsetCoord::new(2, 1)).with_village("sand"),
        ],
    )
}

#[test]
fn test_action_commit_cycle() {
    let store = InMemoryBattleStore::new();
    let map = BattleMap::new(5, 4);
    let config = CombatConfig::default();
    store.insert(duel()).unwrap();
    let id = BattleId::new("arena-7");

    let (state, version) = store.load(&id).unwrap();
    let outcome = perform_action_with(&state, &map, &ActionRequest::new("a", "sp", OffsetCoord::new(2, 1)), &config)
        .unwrap();
    let committed = store.commit(&id, version, outcome.state).unwrap();
    assert_eq!(committed, version + 1);

    let (reloaded, reloaded_version) = store.load(&id).unwrap();
    assert_eq!(reloaded_version, committed);
    assert!(reloaded.units[1].pools.cur_health < 100.0);
    assert_eq!(reloaded.units[0].action_history(), vec!["sp".to_string()]);
}

#[test]
fn test_second_writer_from_same_snapshot_conflicts() {
    let store = InMemoryBattleStore::new();
    let map = BattleMap::new(5, 4);
    let config = CombatConfig::default();
    store.insert(duel()).unwrap();
    let id = BattleId::new("arena-7");

    let (first, version) = store.load(&id).unwrap();
    let (second, _) = store.load(&id).unwrap();

    let a_moves = perform_action_with(&first, &map, &ActionRequest::new("a", "move", OffsetCoord::new(0, 1)), &config)
        .unwrap();
    let b_waits = perform_action_with(&second, &map, &ActionRequest::new("b", "wait", OffsetCoord::new(2, 1)), &config)
        .unwrap();

    store.commit(&id, version, a_moves.state).unwrap();
    let err = store.commit(&id, version, b_waits.state).unwrap_err();
    assert!(matches!(err, CombatError::VersionConflict { expected, found } if expected == version && found == version + 1));

    let (current, _) = store.load(&id).unwrap();
    assert_eq!(current.units[0].position, OffsetCoord::new(0, 1));
    assert_eq!(current.units[1].action_points, 100.0);
}

#[test]
fn test_racing_writers_one_wins() {
    const WRITERS: usize = 8;
    let store = Arc::new(InMemoryBattleStore::new());
    store.insert(duel()).unwrap();
    let start = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let id = BattleId::new("arena-7");
                let (mut state, version) = store.load(&id).unwrap();
                start.wait();
                state.units[0].money = i as f64;
                store.commit(&id, version, state)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, CombatError::VersionConflict { expected: 0, found: 1 })));
    let (_, version) = store.load(&BattleId::new("arena-7")).unwrap();
    assert_eq!(version, 1);
}

#[test]
fn test_snapshot_survives_json() {
    let map = BattleMap::new(5, 4);
    let outcome = perform_action_with(
        &duel(),
        &map,
        &ActionRequest::new("a", "move", OffsetCoord::new(0, 1)),
        &CombatConfig::default(),
    )
    .unwrap();

    let json = serde_json::to_string(&outcome.state).unwrap();
    let restored: BattleState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, outcome.state);
}
