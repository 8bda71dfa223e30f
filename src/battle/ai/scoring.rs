//! Fitness scoring for the search engine
//!
//! Scores the change from one snapshot to the next from the acting unit's
//! point of view.

use crate::battle::actions::CombatAction;
use crate::battle::execution::BattleState;
use crate::battle::pathfinding::PathCalculator;
use crate::battle::targeting::{multiple_villages, same_faction};
use crate::core::config::CombatConfig;
use crate::core::types::UnitId;

/// Fitness of going from `before` to `after` by performing `action`
///
/// Health recovered and damage dealt to enemies count in full; ending the
/// turn is penalized. With `include_distance`, every tile of path to each
/// surviving enemy costs `1 / ai_distance_divisor`.
pub fn evaluate_fitness(
    before: &BattleState,
    after: &BattleState,
    unit_id: &UnitId,
    action: &CombatAction,
    paths: &PathCalculator,
    include_distance: bool,
    config: &CombatConfig,
) -> f64 {
    let (Some(current), Some(next)) = (before.unit(unit_id), after.unit(unit_id)) else {
        return 0.0;
    };
    let mut fitness = 0.0;

    if next.pools.cur_health > current.pools.cur_health {
        fitness += next.pools.cur_health - current.pools.cur_health;
    }

    if action.is_wait() {
        fitness -= config.ai_wait_penalty;
    }

    let multi_village = multiple_villages(&after.units);
    let enemies = after
        .units
        .iter()
        .filter(|u| !same_faction(u, next, multi_village));
    for enemy in enemies {
        if include_distance && enemy.still_in_battle() {
            if let Some(path) = paths.shortest_path(next.position, enemy.position) {
                fitness -= path.len() as f64 / config.ai_distance_divisor;
            }
        }
        if let Some(previous) = before.unit(&enemy.user_id) {
            if previous.pools.cur_health > enemy.pools.cur_health {
                fitness += previous.pools.cur_health - enemy.pools.cur_health;
            }
        }
    }
    fitness
}
