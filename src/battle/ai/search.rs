//! Search engine: bounded game-tree search over (action, tile) choices
//!
//! Every candidate is applied through the turn controller on its own copy
//! of the snapshot and scored with [`evaluate_fitness`]. Nodes live in a
//! flat [`SearchArena`] addressed by index; fitness accumulates along each
//! path from the root.

use tracing::debug;

use crate::battle::actions::CombatAction;
use crate::battle::ai::scoring::evaluate_fitness;
use crate::battle::ai::AiDecision;
use crate::battle::battle_map::BattleMap;
use crate::battle::execution::{perform_action_with, usable_actions, ActionOutcome, ActionRequest, BattleState};
use crate::battle::hex::OffsetCoord;
use crate::battle::pathfinding::PathCalculator;
use crate::battle::targeting::possible_action_tiles;
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::UnitId;

/// One explored (action, tile) choice
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub action_id: String,
    pub target: OffsetCoord,
    /// Fitness accumulated from the root down to this node
    pub fitness: f64,
    pub children: Vec<usize>,
}

/// Flat storage of the search tree
#[derive(Debug, Clone, Default)]
pub struct SearchArena {
    nodes: Vec<SearchNode>,
    roots: Vec<usize>,
}

impl SearchArena {
    pub fn node(&self, index: usize) -> &SearchNode {
        &self.nodes[index]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Best accumulated fitness anywhere in the subtree under `index`
    pub fn future_fitness(&self, index: usize) -> f64 {
        let node = &self.nodes[index];
        node.children
            .iter()
            .map(|&child| self.future_fitness(child))
            .fold(node.fitness, f64::max)
    }

    /// Root whose subtree reaches the highest fitness, first one on ties
    pub fn best_root(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &root in &self.roots {
            let future = self.future_fitness(root);
            if best.map_or(true, |(_, score)| future > score) {
                best = Some((root, future));
            }
        }
        best.map(|(root, _)| root)
    }
}

/// Builds the search tree for one unit
struct TreeBuilder<'a> {
    map: &'a BattleMap,
    paths: PathCalculator<'a>,
    unit_id: &'a UnitId,
    max_depth: usize,
    config: &'a CombatConfig,
    arena: SearchArena,
}

impl<'a> TreeBuilder<'a> {
    fn expand(&mut self, state: &BattleState, initial_fitness: f64, depth: usize) -> Vec<usize> {
        let Some(unit) = state.unit(self.unit_id) else {
            return Vec::new();
        };
        if !unit.in_battle() {
            return Vec::new();
        }
        let actions: Vec<CombatAction> = usable_actions(state, unit, false, self.config);
        let origin = unit.position;

        let mut expanded = Vec::new();
        for action in &actions {
            for tile in possible_action_tiles(self.map, action, origin) {
                let request = ActionRequest {
                    unit_id: self.unit_id.clone(),
                    action_id: action.id.clone(),
                    target: tile,
                };
                let Ok(outcome) = perform_action_with(state, self.map, &request, self.config) else {
                    continue;
                };
                let fitness = initial_fitness
                    + evaluate_fitness(
                        state,
                        &outcome.state,
                        self.unit_id,
                        action,
                        &self.paths,
                        depth == 0,
                        self.config,
                    );

                let children = if depth < self.max_depth {
                    let mut next = outcome.state;
                    // Later plies are free
                    if let Some(unit) = next.unit_mut(self.unit_id) {
                        unit.action_points = self.config.action_points_per_round;
                    }
                    self.expand(&next, fitness, depth + 1)
                } else {
                    Vec::new()
                };

                self.arena.nodes.push(SearchNode {
                    action_id: action.id.clone(),
                    target: tile,
                    fitness,
                    children,
                });
                expanded.push(self.arena.nodes.len() - 1);
            }
        }
        expanded
    }
}

/// Build the search tree for `unit_id` with `depth` extra plies
pub fn build_tree(state: &BattleState, map: &BattleMap, unit_id: &UnitId, depth: usize, config: &CombatConfig) -> SearchArena {
    let mut builder = TreeBuilder {
        map,
        paths: PathCalculator::new(map),
        unit_id,
        max_depth: depth,
        config,
        arena: SearchArena::default(),
    };
    let roots = builder.expand(state, 0.0, 0);
    builder.arena.roots = roots;
    builder.arena
}

/// Pick the first action on the best path, `None` when nothing is possible
pub fn decide(
    state: &BattleState,
    map: &BattleMap,
    unit_id: &UnitId,
    depth: usize,
    config: &CombatConfig,
) -> Option<AiDecision> {
    let arena = build_tree(state, map, unit_id, depth, config);
    let best = arena.best_root()?;
    let node = arena.node(best);
    debug!(
        unit = %unit_id,
        action = %node.action_id,
        col = node.target.col,
        row = node.target.row,
        explored = arena.len(),
        future_fitness = arena.future_fitness(best),
        "Search AI decided"
    );
    Some(AiDecision {
        action_id: node.action_id.clone(),
        target: node.target,
    })
}

/// Decide and perform for an AI unit; `Ok(None)` when it has nothing to do
pub fn perform_ai_action(
    state: &BattleState,
    map: &BattleMap,
    unit_id: &UnitId,
    config: &CombatConfig,
) -> Result<Option<ActionOutcome>> {
    let unit = state
        .unit(unit_id)
        .ok_or_else(|| CombatError::UnitNotFound(unit_id.clone()))?;
    if !unit.is_ai {
        return Err(CombatError::NotAiControlled(unit_id.clone()));
    }
    let Some(decision) = decide(state, map, unit_id, config.ai_search_depth, config) else {
        return Ok(None);
    };
    let request = ActionRequest {
        unit_id: unit_id.clone(),
        action_id: decision.action_id,
        target: decision.target,
    };
    perform_action_with(state, map, &request, config).map(Some)
}
