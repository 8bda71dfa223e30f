//! Rule engine: ordered condition -> action profiles
//!
//! Rules are tried in declared order. The first rule whose conditions hold
//! and whose action the turn controller accepts is committed. A unit for
//! which no rule commits gives up and is removed from the encounter.

use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::battle::actions::{ActionKind, CombatAction, MOVE_ACTION_ID, WAIT_ACTION_ID};
use crate::battle::ai::combo::get_combo_status;
use crate::battle::ai::profile::{Condition, Rule, RuleAction, RuleTarget};
use crate::battle::ai::AiDecision;
use crate::battle::battle_map::BattleMap;
use crate::battle::effects::EffectType;
use crate::battle::execution::{
    battle_rng, conclude_turn, is_player_controlled_ai, perform_action_with, usable_actions, ActionOutcome,
    ActionRequest, BattlePhase, BattleState,
};
use crate::battle::hex::OffsetCoord;
use crate::battle::log::ActionLogEntry;
use crate::battle::pathfinding::{ObstacleOverlay, PathCalculator};
use crate::battle::targeting::{barrier_at, multiple_villages, occupant_at, same_faction};
use crate::battle::units::BattleUnit;
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::UnitId;

/// A unit or tile a rule can point at, with its path length from the actor
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub position: OffsetCoord,
    pub distance: usize,
}

/// Convenience targets, computed once per decision
#[derive(Debug, Clone, Default)]
pub struct RuleTargets {
    pub own: Option<Candidate>,
    pub random_opponent: Option<Candidate>,
    pub closest_opponent: Option<Candidate>,
    pub random_ally: Option<Candidate>,
    pub closest_ally: Option<Candidate>,
    pub barrier_blocking_closest_opponent: Option<Candidate>,
    pub empty_ground_near_self: Option<Candidate>,
}

impl RuleTargets {
    pub fn get(&self, target: RuleTarget) -> Option<&Candidate> {
        match target {
            RuleTarget::SelfUnit => self.own.as_ref(),
            RuleTarget::RandomOpponent => self.random_opponent.as_ref(),
            RuleTarget::ClosestOpponent => self.closest_opponent.as_ref(),
            RuleTarget::RandomAlly => self.random_ally.as_ref(),
            RuleTarget::ClosestAlly => self.closest_ally.as_ref(),
            RuleTarget::BarrierBlockingClosestOpponent => self.barrier_blocking_closest_opponent.as_ref(),
            RuleTarget::EmptyGroundNearSelf => self.empty_ground_near_self.as_ref(),
        }
    }
}

fn closest(candidates: &[Candidate]) -> Option<Candidate> {
    candidates
        .iter()
        .fold(None, |best: Option<&Candidate>, c| match best {
            Some(b) if b.distance <= c.distance => Some(b),
            _ => Some(c),
        })
        .cloned()
}

fn random(candidates: &[Candidate], rng: &mut dyn RngCore) -> Option<Candidate> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())].clone())
    }
}

/// Compute every convenience target for `unit`
pub fn rule_targets(
    state: &BattleState,
    map: &BattleMap,
    unit: &BattleUnit,
    paths: &PathCalculator,
    rng: &mut dyn RngCore,
) -> RuleTargets {
    let origin = unit.position;
    let in_battle: Vec<BattleUnit> = state.units.iter().filter(|u| u.still_in_battle()).cloned().collect();
    let multi_village = multiple_villages(&in_battle);
    let distance_to = |to: OffsetCoord| paths.shortest_path(origin, to).map_or(0, |p| p.len());

    let mut enemies = Vec::new();
    let mut allies = Vec::new();
    for other in in_battle.iter().filter(|u| u.user_id != unit.user_id) {
        let candidate = Candidate {
            position: other.position,
            distance: distance_to(other.position),
        };
        if same_faction(other, unit, multi_village) {
            allies.push(candidate);
        } else {
            enemies.push(candidate);
        }
    }

    let closest_opponent = closest(&enemies);
    let barrier_blocking_closest_opponent = closest_opponent.as_ref().and_then(|enemy| {
        let path = paths.shortest_path(origin, enemy.position)?;
        path.iter()
            .position(|tile| barrier_at(&state.ground_effects, *tile).is_some())
            .map(|index| Candidate {
                position: path[index],
                distance: index + 1,
            })
    });
    let empty_ground_near_self = map
        .spiral(origin, 1)
        .into_iter()
        .filter(|tile| *tile != origin)
        .find(|tile| {
            occupant_at(&state.units, *tile).is_none() && barrier_at(&state.ground_effects, *tile).is_none()
        })
        .map(|tile| Candidate {
            position: tile,
            distance: 2,
        });

    RuleTargets {
        own: Some(Candidate {
            position: origin,
            distance: 0,
        }),
        random_opponent: random(&enemies, rng),
        closest_opponent,
        random_ally: random(&allies, rng),
        closest_ally: closest(&allies),
        barrier_blocking_closest_opponent,
        empty_ground_near_self,
    }
}

/// Whether every condition of a rule holds
pub fn conditions_hold(conditions: &[Condition], state: &BattleState, unit: &BattleUnit, targets: &RuleTargets) -> bool {
    conditions.iter().all(|condition| match condition {
        Condition::HealthBelow { value } => unit.health_percent() < *value,
        Condition::DistanceHigherThan { value, target } => targets
            .get(*target)
            .is_some_and(|c| c.distance >= *value as usize),
        Condition::DistanceLowerThan { value, target } => targets
            .get(*target)
            .is_some_and(|c| c.distance <= *value as usize),
        Condition::SpecificRound { value } => state.round == *value,
        Condition::NoActiveSummon => !state
            .units
            .iter()
            .any(|u| u.is_summon && u.controller_id == unit.controller_id && u.still_in_battle()),
    })
}

/// Everything the engine needs to turn a rule into a concrete action
struct RuleContext<'a> {
    unit: &'a BattleUnit,
    actions: &'a [CombatAction],
    targets: &'a RuleTargets,
    obstacle_paths: &'a PathCalculator<'a>,
    /// Player-driven units may not pick movement or summons by themselves
    restricted: bool,
}

impl<'a> RuleContext<'a> {
    fn find(&self, id: &str) -> Option<&'a CombatAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    fn selectable(&self, kind: Option<ActionKind>) -> Vec<&'a CombatAction> {
        self.actions
            .iter()
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .filter(|a| !(self.restricted && (a.has_effect(EffectType::Move) || a.has_effect(EffectType::Summon))))
            .collect()
    }

    fn highest_power(&self, kind: Option<ActionKind>, effect: EffectType) -> Option<&'a CombatAction> {
        let mut best: Option<(&CombatAction, f64)> = None;
        for action in self.selectable(kind) {
            let Some(power) = action.max_power(effect) else {
                continue;
            };
            if best.map_or(true, |(_, p)| power > p) {
                best = Some((action, power));
            }
        }
        best.map(|(action, _)| action)
    }

    fn random_of(&self, kind: ActionKind, rng: &mut dyn RngCore) -> Option<&'a CombatAction> {
        let pool = self.selectable(Some(kind));
        if pool.is_empty() {
            None
        } else {
            Some(pool[rng.gen_range(0..pool.len())])
        }
    }

    fn at_target(&self, action: Option<&'a CombatAction>, target: RuleTarget) -> Option<(&'a CombatAction, OffsetCoord)> {
        let action = action?;
        let candidate = self.targets.get(target)?;
        Some((action, candidate.position))
    }

    /// Action and aim tile for a rule, if one can be found
    fn resolve(&self, rule_action: &RuleAction, rng: &mut dyn RngCore) -> Option<(&'a CombatAction, OffsetCoord)> {
        match rule_action {
            RuleAction::MoveTowardsOpponent { target } => {
                let movement = self.find(MOVE_ACTION_ID)?;
                let goal = self.targets.get(*target)?;
                let path = self.obstacle_paths.shortest_path(self.unit.position, goal.position)?;
                if path.len() > 2 {
                    Some((movement, path[1]))
                } else {
                    None
                }
            }
            RuleAction::EndTurn => self.find(WAIT_ACTION_ID).map(|wait| (wait, self.unit.position)),
            RuleAction::UseSpecificAction { action_id, target } => self.at_target(self.find(action_id), *target),
            RuleAction::UseRandomJutsu { target } => self.at_target(self.random_of(ActionKind::Jutsu, rng), *target),
            RuleAction::UseRandomItem { target } => self.at_target(self.random_of(ActionKind::Item, rng), *target),
            RuleAction::UseHighestPowerAction { effect, target } => {
                self.at_target(self.highest_power(None, *effect), *target)
            }
            RuleAction::UseHighestPowerJutsu { effect, target } => {
                self.at_target(self.highest_power(Some(ActionKind::Jutsu), *effect), *target)
            }
            RuleAction::UseHighestPowerItem { effect, target } => {
                self.at_target(self.highest_power(Some(ActionKind::Item), *effect), *target)
            }
            RuleAction::UseComboAction { combo_ids, target } => {
                let status = get_combo_status(combo_ids.as_slice(), self.unit.action_history().as_slice());
                let next = status.next_id?;
                self.at_target(self.find(&next), *target)
            }
        }
    }
}

/// Rules in evaluation order for `unit`
pub fn effective_rules(unit: &BattleUnit, actions: &[CombatAction], config: &CombatConfig) -> Vec<Rule> {
    let profile = unit.ai_profile.clone().unwrap_or_default();
    let mut rules = profile.rules_for(is_player_controlled_ai(unit, config));
    if !actions.iter().any(|a| !a.effects.is_empty()) {
        rules.push(Rule::new(Vec::new(), RuleAction::EndTurn));
    }
    rules
}

/// Evaluate the unit's rules; the committed decision and its outcome
fn evaluate(
    state: &BattleState,
    map: &BattleMap,
    unit: &BattleUnit,
    config: &CombatConfig,
) -> Option<(AiDecision, ActionOutcome)> {
    let actions = usable_actions(state, unit, true, config);

    let mut overlay = ObstacleOverlay::new();
    for other in state.units.iter().filter(|u| u.still_in_battle()) {
        overlay.mark(other.position, config.obstacle_cost);
    }
    for barrier in state.ground_effects.iter().filter(|g| g.is_barrier()) {
        overlay.mark(barrier.position, config.obstacle_cost);
    }
    let obstacle_paths = PathCalculator::with_overlay(map, overlay);
    let paths = PathCalculator::new(map);

    let mut rng = battle_rng(state);
    let targets = rule_targets(state, map, unit, &paths, &mut rng);

    let context = RuleContext {
        unit,
        actions: &actions,
        targets: &targets,
        obstacle_paths: &obstacle_paths,
        restricted: is_player_controlled_ai(unit, config),
    };

    for (index, rule) in effective_rules(unit, &actions, config).iter().enumerate() {
        if !conditions_hold(&rule.conditions, state, unit, &targets) {
            continue;
        }
        let Some((action, tile)) = context.resolve(&rule.action, &mut rng) else {
            continue;
        };
        let request = ActionRequest {
            unit_id: unit.user_id.clone(),
            action_id: action.id.clone(),
            target: tile,
        };
        match perform_action_with(state, map, &request, config) {
            Ok(outcome) => {
                debug!(
                    unit = %unit.user_id,
                    rule = index,
                    action = %action.id,
                    col = tile.col,
                    row = tile.row,
                    "Rule AI committed"
                );
                let decision = AiDecision {
                    action_id: action.id.clone(),
                    target: tile,
                };
                return Some((decision, outcome));
            }
            Err(err) => {
                debug!(unit = %unit.user_id, rule = index, error = %err, "Rule action rejected");
            }
        }
    }
    None
}

fn ai_unit<'s>(state: &'s BattleState, unit_id: &UnitId) -> Result<&'s BattleUnit> {
    let unit = state
        .unit(unit_id)
        .ok_or_else(|| CombatError::UnitNotFound(unit_id.clone()))?;
    if !unit.is_ai {
        return Err(CombatError::NotAiControlled(unit_id.clone()));
    }
    if !unit.in_battle() {
        return Err(CombatError::UnitNotInBattle(unit_id.clone()));
    }
    Ok(unit)
}

/// The action the rule engine would commit, without committing it
pub fn decide(state: &BattleState, map: &BattleMap, unit_id: &UnitId, config: &CombatConfig) -> Result<Option<AiDecision>> {
    let unit = ai_unit(state, unit_id)?;
    Ok(evaluate(state, map, unit, config).map(|(decision, _)| decision))
}

/// Run the unit's rules and commit the first action that works
///
/// When nothing can be committed the unit is exhausted: its health drops to
/// zero and the turn concludes without an action.
pub fn perform_ai_action(
    state: &BattleState,
    map: &BattleMap,
    unit_id: &UnitId,
    config: &CombatConfig,
) -> Result<ActionOutcome> {
    if state.is_concluded() {
        return Err(CombatError::BattleConcluded(state.id.clone()));
    }
    let unit = ai_unit(state, unit_id)?;
    if let Some((_, outcome)) = evaluate(state, map, unit, config) {
        return Ok(outcome);
    }

    let description = format!("{} is exhausted and has to give up", unit.username);
    info!(unit = %unit_id, "AI exhausted");
    let mut next = state.clone();
    if let Some(unit) = next.unit_mut(unit_id) {
        unit.pools.cur_health = 0.0;
    }
    let log = vec![ActionLogEntry::red(description.clone())];
    let mut rng = battle_rng(state);
    Ok(conclude_turn(next, description, log, vec![BattlePhase::Validating], &mut rng, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::actions::{ActionMethod, ActionTarget};
    use crate::battle::ai::profile::AiProfile;
    use crate::battle::effects::{EffectKind, EffectTemplate};

    fn bite() -> CombatAction {
        CombatAction::new("bite", "Bite", ActionKind::Jutsu, ActionTarget::Opponent, ActionMethod::Single, 1)
            .with_action_cost(50.0)
            .with_effect(EffectTemplate::new(EffectKind::Damage, 15.0))
    }

    fn duel(npc_at: OffsetCoord) -> BattleState {
        let npc = BattleUnit::new("npc_wolf", "Wolf", npc_at)
            .with_village("wild")
            .with_ai(Some(AiProfile {
                include_default_rules: true,
                ..AiProfile::default()
            }))
            .with_jutsu(bite());
        let player = BattleUnit::new("p", "Player", OffsetCoord::new(4, 0)).with_village("leaf");
        BattleState::new("duel", 11, vec![npc, player])
    }

    #[test]
    fn test_far_npc_moves_towards_opponent() {
        let state = duel(OffsetCoord::new(0, 0));
        let map = BattleMap::new(6, 3);
        let id = UnitId::new("npc_wolf");
        let decision = decide(&state, &map, &id, &CombatConfig::default()).unwrap().unwrap();
        assert_eq!(decision.action_id, MOVE_ACTION_ID);
        assert_eq!(decision.target.distance(&OffsetCoord::new(0, 0)), 1);
    }

    #[test]
    fn test_adjacent_npc_bites() {
        let state = duel(OffsetCoord::new(3, 0));
        let map = BattleMap::new(6, 3);
        let id = UnitId::new("npc_wolf");
        let outcome = perform_ai_action(&state, &map, &id, &CombatConfig::default()).unwrap();
        assert_eq!(outcome.state.units[1].pools.cur_health, 85.0);
        assert_eq!(outcome.state.units[0].action_history(), vec!["bite".to_string()]);
    }

    #[test]
    fn test_ai_without_options_is_exhausted() {
        let mut state = duel(OffsetCoord::new(0, 0));
        state.units[0].ai_profile = Some(AiProfile::default());
        state.units[0].jutsus.clear();
        state.units[0].action_points = 0.0;
        let map = BattleMap::new(6, 3);
        let outcome = perform_ai_action(&state, &map, &UnitId::new("npc_wolf"), &CombatConfig::default()).unwrap();
        assert_eq!(outcome.description, "Wolf is exhausted and has to give up");
        assert_eq!(outcome.state.units[0].pools.cur_health, 0.0);
        assert_eq!(outcome.state.version, state.version + 1);
    }

    #[test]
    fn test_human_unit_is_rejected() {
        let state = duel(OffsetCoord::new(0, 0));
        let map = BattleMap::new(6, 3);
        let result = perform_ai_action(&state, &map, &UnitId::new("p"), &CombatConfig::default());
        assert!(matches!(result, Err(CombatError::NotAiControlled(_))));
    }

    #[test]
    fn test_closest_prefers_first_on_ties() {
        let a = Candidate {
            position: OffsetCoord::new(1, 0),
            distance: 3,
        };
        let b = Candidate {
            position: OffsetCoord::new(2, 0),
            distance: 3,
        };
        assert_eq!(closest(&[a.clone(), b]), Some(a));
    }

    #[test]
    fn test_conditions() {
        let state = duel(OffsetCoord::new(0, 0));
        let unit = &state.units[0];
        let targets = RuleTargets {
            closest_opponent: Some(Candidate {
                position: OffsetCoord::new(4, 0),
                distance: 5,
            }),
            ..RuleTargets::default()
        };
        let far = Condition::DistanceHigherThan {
            value: 5,
            target: RuleTarget::ClosestOpponent,
        };
        let near = Condition::DistanceLowerThan {
            value: 2,
            target: RuleTarget::ClosestOpponent,
        };
        assert!(conditions_hold(&[far.clone()], &state, unit, &targets));
        assert!(!conditions_hold(&[far, near], &state, unit, &targets));
        assert!(conditions_hold(&[Condition::SpecificRound { value: 0 }], &state, unit, &targets));
        assert!(conditions_hold(&[Condition::NoActiveSummon], &state, unit, &targets));
        assert!(!conditions_hold(&[Condition::HealthBelow { value: 50.0 }], &state, unit, &targets));
    }
}
