//! Battle turn controller
//!
//! One call per action: validate -> realize effects -> resolve -> results ->
//! round progression. Every call works on a private clone of the snapshot and
//! returns the next snapshot; a failed action leaves the input untouched.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::actions::{available_actions, is_affordable, pool_cost, CombatAction};
use crate::battle::battle_map::BattleMap;
use crate::battle::effects::{EffectTarget, EffectType, GroundEffect, TemplateTarget, UserEffect};
use crate::battle::hex::OffsetCoord;
use crate::battle::log::ActionLogEntry;
use crate::battle::resolution::{resolve, ResolutionInput};
use crate::battle::results::{collect_results, BattleResult};
use crate::battle::tags::effective_stats;
use crate::battle::targeting::{barrier_at, multiple_villages, occupant_at, TargetingContext};
use crate::battle::units::{BattleUnit, General, StatAxis, UsedAction};
use crate::core::config::{config, CombatConfig};
use crate::core::error::{CombatError, Result};
use crate::core::types::{BattleId, IdAllocator, Round, UnitId};

/// Where a battle is in handling an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Idle,
    Validating,
    Resolving,
    Concluded,
}

/// Serializable battle snapshot
///
/// The map is not part of the snapshot; callers pass it alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub id: BattleId,
    pub seed: u64,
    pub version: u64,
    pub round: Round,
    pub units: Vec<BattleUnit>,
    pub user_effects: Vec<UserEffect>,
    pub ground_effects: Vec<GroundEffect>,
    pub phase: BattlePhase,
    pub ids: IdAllocator,
    /// Results of every unit that has left, in leaving order
    #[serde(default)]
    pub results: Vec<BattleResult>,
    /// Multiplier on ELO gains, set per battle type
    pub reward_scaling: f64,
}

impl BattleState {
    pub fn new(id: impl Into<String>, seed: u64, units: Vec<BattleUnit>) -> Self {
        Self {
            id: BattleId::new(id),
            seed,
            version: 0,
            round: 0,
            units,
            user_effects: Vec::new(),
            ground_effects: Vec::new(),
            phase: BattlePhase::Idle,
            ids: IdAllocator::default(),
            results: Vec::new(),
            reward_scaling: 1.0,
        }
    }

    pub fn with_ground_effect(mut self, effect: GroundEffect) -> Self {
        self.ground_effects.push(effect);
        self
    }

    pub fn with_user_effect(mut self, effect: UserEffect) -> Self {
        self.user_effects.push(effect);
        self
    }

    pub fn unit(&self, id: &UnitId) -> Option<&BattleUnit> {
        self.units.iter().find(|u| &u.user_id == id)
    }

    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut BattleUnit> {
        self.units.iter_mut().find(|u| &u.user_id == id)
    }

    pub fn is_concluded(&self) -> bool {
        self.phase == BattlePhase::Concluded
    }
}

/// A request to perform one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub unit_id: UnitId,
    pub action_id: String,
    pub target: OffsetCoord,
}

impl ActionRequest {
    pub fn new(unit_id: impl Into<String>, action_id: impl Into<String>, target: OffsetCoord) -> Self {
        Self {
            unit_id: UnitId::new(unit_id),
            action_id: action_id.into(),
            target,
        }
    }
}

/// Result of a performed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub state: BattleState,
    pub description: String,
    pub log: Vec<ActionLogEntry>,
    /// Results of units that left the battle with this action
    pub results: Vec<BattleResult>,
    /// Phases the battle passed through, last one is `state.phase`
    pub transitions: Vec<BattlePhase>,
}

/// Deterministic RNG for the next action on `state`
pub fn battle_rng(state: &BattleState) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(state.seed.wrapping_add(state.version))
}

/// Active stun on `unit` this round
pub fn is_stunned(state: &BattleState, unit: &UnitId) -> bool {
    state.user_effects.iter().any(|ue| {
        ue.effect_type() == EffectType::Stun
            && ue.target_unit() == Some(unit)
            && ue.effect.is_active(state.round)
    })
}

/// AI-driven unit fighting on behalf of a player
pub fn is_player_controlled_ai(unit: &BattleUnit, config: &CombatConfig) -> bool {
    unit.is_ai && !unit.is_summon && !unit.user_id.as_str().starts_with(&config.npc_id_prefix)
}

/// Actions `unit` may pick right now
///
/// Units on auto-combat for a player never get hidden actions.
pub fn usable_actions(
    state: &BattleState,
    unit: &BattleUnit,
    basic_moves: bool,
    config: &CombatConfig,
) -> Vec<CombatAction> {
    let restricted = is_player_controlled_ai(unit, config);
    available_actions(unit, basic_moves)
        .into_iter()
        .filter(|a| !(restricted && a.hidden))
        .filter(|a| is_affordable(a, unit, &state.user_effects, state.round, config))
        .collect()
}

/// Perform one action using the global configuration
pub fn perform_action(state: &BattleState, map: &BattleMap, request: &ActionRequest) -> Result<ActionOutcome> {
    perform_action_with(state, map, request, config())
}

/// Perform one action against an explicit configuration
pub fn perform_action_with(
    state: &BattleState,
    map: &BattleMap,
    request: &ActionRequest,
    config: &CombatConfig,
) -> Result<ActionOutcome> {
    if state.is_concluded() {
        return Err(CombatError::BattleConcluded(state.id.clone()));
    }
    let mut transitions = vec![BattlePhase::Validating];

    let actor = state
        .unit(&request.unit_id)
        .ok_or_else(|| CombatError::UnitNotFound(request.unit_id.clone()))?;
    if !actor.in_battle() {
        return Err(CombatError::UnitNotInBattle(request.unit_id.clone()));
    }

    let action = available_actions(actor, true)
        .into_iter()
        .find(|a| a.id == request.action_id)
        .ok_or_else(|| CombatError::ActionNotFound {
            unit_id: actor.user_id.clone(),
            action_id: request.action_id.clone(),
        })?;
    if action.hidden && is_player_controlled_ai(actor, config) {
        return Err(CombatError::ActionNotFound {
            unit_id: actor.user_id.clone(),
            action_id: request.action_id.clone(),
        });
    }
    if !is_affordable(&action, actor, &state.user_effects, state.round, config) {
        return Err(CombatError::ActionNotAffordable {
            unit_id: actor.user_id.clone(),
            action_id: request.action_id.clone(),
        });
    }

    let mut next = state.clone();
    let mut rng = battle_rng(state);
    let mut log = Vec::new();

    let description = if is_stunned(state, &actor.user_id) {
        let text = format!("{} is stunned and cannot move", actor.username);
        if let Some(unit) = next.unit_mut(&request.unit_id) {
            unit.action_points = 0.0;
        }
        log.push(ActionLogEntry::blue(text.clone()));
        text
    } else {
        let context = TargetingContext {
            map,
            units: &state.units,
            ground_effects: &state.ground_effects,
            actor,
            action: &action,
        };
        let affected = context.affected_tiles(request.target);
        let possible = if action.method.is_aim_anchored() {
            affected.is_accepted(request.target)
        } else {
            !affected.accepted.is_empty()
        };
        if !possible {
            return Err(CombatError::ActionNotPossible {
                action_id: action.id.clone(),
                col: request.target.col,
                row: request.target.row,
            });
        }

        realize_action(&mut next, actor, &action, &affected.accepted, config);

        let target_name = occupant_at(&state.units, request.target).map(|u| u.username.as_str());
        action.describe(&actor.username, target_name, request.target)
    };

    transitions.push(BattlePhase::Resolving);
    let resolution = {
        let input = ResolutionInput {
            units: &next.units,
            user_effects: &next.user_effects,
            ground_effects: &next.ground_effects,
            round: next.round,
            actor: &request.unit_id,
        };
        resolve(&input, config, &mut rng, &mut next.ids)
    };
    next.units = resolution.units;
    next.user_effects = resolution.user_effects;
    next.ground_effects = resolution.ground_effects;
    log.extend(resolution.log);

    info!(
        battle = %state.id,
        unit = %request.unit_id,
        action = %request.action_id,
        col = request.target.col,
        row = request.target.row,
        "Action performed"
    );

    Ok(conclude_turn(next, description, log, transitions, &mut rng, config))
}

/// Results, round progression and versioning after an action
pub(crate) fn conclude_turn(
    mut next: BattleState,
    description: String,
    log: Vec<ActionLogEntry>,
    mut transitions: Vec<BattlePhase>,
    rng: &mut ChaCha8Rng,
    config: &CombatConfig,
) -> ActionOutcome {
    let results = collect_results(&mut next.units, next.reward_scaling, config, rng);
    next.results.extend(results.iter().cloned());

    if round_is_over(&next, config) {
        next.round += 1;
        for unit in next.units.iter_mut().filter(|u| u.in_battle()) {
            unit.action_points = config.action_points_per_round;
        }
        for ue in next.user_effects.iter_mut() {
            ue.effect.cast_this_round = false;
        }
        for ge in next.ground_effects.iter_mut() {
            ge.effect.cast_this_round = false;
        }
        debug!(battle = %next.id, round = next.round, "Round advanced");
    }

    next.version += 1;
    next.phase = if next.units.iter().filter(|u| u.is_original).all(|u| u.left_battle) {
        info!(battle = %next.id, version = next.version, "Battle concluded");
        BattlePhase::Concluded
    } else {
        BattlePhase::Idle
    };
    transitions.push(next.phase);

    ActionOutcome {
        state: next,
        description,
        log,
        results,
        transitions,
    }
}

/// No unit still in battle can afford anything but ending its turn
fn round_is_over(state: &BattleState, config: &CombatConfig) -> bool {
    !state.units.iter().filter(|u| u.in_battle()).any(|unit| {
        available_actions(unit, true)
            .iter()
            .any(|a| !a.is_wait() && is_affordable(a, unit, &state.user_effects, state.round, config))
    })
}

/// Turn the action's templates into effects on `next` and pay for it
fn realize_action(
    next: &mut BattleState,
    actor: &BattleUnit,
    action: &CombatAction,
    accepted: &[OffsetCoord],
    config: &CombatConfig,
) {
    let round = next.round;
    let stats = effective_stats(actor, &next.user_effects, round);
    let multi_village = multiple_villages(&next.units);
    let mut user_effects = Vec::new();
    let mut ground_effects = Vec::new();

    for template in &action.effects {
        let realize = |ids: &mut IdAllocator| {
            template.realize(actor, &stats, action.level, round, ids.next_effect_id())
        };

        if template.target == TemplateTarget::SelfUnit {
            let effect = realize(&mut next.ids);
            user_effects.push(UserEffect::on_unit(effect, actor.user_id.clone()));
            continue;
        }

        for &coord in accepted {
            if action.target.is_ground() {
                let effect = realize(&mut next.ids);
                ground_effects.push(GroundEffect::new(effect, coord));
                continue;
            }
            if let Some(occupant) = occupant_at(&next.units, coord) {
                let effect = realize(&mut next.ids);
                if effect.lands_on(occupant, multi_village) {
                    user_effects.push(UserEffect::on_unit(effect, occupant.user_id.clone()));
                }
            } else if template.effect_type() == EffectType::Damage {
                if let Some(barrier) = barrier_at(&next.ground_effects, coord) {
                    let target = EffectTarget::Barrier(barrier.effect.id);
                    let effect = realize(&mut next.ids);
                    user_effects.push(UserEffect::new(effect, target));
                }
            }
        }
    }

    let cost = pool_cost(action, actor, &next.user_effects, round);
    let points = action.action_point_cost(actor, config);
    let (used_stats, used_generals) = used_selectors(actor, action);

    if let Some(unit) = next.unit_mut(&actor.user_id) {
        unit.pools.cur_health = (unit.pools.cur_health - cost.health).max(0.0);
        unit.pools.cur_chakra = (unit.pools.cur_chakra - cost.chakra).max(0.0);
        unit.pools.cur_stamina = (unit.pools.cur_stamina - cost.stamina).max(0.0);
        unit.action_points = (unit.action_points - points).max(0.0);
        unit.used_actions.push(UsedAction {
            id: action.id.clone(),
            kind: action.kind,
        });
        for axis in used_stats {
            if !unit.used_stats.contains(&axis) {
                unit.used_stats.push(axis);
            }
        }
        for general in used_generals {
            if !unit.used_generals.contains(&general) {
                unit.used_generals.push(general);
            }
        }
    }

    debug!(
        unit = %actor.user_id,
        action = %action.id,
        user_effects = user_effects.len(),
        ground_effects = ground_effects.len(),
        "Realized action"
    );
    next.user_effects.extend(user_effects);
    next.ground_effects.extend(ground_effects);
}

/// Offence axes and generals an action draws on
fn used_selectors(actor: &BattleUnit, action: &CombatAction) -> (Vec<StatAxis>, Vec<General>) {
    let mut stats = Vec::new();
    let mut generals = Vec::new();
    for template in &action.effects {
        for stat in &template.selectors.stat_types {
            stats.push(
                stat.axes()
                    .map_or(actor.stats.highest_offence_type, |(offence, _)| offence),
            );
        }
        generals.extend(template.selectors.general_types.iter().copied());
    }
    (stats, generals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::actions::{ActionKind, ActionMethod, ActionTarget};
    use crate::battle::effects::{EffectKind, EffectTemplate};
    use crate::battle::units::StatType;

    fn arena() -> (BattleState, BattleMap) {
        let units = vec![
            BattleUnit::new("a", "A", OffsetCoord::new(1, 1)).with_village("leaf"),
            BattleUnit::new("b", "B", OffsetCoord::new(2, 1)).with_village("sand"),
        ];
        (BattleState::new("battle-1", 42, units), BattleMap::new(6, 4))
    }

    fn strike(power: f64) -> CombatAction {
        CombatAction::new(
            "strike",
            "Strike",
            ActionKind::Jutsu,
            ActionTarget::Opponent,
            ActionMethod::Single,
            2,
        )
        .with_action_cost(40.0)
        .with_effect(EffectTemplate::new(EffectKind::Damage, power))
        .with_description("%user strikes %target")
    }

    #[test]
    fn test_static_damage_action() {
        let (mut state, map) = arena();
        state.units[0].jutsus.push(strike(20.0));
        let request = ActionRequest::new("a", "strike", OffsetCoord::new(2, 1));
        let outcome = perform_action_with(&state, &map, &request, &CombatConfig::default()).unwrap();

        assert_eq!(outcome.description, "A strikes B");
        assert_eq!(outcome.state.units[1].pools.cur_health, 80.0);
        assert_eq!(outcome.state.units[0].action_points, 60.0);
        assert_eq!(outcome.state.version, 1);
        assert_eq!(outcome.state.phase, BattlePhase::Idle);
        assert_eq!(
            outcome.transitions,
            vec![BattlePhase::Validating, BattlePhase::Resolving, BattlePhase::Idle]
        );
        assert!(outcome.log.iter().any(|l| l.text == "B takes 20 damage"));
        assert_eq!(outcome.state.units[0].action_history(), vec!["strike".to_string()]);
        // Input snapshot is untouched
        assert_eq!(state.version, 0);
        assert_eq!(state.units[1].pools.cur_health, 100.0);
    }

    #[test]
    fn test_unknown_action_and_unit() {
        let (state, map) = arena();
        let config = CombatConfig::default();
        let missing = ActionRequest::new("a", "fireball", OffsetCoord::new(2, 1));
        assert!(matches!(
            perform_action_with(&state, &map, &missing, &config),
            Err(CombatError::ActionNotFound { .. })
        ));
        let ghost = ActionRequest::new("zed", "wait", OffsetCoord::new(2, 1));
        assert!(matches!(
            perform_action_with(&state, &map, &ghost, &config),
            Err(CombatError::UnitNotFound(_))
        ));
    }

    #[test]
    fn test_out_of_range_is_not_possible() {
        let (mut state, map) = arena();
        state.units[0].jutsus.push(strike(20.0));
        let request = ActionRequest::new("a", "strike", OffsetCoord::new(5, 3));
        let result = perform_action_with(&state, &map, &request, &CombatConfig::default());
        assert!(matches!(result, Err(CombatError::ActionNotPossible { col: 5, row: 3, .. })));
    }

    #[test]
    fn test_unaffordable_action() {
        let (mut state, map) = arena();
        state.units[0].jutsus.push(strike(20.0));
        state.units[0].action_points = 10.0;
        let request = ActionRequest::new("a", "strike", OffsetCoord::new(2, 1));
        let result = perform_action_with(&state, &map, &request, &CombatConfig::default());
        assert!(matches!(result, Err(CombatError::ActionNotAffordable { .. })));
    }

    #[test]
    fn test_move_relocates_actor() {
        let (state, map) = arena();
        let request = ActionRequest::new("a", "move", OffsetCoord::new(1, 2));
        let outcome = perform_action_with(&state, &map, &request, &CombatConfig::default()).unwrap();
        assert_eq!(outcome.state.units[0].position, OffsetCoord::new(1, 2));
        assert_eq!(outcome.state.units[0].action_points, 70.0);
        assert_eq!(outcome.description, "A moves to [1, 2]");
    }

    #[test]
    fn test_round_advances_when_everyone_waited() {
        let (state, map) = arena();
        let config = CombatConfig::default();
        let first = perform_action_with(&state, &map, &ActionRequest::new("a", "wait", OffsetCoord::new(1, 1)), &config)
            .unwrap();
        assert_eq!(first.state.round, 0);
        assert_eq!(first.state.units[0].action_points, 0.0);

        let second = perform_action_with(
            &first.state,
            &map,
            &ActionRequest::new("b", "wait", OffsetCoord::new(2, 1)),
            &config,
        )
        .unwrap();
        assert_eq!(second.state.round, 1);
        assert!(second.state.units.iter().all(|u| u.action_points == 100.0));
        assert_eq!(second.state.version, 2);
    }

    #[test]
    fn test_killing_blow_concludes_battle() {
        let (mut state, map) = arena();
        state.units[0].jutsus.push(strike(500.0));
        let request = ActionRequest::new("a", "strike", OffsetCoord::new(2, 1));
        let outcome = perform_action_with(&state, &map, &request, &CombatConfig::default()).unwrap();
        assert_eq!(outcome.state.phase, BattlePhase::Concluded);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.state.results.len(), 2);

        let again = perform_action_with(
            &outcome.state,
            &map,
            &ActionRequest::new("a", "wait", OffsetCoord::new(1, 1)),
            &CombatConfig::default(),
        );
        assert!(matches!(again, Err(CombatError::BattleConcluded(_))));
    }

    #[test]
    fn test_basic_attack_records_strength() {
        let (state, map) = arena();
        let request = ActionRequest::new("a", "sp", OffsetCoord::new(2, 1));
        let outcome = perform_action_with(&state, &map, &request, &CombatConfig::default()).unwrap();
        assert_eq!(outcome.state.units[0].used_generals, vec![General::Strength]);
        assert!(outcome.state.units[0].used_stats.is_empty());
        assert!(outcome.state.units[1].pools.cur_health < 100.0);
        assert_eq!(outcome.state.units[0].pools.cur_stamina, 90.0);
    }

    #[test]
    fn test_used_selectors_resolve_highest() {
        let mut actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        actor.stats.genjutsu_offence = 50.0;
        actor.stats.recompute_highest();
        let action = strike(1.0).with_effect(
            EffectTemplate::new(EffectKind::Damage, 1.0).stats(vec![StatType::Highest, StatType::Taijutsu]),
        );
        let (stats, generals) = used_selectors(&actor, &action);
        assert_eq!(stats, vec![StatAxis::GenjutsuOffence, StatAxis::TaijutsuOffence]);
        assert!(generals.is_empty());
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let (state, map) = arena();
        let request = ActionRequest::new("a", "sp", OffsetCoord::new(2, 1));
        let config = CombatConfig::default();
        let first = perform_action_with(&state, &map, &request, &config).unwrap();
        let second = perform_action_with(&state, &map, &request, &config).unwrap();
        assert_eq!(first, second);
    }
}
