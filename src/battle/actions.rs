//! Action catalogue: basic actions, jutsus and items a unit may perform
//!
//! An action is a target rule, an area shape, costs and a list of effect
//! templates. The Turn Controller looks actions up through
//! [`available_actions`] and checks [`is_affordable`] before targeting.

use serde::{Deserialize, Serialize};

use crate::battle::effects::{
    Animation, Calculation, EffectKind, EffectTemplate, EffectType, UserEffect,
};
use crate::battle::hex::OffsetCoord;
use crate::battle::units::{BattleUnit, General, Pool};
use crate::core::config::CombatConfig;
use crate::core::types::Round;

pub const BASIC_ATTACK_ID: &str = "sp";
pub const BASIC_HEAL_ID: &str = "cp";
pub const MOVE_ACTION_ID: &str = "move";
pub const FLEE_ACTION_ID: &str = "flee";
pub const WAIT_ACTION_ID: &str = "wait";

/// Where an action comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Basic,
    Jutsu,
    Item,
}

/// Which tiles an action may be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionTarget {
    #[serde(rename = "self")]
    SelfUnit,
    OtherUser,
    Opponent,
    Ally,
    Character,
    Ground,
    EmptyGround,
}

impl ActionTarget {
    /// Ground-targeted actions create ground effects instead of user effects
    pub fn is_ground(&self) -> bool {
        matches!(self, ActionTarget::Ground | ActionTarget::EmptyGround)
    }
}

/// Area shape of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionMethod {
    Single,
    Line,
    Wall,
    CircleShoot,
    SpiralShoot,
    CircleSpawn,
    All,
}

impl ActionMethod {
    /// Shapes anchored on the aimed tile (as opposed to the caster)
    pub fn is_aim_anchored(&self) -> bool {
        matches!(
            self,
            ActionMethod::Single | ActionMethod::Line | ActionMethod::Wall | ActionMethod::CircleSpawn
        )
    }
}

/// Percentage costs of an action
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionCosts {
    #[serde(default)]
    pub health_perc: f64,
    #[serde(default)]
    pub chakra_perc: f64,
    #[serde(default)]
    pub stamina_perc: f64,
    /// Percentage of a full round's action points
    #[serde(default)]
    pub action_cost_perc: f64,
}

/// Absolute pool costs after adjustment
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolCost {
    pub health: f64,
    pub chakra: f64,
    pub stamina: f64,
}

impl PoolCost {
    fn get_mut(&mut self, pool: Pool) -> &mut f64 {
        match pool {
            Pool::Health => &mut self.health,
            Pool::Chakra => &mut self.chakra,
            Pool::Stamina => &mut self.stamina,
        }
    }
}

/// A catalogue action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatAction {
    pub id: String,
    pub name: String,
    pub kind: ActionKind,
    pub target: ActionTarget,
    pub method: ActionMethod,
    pub range: u32,
    #[serde(default)]
    pub costs: ActionCosts,
    #[serde(default)]
    pub effects: Vec<EffectTemplate>,
    /// Log template with `%user`, `%target` and `%location` placeholders
    #[serde(default)]
    pub battle_description: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Not offered to AI units driven by a player
    #[serde(default)]
    pub hidden: bool,
}

fn default_level() -> u32 {
    1
}

impl CombatAction {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ActionKind,
        target: ActionTarget,
        method: ActionMethod,
        range: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            target,
            method,
            range,
            costs: ActionCosts::default(),
            effects: Vec::new(),
            battle_description: String::new(),
            level: 1,
            hidden: false,
        }
    }

    pub fn with_costs(mut self, costs: ActionCosts) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_action_cost(mut self, action_cost_perc: f64) -> Self {
        self.costs.action_cost_perc = action_cost_perc;
        self
    }

    pub fn with_effect(mut self, template: EffectTemplate) -> Self {
        self.effects.push(template);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.battle_description = description.into();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_wait(&self) -> bool {
        self.id == WAIT_ACTION_ID
    }

    pub fn is_move(&self) -> bool {
        self.id == MOVE_ACTION_ID
    }

    pub fn has_effect(&self, effect_type: EffectType) -> bool {
        self.effects.iter().any(|e| e.effect_type() == effect_type)
    }

    /// Largest effective power among templates of a given type
    pub fn max_power(&self, effect_type: EffectType) -> Option<f64> {
        self.effects
            .iter()
            .filter(|e| e.effect_type() == effect_type)
            .map(|e| e.power + self.level as f64 * e.power_per_level)
            .fold(None, |best, p| Some(best.map_or(p, |b: f64| b.max(p))))
    }

    /// Action points this action consumes for `unit`
    pub fn action_point_cost(&self, unit: &BattleUnit, config: &CombatConfig) -> f64 {
        if self.is_wait() {
            unit.action_points
        } else {
            self.costs.action_cost_perc / 100.0 * config.action_points_per_round
        }
    }

    /// Render the battle description for a performed action
    pub fn describe(&self, user: &str, target: Option<&str>, location: OffsetCoord) -> String {
        if self.battle_description.is_empty() {
            return format!("{} uses {}", user, self.name);
        }
        self.battle_description
            .replace("%user", user)
            .replace("%target", target.unwrap_or("the ground"))
            .replace("%location", &format!("[{}, {}]", location.col, location.row))
    }
}

/// The basic actions every unit may use
///
/// With `basic_moves` off only `move` and `wait` are offered.
pub fn basic_actions(unit: &BattleUnit, basic_moves: bool) -> Vec<CombatAction> {
    let mut actions = Vec::new();
    if basic_moves {
        actions.push(
            CombatAction::new(
                BASIC_ATTACK_ID,
                "Basic Attack",
                ActionKind::Basic,
                ActionTarget::OtherUser,
                ActionMethod::Single,
                1,
            )
            .with_costs(ActionCosts {
                stamina_perc: 10.0,
                action_cost_perc: 60.0,
                ..ActionCosts::default()
            })
            .with_effect(
                EffectTemplate::new(EffectKind::Damage, 1.0)
                    .power_per_level(0.1)
                    .calculation(Calculation::Formula)
                    .generals(vec![General::Strength])
                    .appear(Animation::Hit),
            )
            .with_description("%user punches %target")
            .with_level(unit.level),
        );
        actions.push(
            CombatAction::new(
                BASIC_HEAL_ID,
                "Basic Heal",
                ActionKind::Basic,
                ActionTarget::Character,
                ActionMethod::Single,
                1,
            )
            .with_costs(ActionCosts {
                chakra_perc: 1.0,
                action_cost_perc: 50.0,
                ..ActionCosts::default()
            })
            .with_effect(
                EffectTemplate::new(EffectKind::Heal, 5.0)
                    .power_per_level(0.1)
                    .appear(Animation::Heal),
            )
            .with_description("%user heals %target")
            .with_level(unit.level),
        );
    }
    actions.push(
        CombatAction::new(
            MOVE_ACTION_ID,
            "Move",
            ActionKind::Basic,
            ActionTarget::EmptyGround,
            ActionMethod::Single,
            1,
        )
        .with_action_cost(30.0)
        .with_effect(EffectTemplate::new(EffectKind::Move, 100.0))
        .with_description("%user moves to %location"),
    );
    if basic_moves {
        actions.push(
            CombatAction::new(
                FLEE_ACTION_ID,
                "Flee",
                ActionKind::Basic,
                ActionTarget::SelfUnit,
                ActionMethod::Single,
                0,
            )
            .with_costs(ActionCosts {
                health_perc: 0.1,
                action_cost_perc: 100.0,
                ..ActionCosts::default()
            })
            .with_effect(EffectTemplate::new(EffectKind::Flee, 20.0))
            .with_description("%user attempts to flee the battle"),
        );
    }
    if unit.action_points > 0.0 {
        actions.push(
            CombatAction::new(
                WAIT_ACTION_ID,
                "End Turn",
                ActionKind::Basic,
                ActionTarget::SelfUnit,
                ActionMethod::Single,
                0,
            )
            .with_description("%user ends the turn"),
        );
    }
    actions
}

/// Basic actions, then jutsus, then items
pub fn available_actions(unit: &BattleUnit, basic_moves: bool) -> Vec<CombatAction> {
    let mut actions = basic_actions(unit, basic_moves);
    actions.extend(unit.jutsus.iter().cloned());
    actions.extend(unit.items.iter().cloned());
    actions
}

/// Pool costs of `action` for `unit`, adjusted by its active
/// `poolcostadjust` effects
pub fn pool_cost(
    action: &CombatAction,
    unit: &BattleUnit,
    user_effects: &[UserEffect],
    round: Round,
) -> PoolCost {
    let mut cost = PoolCost {
        health: action.costs.health_perc / 100.0 * unit.pools.max_health,
        chakra: action.costs.chakra_perc / 100.0 * unit.pools.max_chakra,
        stamina: action.costs.stamina_perc / 100.0 * unit.pools.max_stamina,
    };
    let adjustments = user_effects.iter().filter(|ue| {
        ue.target_unit() == Some(&unit.user_id)
            && ue.effect_type() == EffectType::PoolCostAdjust
            && ue.effect.is_active(round)
    });
    for adjustment in adjustments {
        let EffectKind::PoolCostAdjust { pools } = &adjustment.effect.kind else {
            continue;
        };
        let power = adjustment.effect.effective_power();
        for pool in pools {
            let value = cost.get_mut(*pool);
            *value = match adjustment.effect.calculation {
                Calculation::Percentage => *value * (100.0 + power) / 100.0,
                _ => *value + power,
            }
            .max(0.0);
        }
    }
    cost
}

/// Enough pools and action points to perform `action`
pub fn is_affordable(
    action: &CombatAction,
    unit: &BattleUnit,
    user_effects: &[UserEffect],
    round: Round,
    config: &CombatConfig,
) -> bool {
    let cost = pool_cost(action, unit, user_effects, round);
    let points = action.action_point_cost(unit, config);
    unit.pools.cur_health >= cost.health
        && unit.pools.cur_chakra >= cost.chakra
        && unit.pools.cur_stamina >= cost.stamina
        && unit.action_points >= points
}
