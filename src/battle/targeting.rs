//! Targeting: which tiles an action touches and which of them are legal

use serde::{Deserialize, Serialize};

use crate::battle::actions::{ActionMethod, ActionTarget, CombatAction};
use crate::battle::battle_map::BattleMap;
use crate::battle::effects::{EffectType, GroundEffect};
use crate::battle::hex::OffsetCoord;
use crate::battle::units::BattleUnit;

/// Tiles touched by an action, split by legality, each in shape order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedTiles {
    pub accepted: Vec<OffsetCoord>,
    pub rejected: Vec<OffsetCoord>,
}

impl AffectedTiles {
    fn push(&mut self, coord: OffsetCoord, valid: bool) {
        if self.accepted.contains(&coord) || self.rejected.contains(&coord) {
            return;
        }
        if valid {
            self.accepted.push(coord);
        } else {
            self.rejected.push(coord);
        }
    }

    pub fn is_accepted(&self, coord: OffsetCoord) -> bool {
        self.accepted.contains(&coord)
    }
}

/// Everything targeting needs to know about the battle
pub struct TargetingContext<'a> {
    pub map: &'a BattleMap,
    pub units: &'a [BattleUnit],
    pub ground_effects: &'a [GroundEffect],
    pub actor: &'a BattleUnit,
    pub action: &'a CombatAction,
}

impl<'a> TargetingContext<'a> {
    /// Tiles the action touches when aimed at `aimed`
    pub fn affected_tiles(&self, aimed: OffsetCoord) -> AffectedTiles {
        let origin = self.actor.position;
        let range = self.action.range;
        let mut affected = AffectedTiles::default();

        if self.action.method == ActionMethod::All {
            for coord in self.map.coords() {
                if self.is_valid_move(coord) {
                    affected.push(coord, true);
                }
            }
            return affected;
        }

        if !self.map.contains(aimed) || origin.distance(&aimed) > range {
            return affected;
        }

        let tiles = match self.action.method {
            ActionMethod::Single => vec![aimed],
            ActionMethod::CircleSpawn => self.map.spiral(aimed, 1),
            ActionMethod::Line => self.map.line(aimed, origin),
            ActionMethod::Wall => {
                let distance = origin.distance(&aimed);
                let mut tiles = vec![aimed];
                tiles.extend(
                    self.map
                        .neighbors(aimed)
                        .into_iter()
                        .filter(|n| n.distance(&origin) == distance),
                );
                tiles
            }
            ActionMethod::CircleShoot => self.map.ring(origin, range),
            ActionMethod::SpiralShoot => self
                .map
                .spiral(origin, range)
                .into_iter()
                .filter(|c| *c != origin)
                .collect(),
            ActionMethod::All => Vec::new(),
        };

        for coord in tiles {
            affected.push(coord, self.is_valid_move(coord));
        }
        affected
    }

    /// Whether the action may touch `coord`
    pub fn is_valid_move(&self, coord: OffsetCoord) -> bool {
        if barrier_at(self.ground_effects, coord).is_some() {
            return self.action.has_effect(EffectType::Damage);
        }
        let occupant = occupant_at(self.units, coord);
        let multi_village = multiple_villages(self.units);
        match self.action.target {
            ActionTarget::Character => occupant.is_some(),
            ActionTarget::Opponent => {
                occupant.is_some_and(|o| !same_faction(o, self.actor, multi_village))
            }
            ActionTarget::OtherUser => occupant.is_some_and(|o| o.user_id != self.actor.user_id),
            ActionTarget::Ally => occupant.is_some_and(|o| same_faction(o, self.actor, multi_village)),
            ActionTarget::SelfUnit => occupant.is_some_and(|o| o.user_id == self.actor.user_id),
            ActionTarget::EmptyGround => occupant.is_none(),
            ActionTarget::Ground => !(self.action.is_move() && occupant.is_some()),
        }
    }

    /// Tiles worth aiming at, used to enumerate AI options
    pub fn possible_action_tiles(&self) -> Vec<OffsetCoord> {
        possible_action_tiles(self.map, self.action, self.actor.position)
    }
}

/// Candidate aim tiles for `action` cast from `origin`
pub fn possible_action_tiles(
    map: &BattleMap,
    action: &CombatAction,
    origin: OffsetCoord,
) -> Vec<OffsetCoord> {
    match action.method {
        ActionMethod::All => map.coords().collect(),
        _ => map.spiral(origin, action.range),
    }
}

/// The living, non-fled unit standing on `coord`
pub fn occupant_at(units: &[BattleUnit], coord: OffsetCoord) -> Option<&BattleUnit> {
    units
        .iter()
        .find(|u| u.position == coord && u.still_in_battle())
}

/// The barrier standing on `coord`
pub fn barrier_at(ground_effects: &[GroundEffect], coord: OffsetCoord) -> Option<&GroundEffect> {
    ground_effects
        .iter()
        .find(|g| g.position == coord && g.is_barrier())
}

/// More than one village is represented among the units
pub fn multiple_villages(units: &[BattleUnit]) -> bool {
    let mut first: Option<&str> = None;
    for village in units.iter().filter_map(|u| u.village_id.as_deref()) {
        match first {
            None => first = Some(village),
            Some(seen) if seen != village => return true,
            Some(_) => {}
        }
    }
    false
}

/// Village when several villages fight, otherwise the controller
pub fn faction_of(unit: &BattleUnit, multi_village: bool) -> &str {
    match (&unit.village_id, multi_village) {
        (Some(village), true) => village.as_str(),
        _ => unit.controller_id.as_str(),
    }
}

pub fn same_faction(a: &BattleUnit, b: &BattleUnit, multi_village: bool) -> bool {
    faction_of(a, multi_village) == faction_of(b, multi_village)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::actions::{basic_actions, ActionKind};
    use crate::battle::effects::{EffectKind, EffectTemplate};
    use crate::core::types::EffectId;

    fn jutsu(target: ActionTarget, method: ActionMethod, range: u32) -> CombatAction {
        CombatAction::new("j", "Jutsu", ActionKind::Jutsu, target, method, range)
            .with_effect(EffectTemplate::new(EffectKind::Damage, 10.0))
    }

    fn barrier(at: OffsetCoord, owner: &BattleUnit) -> GroundEffect {
        let effect = EffectTemplate::new(EffectKind::Barrier, 50.0)
            .rounds(5)
            .realize(owner, &owner.stats, 0, 0, EffectId(7));
        GroundEffect::new(effect, at)
    }

    #[test]
    fn test_circle_shoot_accepts_ring() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::Ground, ActionMethod::CircleShoot, 2);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let affected = ctx.affected_tiles(OffsetCoord::new(5, 3));
        assert_eq!(affected.accepted.len(), 12);
        assert!(affected
            .accepted
            .iter()
            .all(|c| c.distance(&actor.position) == 2));
        assert!(affected.rejected.is_empty());
    }

    #[test]
    fn test_single_out_of_range_is_empty() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::Ground, ActionMethod::Single, 1);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        assert_eq!(ctx.affected_tiles(OffsetCoord::new(3, 0)), AffectedTiles::default());
    }

    #[test]
    fn test_opponent_and_ally_by_faction() {
        let map = BattleMap::new(5, 5);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let enemy = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let summon = BattleUnit::new("s", "S", OffsetCoord::new(0, 1))
            .with_controller(actor.user_id.clone());
        let units = vec![actor.clone(), enemy, summon];
        let opponent = jutsu(ActionTarget::Opponent, ActionMethod::Single, 1);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &opponent,
        };
        assert!(ctx.is_valid_move(OffsetCoord::new(1, 0)));
        assert!(!ctx.is_valid_move(OffsetCoord::new(0, 1)));

        let ally = jutsu(ActionTarget::Ally, ActionMethod::Single, 1);
        let ctx = TargetingContext {
            action: &ally,
            ..ctx
        };
        assert!(ctx.is_valid_move(OffsetCoord::new(0, 1)));
        assert!(ctx.is_valid_move(OffsetCoord::new(0, 0)));
        assert!(!ctx.is_valid_move(OffsetCoord::new(1, 0)));
    }

    #[test]
    fn test_villages_decide_faction_when_several() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0)).with_village("leaf");
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0)).with_village("leaf");
        let c = BattleUnit::new("c", "C", OffsetCoord::new(2, 0)).with_village("sand");
        let units = vec![a.clone(), b.clone(), c.clone()];
        let multi = multiple_villages(&units);
        assert!(multi);
        assert!(same_faction(&a, &b, multi));
        assert!(!same_faction(&a, &c, multi));
        assert!(!multiple_villages(&units[..2]));
        assert!(!same_faction(&a, &b, false));
    }

    #[test]
    fn test_barrier_needs_damage() {
        let map = BattleMap::new(5, 5);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let units = vec![actor.clone()];
        let ground = vec![barrier(OffsetCoord::new(1, 0), &actor)];
        let moves = basic_actions(&actor, false);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &ground,
            actor: &actor,
            action: &moves[0],
        };
        assert!(!ctx.is_valid_move(OffsetCoord::new(1, 0)));
        let attack = jutsu(ActionTarget::Opponent, ActionMethod::Single, 1);
        let ctx = TargetingContext {
            action: &attack,
            ..ctx
        };
        assert!(ctx.is_valid_move(OffsetCoord::new(1, 0)));
    }

    #[test]
    fn test_ground_move_blocked_by_occupant() {
        let map = BattleMap::new(5, 5);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let other = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let units = vec![actor.clone(), other];
        let mut walk = basic_actions(&actor, false).remove(0);
        walk.target = ActionTarget::Ground;
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &walk,
        };
        assert!(!ctx.is_valid_move(OffsetCoord::new(1, 0)));
        assert!(ctx.is_valid_move(OffsetCoord::new(0, 1)));
    }

    #[test]
    fn test_wall_is_perpendicular() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::Ground, ActionMethod::Wall, 3);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let aimed = OffsetCoord::new(7, 5);
        let affected = ctx.affected_tiles(aimed);
        assert_eq!(affected.accepted[0], aimed);
        assert!(affected.accepted.len() >= 2);
        assert!(affected
            .accepted
            .iter()
            .all(|c| c.distance(&actor.position) == 2));
    }

    #[test]
    fn test_all_only_lists_valid_tiles() {
        let map = BattleMap::new(4, 4);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let enemy = BattleUnit::new("b", "B", OffsetCoord::new(3, 3));
        let units = vec![actor.clone(), enemy];
        let action = jutsu(ActionTarget::Opponent, ActionMethod::All, 0);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let affected = ctx.affected_tiles(OffsetCoord::new(0, 0));
        assert_eq!(affected.accepted, vec![OffsetCoord::new(3, 3)]);
        assert!(affected.rejected.is_empty());
        assert_eq!(ctx.possible_action_tiles().len(), 16);
    }

    #[test]
    fn test_circle_spawn_covers_aimed_and_neighbors() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::EmptyGround, ActionMethod::CircleSpawn, 2);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let aimed = OffsetCoord::new(7, 5);
        let affected = ctx.affected_tiles(aimed);
        assert_eq!(affected.accepted.len(), 7);
        assert_eq!(affected.accepted[0], aimed);
        assert!(affected.accepted.iter().all(|c| c.distance(&aimed) <= 1));
        assert!(affected.rejected.is_empty());
    }

    #[test]
    fn test_circle_spawn_beyond_range_is_empty() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::EmptyGround, ActionMethod::CircleSpawn, 1);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        assert_eq!(ctx.affected_tiles(OffsetCoord::new(7, 5)), AffectedTiles::default());
        let possible = ctx.possible_action_tiles();
        assert_eq!(possible.len(), 7);
        assert!(possible.iter().all(|c| c.distance(&actor.position) <= 1));
    }

    #[test]
    fn test_spiral_shoot_skips_origin() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::Ground, ActionMethod::SpiralShoot, 2);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let affected = ctx.affected_tiles(OffsetCoord::new(6, 5));
        assert_eq!(affected.accepted.len(), 18);
        assert!(!affected.accepted.contains(&actor.position));
        assert!(affected
            .accepted
            .iter()
            .all(|c| (1..=2).contains(&c.distance(&actor.position))));
    }

    #[test]
    fn test_line_runs_back_to_origin() {
        let map = BattleMap::new(10, 10);
        let actor = BattleUnit::new("a", "A", OffsetCoord::new(5, 5));
        let units = vec![actor.clone()];
        let action = jutsu(ActionTarget::Ground, ActionMethod::Line, 3);
        let ctx = TargetingContext {
            map: &map,
            units: &units,
            ground_effects: &[],
            actor: &actor,
            action: &action,
        };
        let aimed = OffsetCoord::new(8, 5);
        let affected = ctx.affected_tiles(aimed);
        assert_eq!(
            affected.accepted,
            vec![
                OffsetCoord::new(8, 5),
                OffsetCoord::new(7, 5),
                OffsetCoord::new(6, 5),
                OffsetCoord::new(5, 5),
            ]
        );
    }
}
