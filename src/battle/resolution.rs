//! Effect resolution
//!
//! One pass over every ground and user effect of a battle after an action:
//!
//! 1. Ground pass: moves, clones and summons act on the roster; other
//!    ground effects are converted into transient user effects on the unit
//!    standing on their tile (or onto a barrier for damage).
//! 2. User pass: effects are dispatched by kind in [`RESOLUTION_ORDER`]
//!    order. Damage and heal produce [`Consequence`]s which the modifier
//!    kinds (absorb, reflect, damage/heal adjust) may rewrite.
//! 3. Consequences are collapsed per target and applied once, clamped to the
//!    pools' bounds.
//!
//! Inputs are borrowed; the pass works on clones and returns new vectors.
//!
//! [`RESOLUTION_ORDER`]: crate::battle::effects::RESOLUTION_ORDER

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::effects::{
    Animation, Effect, EffectKind, EffectTarget, EffectType, GroundEffect, StatSelectors,
    UserEffect,
};
use crate::battle::hex::OffsetCoord;
use crate::battle::log::{format_amount, ActionLogEntry};
use crate::battle::tags;
use crate::battle::targeting::multiple_villages;
use crate::battle::units::{BattleUnit, Pool};
use crate::core::config::CombatConfig;
use crate::core::types::{EffectId, IdAllocator, Round, UnitId};

/// Pending pool changes produced by one effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consequence {
    pub effect_id: Option<EffectId>,
    /// Selectors of the producing effect, matched by modifiers
    pub selectors: StatSelectors,
    pub user_id: UnitId,
    pub target_id: UnitId,
    pub damage: f64,
    pub heal: f64,
    /// Damage bounced back to `user_id`
    pub reflect: f64,
    pub absorb_health: f64,
    pub absorb_chakra: f64,
    pub absorb_stamina: f64,
}

impl Consequence {
    pub fn new(user_id: UnitId, target_id: UnitId) -> Self {
        Self {
            effect_id: None,
            selectors: StatSelectors::default(),
            user_id,
            target_id,
            damage: 0.0,
            heal: 0.0,
            reflect: 0.0,
            absorb_health: 0.0,
            absorb_chakra: 0.0,
            absorb_stamina: 0.0,
        }
    }

    pub fn absorb_mut(&mut self, pool: Pool) -> &mut f64 {
        match pool {
            Pool::Health => &mut self.absorb_health,
            Pool::Chakra => &mut self.absorb_chakra,
            Pool::Stamina => &mut self.absorb_stamina,
        }
    }
}

/// Sum consequences per target, keeping first-appearance order
///
/// Reflect stays attributed to each consequence's user and is returned
/// separately, summed per user.
pub fn collapse(consequences: &[Consequence]) -> (Vec<Consequence>, Vec<(UnitId, f64)>) {
    let mut per_target: Vec<Consequence> = Vec::new();
    let mut reflected: Vec<(UnitId, f64)> = Vec::new();
    for c in consequences {
        match per_target.iter_mut().find(|t| t.target_id == c.target_id) {
            Some(total) => {
                total.damage += c.damage;
                total.heal += c.heal;
                total.absorb_health += c.absorb_health;
                total.absorb_chakra += c.absorb_chakra;
                total.absorb_stamina += c.absorb_stamina;
            }
            None => {
                let mut first = c.clone();
                first.reflect = 0.0;
                per_target.push(first);
            }
        }
        if c.reflect > 0.0 {
            match reflected.iter_mut().find(|(user, _)| *user == c.user_id) {
                Some((_, total)) => *total += c.reflect,
                None => reflected.push((c.user_id.clone(), c.reflect)),
            }
        }
    }
    (per_target, reflected)
}

/// A prevent in force on a unit
#[derive(Debug, Clone)]
pub(crate) struct ActivePrevent {
    pub target: UnitId,
    pub effect_type: EffectType,
    pub power: f64,
}

/// Snapshot slices a pass resolves
pub struct ResolutionInput<'a> {
    pub units: &'a [BattleUnit],
    pub user_effects: &'a [UserEffect],
    pub ground_effects: &'a [GroundEffect],
    pub round: Round,
    /// The unit whose action triggered this pass
    pub actor: &'a UnitId,
}

/// Result of a pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub units: Vec<BattleUnit>,
    pub user_effects: Vec<UserEffect>,
    pub ground_effects: Vec<GroundEffect>,
    pub log: Vec<ActionLogEntry>,
}

/// Mutable working state of one pass
pub(crate) struct EffectPass<'a> {
    pub round: Round,
    pub actor: &'a UnitId,
    pub config: &'a CombatConfig,
    pub rng: &'a mut dyn RngCore,
    pub ids: &'a mut IdAllocator,
    /// Roster after this pass
    pub units: Vec<BattleUnit>,
    /// Roster as seen by damage calculations (stat and armor adjusted)
    pub view: Vec<BattleUnit>,
    pub ground: Vec<GroundEffect>,
    pub kept: Vec<UserEffect>,
    pub log: Vec<ActionLogEntry>,
    pub consequences: Vec<Consequence>,
    pub prevents: Vec<ActivePrevent>,
    pub sealed: Vec<UnitId>,
    pub cleared: Vec<UnitId>,
    multi_village: bool,
}

impl<'a> EffectPass<'a> {
    pub fn unit(&self, id: &UnitId) -> Option<&BattleUnit> {
        self.units.iter().find(|u| &u.user_id == id)
    }

    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut BattleUnit> {
        self.units.iter_mut().find(|u| &u.user_id == id)
    }

    /// Calculation view of a unit, falling back to the roster
    pub fn view_of(&self, id: &UnitId) -> Option<&BattleUnit> {
        self.view
            .iter()
            .find(|u| &u.user_id == id)
            .or_else(|| self.unit(id))
    }

    pub fn view_mut(&mut self, id: &UnitId) -> Option<&mut BattleUnit> {
        self.view.iter_mut().find(|u| &u.user_id == id)
    }

    pub fn name_of(&self, id: &UnitId) -> String {
        self.unit(id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Chance roll against a percentage power
    pub fn roll(&mut self, power: f64) -> bool {
        self.rng.gen::<f64>() < power / 100.0
    }

    /// Whether a prevent on `target` blocks an effect of `effect_type`
    ///
    /// The first matching prevent is rolled against; the effect gets
    /// through when the roll exceeds the prevent's power.
    pub fn is_prevented(&mut self, target: &UnitId, effect_type: EffectType) -> bool {
        let Some(prevent_type) = effect_type.prevented_by() else {
            return false;
        };
        let Some(power) = self
            .prevents
            .iter()
            .find(|p| &p.target == target && p.effect_type == prevent_type)
            .map(|p| p.power)
        else {
            return false;
        };
        self.rng.gen::<f64>() <= power / 100.0
    }

    pub fn lands_on(&self, effect: &Effect, target: &BattleUnit) -> bool {
        effect.lands_on(target, self.multi_village)
    }

    /// Queue a one-shot animation at a tile
    pub fn visual(&mut self, position: OffsetCoord, animation: Animation) {
        let id = self.ids.next_effect_id();
        self.ground
            .push(GroundEffect::visual(id, position, animation, self.round));
    }

    /// Blue info line for freshly applied lasting effects
    pub fn info(&mut self, effect: &Effect, text: String) {
        if !effect.is_new {
            return;
        }
        let text = match effect.rounds {
            Some(rounds) if rounds > 0 => format!("{} for the next {} rounds", text, rounds),
            _ => text,
        };
        self.log.push(ActionLogEntry::blue(text));
    }
}

fn sort_by_priority<T>(items: &mut [T], effect_type: impl Fn(&T) -> EffectType) {
    items.sort_by_key(|item| effect_type(item).priority());
}

/// Resolve every effect of a battle after an action
pub fn resolve(
    input: &ResolutionInput,
    config: &CombatConfig,
    rng: &mut dyn RngCore,
    ids: &mut IdAllocator,
) -> Resolution {
    let round = input.round;
    let prevents = input
        .user_effects
        .iter()
        .filter(|ue| ue.effect_type().is_prevent() && !ue.effect.is_new && ue.effect.is_active(round))
        .filter_map(|ue| {
            ue.target_unit().map(|target| ActivePrevent {
                target: target.clone(),
                effect_type: ue.effect_type(),
                power: ue.effect.effective_power(),
            })
        })
        .collect();
    let sealed = input
        .user_effects
        .iter()
        .filter(|ue| {
            ue.effect_type() == EffectType::Seal && !ue.effect.is_new && ue.effect.is_active(round)
        })
        .filter_map(|ue| ue.target_unit().cloned())
        .collect();

    let mut pass = EffectPass {
        round,
        actor: input.actor,
        config,
        rng,
        ids,
        units: input.units.to_vec(),
        view: input.units.to_vec(),
        ground: Vec::new(),
        kept: Vec::new(),
        log: Vec::new(),
        consequences: Vec::new(),
        prevents,
        sealed,
        cleared: Vec::new(),
        multi_village: multiple_villages(input.units),
    };

    let transient = ground_pass(&mut pass, input.ground_effects);

    let mut active: Vec<UserEffect> = input.user_effects.to_vec();
    active.extend(transient);
    sort_by_priority(&mut active, |ue| ue.effect_type());
    for ue in active {
        user_effect(&mut pass, ue);
    }

    apply_consequences(&mut pass, input.units);

    debug!(
        round,
        actor = %input.actor,
        user_effects = pass.kept.len(),
        ground_effects = pass.ground.len(),
        log_lines = pass.log.len(),
        "Resolved effects"
    );

    Resolution {
        units: pass.units,
        user_effects: pass.kept,
        ground_effects: pass.ground,
        log: pass.log,
    }
}

/// Ground pass: returns transient user effects converted from the ground
fn ground_pass(pass: &mut EffectPass, ground_effects: &[GroundEffect]) -> Vec<UserEffect> {
    let mut ground: Vec<GroundEffect> = ground_effects.to_vec();
    sort_by_priority(&mut ground, |g| g.effect_type());

    let mut transient = Vec::new();
    for mut ge in ground {
        match ge.effect_type() {
            EffectType::Move => {
                tags::move_unit(pass, &ge);
                continue;
            }
            EffectType::Clone => {
                tags::clone_unit(pass, &ge);
                continue;
            }
            EffectType::Summon => {
                if let EffectKind::Summon { template } = &ge.effect.kind {
                    tags::summon_unit(pass, &ge, template);
                }
                continue;
            }
            EffectType::Barrier | EffectType::Visual => {}
            _ => convert_ground_effect(pass, &mut ge, &mut transient),
        }

        if ge.effect.survives(pass.round) {
            ge.effect.is_new = false;
            pass.ground.push(ge);
        } else if let Some(animation) = ge.effect.disappear_animation {
            pass.visual(ge.position, animation);
        }
    }
    transient
}

fn convert_ground_effect(
    pass: &mut EffectPass,
    ge: &mut GroundEffect,
    transient: &mut Vec<UserEffect>,
) {
    let occupant = pass
        .units
        .iter()
        .find(|u| u.position == ge.position && u.still_in_battle())
        .cloned();

    match occupant {
        Some(unit) => {
            if &unit.user_id != pass.actor && !ge.effect.is_new {
                return;
            }
            if !pass.lands_on(&ge.effect, &unit) {
                return;
            }
            let times = ge.effect.apply_times(pass.round, unit.user_id.as_str());
            if times == 0 {
                return;
            }
            let mut effect = ge.effect.clone();
            effect.from_ground = true;
            effect.time_tracker.clear();
            let mut ue = UserEffect::on_unit(effect, unit.user_id.clone());
            ue.ground_apply_times = Some(times);
            transient.push(ue);
        }
        None if ge.effect_type() == EffectType::Damage => {
            let Some(barrier_id) = pass
                .ground
                .iter()
                .find(|g| g.position == ge.position && g.is_barrier())
                .map(|g| g.effect.id)
            else {
                return;
            };
            let times = ge
                .effect
                .apply_times(pass.round, &format!("barrier:{}", barrier_id));
            if times == 0 {
                return;
            }
            let mut effect = ge.effect.clone();
            effect.from_ground = true;
            let mut ue = UserEffect::new(effect, EffectTarget::Barrier(barrier_id));
            ue.ground_apply_times = Some(times);
            transient.push(ue);
        }
        None => {}
    }
}

/// User pass for one effect
fn user_effect(pass: &mut EffectPass, mut ue: UserEffect) {
    let target_id = match ue.target.clone() {
        EffectTarget::Barrier(barrier_id) => {
            if ue.effect_type() == EffectType::Damage && (ue.effect.is_new || ue.effect.from_ground) {
                let times = match ue.ground_apply_times {
                    Some(times) => times,
                    None => ue
                        .effect
                        .apply_times(pass.round, &format!("barrier:{}", barrier_id)),
                };
                if times > 0 {
                    if let Some(position) = tags::damage_barrier(pass, &ue, barrier_id, times) {
                        if let Some(animation) = ue.effect.appear_animation {
                            pass.visual(position, animation);
                        }
                    }
                }
            }
            return;
        }
        EffectTarget::Unit(id) => id,
    };

    let Some(position) = pass
        .unit(&target_id)
        .filter(|u| u.still_in_battle())
        .map(|u| u.position)
    else {
        return;
    };

    if pass.cleared.contains(&target_id) && !ue.effect.is_new {
        if let Some(animation) = ue.effect.disappear_animation {
            pass.visual(position, animation);
        }
        return;
    }

    let effect_type = ue.effect_type();
    let evaluate = ue.effect.is_new
        || ue.effect.from_ground
        || &target_id == pass.actor
        || effect_type.always_applies();
    let sealed = ue.effect.from_bloodline && pass.sealed.contains(&target_id);

    if evaluate && !sealed {
        let times = match ue.ground_apply_times {
            Some(times) => times,
            None => ue.effect.apply_times(pass.round, target_id.as_str()),
        };
        if times > 0 {
            tags::apply(pass, &mut ue, &target_id, times);
        }
        if ue.effect.is_new {
            if let Some(animation) = ue.effect.appear_animation {
                pass.visual(position, animation);
            }
        }
    }

    if ue.effect.from_ground {
        return;
    }
    if ue.effect.survives(pass.round) {
        ue.effect.is_new = false;
        pass.kept.push(ue);
    } else if let Some(animation) = ue.effect.disappear_animation {
        let position = pass.unit(&target_id).map_or(position, |u| u.position);
        pass.visual(position, animation);
    }
}

/// Apply collapsed consequences to the roster
fn apply_consequences(pass: &mut EffectPass, before: &[BattleUnit]) {
    let (per_target, reflected) = collapse(&pass.consequences);

    for c in per_target {
        let Some(target) = pass.unit_mut(&c.target_id) else {
            continue;
        };
        let name = target.username.clone();
        let mut lines = Vec::new();
        if c.damage > 0.0 {
            target.pools.cur_health = (target.pools.cur_health - c.damage).max(0.0);
            lines.push(ActionLogEntry::red(format!(
                "{} takes {} damage",
                name,
                format_amount(c.damage)
            )));
        }
        if c.heal > 0.0 {
            target.pools.cur_health = (target.pools.cur_health + c.heal).min(target.pools.max_health);
            lines.push(ActionLogEntry::green(format!(
                "{} heals {} HP",
                name,
                format_amount(c.heal)
            )));
        }
        let absorbed = [
            (Pool::Health, c.absorb_health),
            (Pool::Chakra, c.absorb_chakra),
            (Pool::Stamina, c.absorb_stamina),
        ];
        for (pool, amount) in absorbed {
            if amount <= 0.0 {
                continue;
            }
            let (cur, max, label) = match pool {
                Pool::Health => (
                    &mut target.pools.cur_health,
                    target.pools.max_health,
                    "health",
                ),
                Pool::Chakra => (
                    &mut target.pools.cur_chakra,
                    target.pools.max_chakra,
                    "chakra",
                ),
                Pool::Stamina => (
                    &mut target.pools.cur_stamina,
                    target.pools.max_stamina,
                    "stamina",
                ),
            };
            *cur = (*cur + amount).min(max);
            lines.push(ActionLogEntry::green(format!(
                "{} absorbs {} damage and converts it to {}",
                name,
                format_amount(amount),
                label
            )));
        }
        pass.log.extend(lines);
    }

    for (user_id, amount) in reflected {
        let Some(user) = pass.unit_mut(&user_id) else {
            continue;
        };
        user.pools.cur_health = (user.pools.cur_health - amount).max(0.0);
        let text = format!(
            "{} takes {} reflect damage",
            user.username,
            format_amount(amount)
        );
        pass.log.push(ActionLogEntry::red(text));
    }

    let fallen: Vec<OffsetCoord> = pass
        .units
        .iter()
        .filter(|u| !u.is_original && u.pools.cur_health <= 0.0)
        .filter(|u| {
            before
                .iter()
                .find(|b| b.user_id == u.user_id)
                .map_or(true, |b| b.pools.cur_health > 0.0)
        })
        .map(|u| u.position)
        .collect();
    for position in fallen {
        pass.visual(position, Animation::Smoke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::effects::EffectTemplate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn realize(template: EffectTemplate, caster: &BattleUnit, id: u64) -> Effect {
        template.realize(caster, &caster.stats, 0, 0, EffectId(id))
    }

    fn run(
        units: &[BattleUnit],
        user_effects: &[UserEffect],
        ground_effects: &[GroundEffect],
        actor: &UnitId,
    ) -> Resolution {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ids = IdAllocator::starting_at(1000);
        let input = ResolutionInput {
            units,
            user_effects,
            ground_effects,
            round: 0,
            actor,
        };
        resolve(&input, &CombatConfig::default(), &mut rng, &mut ids)
    }

    #[test]
    fn test_no_effects_is_identity() {
        let units = vec![
            BattleUnit::new("a", "A", OffsetCoord::new(0, 0)),
            BattleUnit::new("b", "B", OffsetCoord::new(1, 0)),
        ];
        let result = run(&units, &[], &[], &units[0].user_id);
        assert_eq!(result.units, units);
        assert!(result.log.is_empty());
        assert!(result.user_effects.is_empty());
        assert!(result.ground_effects.is_empty());
    }

    #[test]
    fn test_repeated_damage_collapses_to_one_line() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0)).with_pools(10.0, 10.0, 10.0);
        let effects: Vec<_> = (0..3)
            .map(|i| {
                UserEffect::on_unit(
                    realize(EffectTemplate::new(EffectKind::Damage, 3.0), &a, i),
                    b.user_id.clone(),
                )
            })
            .collect();
        let units = vec![a.clone(), b];
        let result = run(&units, &effects, &[], &a.user_id);
        assert_eq!(result.units[1].pools.cur_health, 1.0);
        assert_eq!(result.log, vec![ActionLogEntry::red("B takes 9 damage")]);
    }

    #[test]
    fn test_damage_clamped_at_zero() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0)).with_pools(10.0, 10.0, 10.0);
        let effect = realize(EffectTemplate::new(EffectKind::Damage, 50.0), &a, 1);
        let units = vec![a.clone(), b.clone()];
        let result = run(&units, &[UserEffect::on_unit(effect, b.user_id)], &[], &a.user_id);
        assert_eq!(result.units[1].pools.cur_health, 0.0);
    }

    #[test]
    fn test_collapse_keeps_first_appearance_order() {
        let a = UnitId::new("a");
        let b = UnitId::new("b");
        let c = UnitId::new("c");
        let mut first = Consequence::new(a.clone(), c.clone());
        first.damage = 2.0;
        let mut second = Consequence::new(a.clone(), b.clone());
        second.heal = 4.0;
        let mut third = Consequence::new(b.clone(), c.clone());
        third.damage = 3.0;
        third.reflect = 1.0;
        let (per_target, reflected) = collapse(&[first, second, third]);
        assert_eq!(per_target.len(), 2);
        assert_eq!(per_target[0].target_id, c);
        assert_eq!(per_target[0].damage, 5.0);
        assert_eq!(per_target[1].heal, 4.0);
        assert_eq!(reflected, vec![(b, 1.0)]);
    }

    #[test]
    fn test_instant_effect_dropped_with_disappear_visual() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let effect = realize(
            EffectTemplate::new(EffectKind::Heal, 5.0).disappear(Animation::RisingSmoke),
            &a,
            1,
        );
        let units = vec![a.clone(), b.clone()];
        let result = run(&units, &[UserEffect::on_unit(effect, b.user_id)], &[], &a.user_id);
        assert!(result.user_effects.is_empty());
        assert_eq!(result.ground_effects.len(), 1);
        assert_eq!(result.ground_effects[0].position, OffsetCoord::new(1, 0));
        assert_eq!(
            result.ground_effects[0].effect.appear_animation,
            Some(Animation::RisingSmoke)
        );
    }

    #[test]
    fn test_lasting_effect_kept_not_new() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let effect = realize(EffectTemplate::new(EffectKind::Damage, 5.0).rounds(3), &a, 1);
        let units = vec![a.clone(), b.clone()];
        let result = run(&units, &[UserEffect::on_unit(effect, b.user_id)], &[], &a.user_id);
        assert_eq!(result.user_effects.len(), 1);
        assert!(!result.user_effects[0].effect.is_new);
        assert_eq!(result.units[1].pools.cur_health, 95.0);
    }

    #[test]
    fn test_ground_damage_hits_occupant_once_per_round() {
        let a = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let b = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let fire = GroundEffect::new(
            realize(EffectTemplate::new(EffectKind::Damage, 4.0).rounds(3), &a, 1),
            OffsetCoord::new(1, 0),
        );
        let units = vec![a.clone(), b.clone()];
        let first = run(&units, &[], &[fire], &a.user_id);
        assert_eq!(first.units[1].pools.cur_health, 96.0);
        assert_eq!(first.ground_effects.len(), 1);
        assert!(first.user_effects.is_empty());

        // Same round, B acts: tracker already holds this round
        let second = run(&first.units, &[], &first.ground_effects, &b.user_id);
        assert_eq!(second.units[1].pools.cur_health, 96.0);
    }
}
