//! Per-kind effect handlers used by the resolution pass

use tracing::debug;

use crate::battle::effects::{
    Calculation, Direction, Effect, EffectKind, EffectType, GroundEffect, SummonTemplate,
    UserEffect,
};
use crate::battle::hex::OffsetCoord;
use crate::battle::log::{format_amount, ActionLogEntry};
use crate::battle::resolution::{ActivePrevent, Consequence, EffectPass};
use crate::battle::units::{BattleUnit, CombatStats};
use crate::core::config::CombatConfig;
use crate::core::types::{EffectId, Round, UnitId};

// === GROUND HANDLERS ===

/// Relocate the creator of a move effect
pub(crate) fn move_unit(pass: &mut EffectPass, ge: &GroundEffect) {
    let creator = ge.effect.creator_id.clone();
    let round = pass.round;
    let Some(unit) = pass.unit_mut(&creator) else {
        return;
    };
    unit.position = ge.position;
    let key = creator.to_string();
    for ground in pass.ground.iter_mut() {
        ground.effect.time_tracker.remove(&key);
    }
    for ground in pass.ground.iter_mut().filter(|g| g.position == ge.position) {
        ground.effect.time_tracker.insert(key.clone(), round);
    }
    if let Some(view) = pass.view_mut(&creator) {
        view.position = ge.position;
    }
}

/// Spawn a weaker copy of the creator on the effect's tile
pub(crate) fn clone_unit(pass: &mut EffectPass, ge: &GroundEffect) {
    let Some(creator) = pass.unit(&ge.effect.creator_id).cloned() else {
        return;
    };
    let factor = ge.effect.power / 100.0;
    let mut copy = creator;
    copy.user_id = UnitId::new(format!("{}-clone-{}", ge.effect.creator_id, ge.effect.id.0));
    copy.position = ge.position;
    copy.is_original = false;
    copy.stats.scale(factor);
    copy.pools.scale(factor);
    copy.used_actions.clear();
    copy.used_stats.clear();
    copy.used_generals.clear();
    debug!(clone = %copy.user_id, factor, "Clone spawned");
    pass.view.push(copy.clone());
    pass.units.push(copy);
    if let Some(animation) = ge.effect.appear_animation {
        pass.visual(ge.position, animation);
    }
}

/// Spawn a summon owned by the creator's controller
pub(crate) fn summon_unit(pass: &mut EffectPass, ge: &GroundEffect, template: &SummonTemplate) {
    let creator_id = ge.effect.creator_id.clone();
    let Some(creator) = pass.unit(&creator_id).cloned() else {
        return;
    };
    if pass.is_prevented(&creator_id, EffectType::Summon) {
        pass.log.push(ActionLogEntry::blue(format!(
            "{} is prevented from summoning",
            creator.username
        )));
        return;
    }
    let id = format!("{}-summon-{}", creator_id, ge.effect.id.0);
    let mut summon = BattleUnit::new(id, template.username.clone(), ge.position)
        .with_controller(creator.controller_id.clone())
        .with_stats(template.stats.clone())
        .with_level(template.level, template.experience)
        .with_ai(template.ai_profile.clone());
    summon.village_id = creator.village_id.clone();
    summon.pools = template.pools;
    summon.jutsus = template.jutsus.clone();
    summon.is_summon = true;
    summon.is_original = false;
    summon.action_points = 0.0;
    pass.log.push(ActionLogEntry::blue(format!(
        "{} summons {}",
        creator.username, template.username
    )));
    pass.view.push(summon.clone());
    pass.units.push(summon);
    if let Some(animation) = ge.effect.appear_animation {
        pass.visual(ge.position, animation);
    }
}

/// Reduce a barrier's power; returns its tile when it was hit
pub(crate) fn damage_barrier(
    pass: &mut EffectPass,
    ue: &UserEffect,
    barrier_id: EffectId,
    times: u32,
) -> Option<OffsetCoord> {
    let index = pass
        .ground
        .iter()
        .position(|g| g.effect.id == barrier_id && g.is_barrier())?;
    let amount = ue.effect.effective_power() * times as f64;
    let barrier = &mut pass.ground[index];
    barrier.effect.power -= amount;
    let position = barrier.position;
    if barrier.effect.power <= 0.0 {
        let disappear = barrier.effect.disappear_animation;
        pass.ground.remove(index);
        pass.log.push(ActionLogEntry::red(format!(
            "Barrier takes {} damage and is destroyed.",
            format_amount(amount)
        )));
        if let Some(animation) = disappear {
            pass.visual(position, animation);
        }
    } else {
        let left = barrier.effect.power;
        pass.log.push(ActionLogEntry::red(format!(
            "Barrier takes {} damage and has {} power left.",
            format_amount(amount),
            format_amount(left)
        )));
    }
    Some(position)
}

// === USER HANDLERS ===

/// Dispatch one user effect on its target
pub(crate) fn apply(pass: &mut EffectPass, ue: &mut UserEffect, target: &UnitId, times: u32) {
    let name = pass.name_of(target);
    let power = ue.effect.effective_power();
    match ue.effect.kind.clone() {
        EffectKind::Damage => damage(pass, &ue.effect, target, times),
        EffectKind::Heal => heal(pass, &ue.effect, target, times),
        EffectKind::ArmorAdjust => {
            if let Some(view) = pass.view_mut(target) {
                view.armor += power;
            }
            let text = format!("{}'s armor is {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::StatAdjust => {
            if let Some(view) = pass.view_mut(target) {
                adjust_stats(&mut view.stats, &ue.effect);
            }
            let text = format!("{}'s stats are {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::PoolCostAdjust { .. } => {
            let text = format!("{}'s pool costs are {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::Absorb { pools } => {
            if is_resting_modifier(&ue.effect) {
                for c in pass.consequences.iter_mut() {
                    if &c.target_id != target || c.damage <= 0.0 {
                        continue;
                    }
                    let converted = converted_amount(&ue.effect, c);
                    c.damage -= converted;
                    let share = converted / pools.len().max(1) as f64;
                    for pool in &pools {
                        *c.absorb_mut(*pool) += share;
                    }
                }
            }
            let text = format!("{} will absorb {} of incoming damage", name, ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::Reflect => {
            if is_resting_modifier(&ue.effect) {
                for c in pass.consequences.iter_mut() {
                    if &c.target_id == target && c.damage > 0.0 {
                        let reflected = converted_amount(&ue.effect, c);
                        c.reflect += reflected;
                    }
                }
            }
            let text = format!("{} will reflect {} of incoming damage", name, ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::DamageGivenAdjust => {
            if is_resting_modifier(&ue.effect) {
                for c in pass.consequences.iter_mut() {
                    if &c.user_id == target && c.damage > 0.0 {
                        let damage = adjusted(&ue.effect, c.damage, c);
                        c.damage = damage;
                    }
                }
            }
            let text = format!("{}'s damage given is {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::DamageTakenAdjust => {
            if is_resting_modifier(&ue.effect) {
                for c in pass.consequences.iter_mut() {
                    if &c.target_id == target && c.damage > 0.0 {
                        let damage = adjusted(&ue.effect, c.damage, c);
                        c.damage = damage;
                    }
                }
            }
            let text = format!("{}'s damage taken is {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::HealAdjust => {
            if is_resting_modifier(&ue.effect) {
                for c in pass.consequences.iter_mut() {
                    if &c.user_id == target && c.heal > 0.0 {
                        let heal = adjusted(&ue.effect, c.heal, c);
                        c.heal = heal;
                    }
                }
            }
            let text = format!("{}'s healing is {} by {}", name, ue.effect.adverb(), ue.effect.qualifier());
            pass.info(&ue.effect, text);
        }
        EffectKind::FleePrevent => prevent(pass, ue, target, format!("{} cannot flee", name)),
        EffectKind::OneHitKillPrevent => {
            prevent(pass, ue, target, format!("{} cannot be killed in one hit", name))
        }
        EffectKind::RobPrevent => prevent(pass, ue, target, format!("{} cannot be robbed", name)),
        EffectKind::SealPrevent => prevent(pass, ue, target, format!("{}'s bloodline cannot be sealed", name)),
        EffectKind::StunPrevent => prevent(pass, ue, target, format!("{} cannot be stunned", name)),
        EffectKind::SummonPrevent => prevent(pass, ue, target, format!("{} cannot summon", name)),
        EffectKind::Flee => {
            if pass.is_prevented(target, EffectType::Flee) {
                pass.log.push(ActionLogEntry::blue(format!("{} is prevented from fleeing", name)));
            } else if pass.roll(power) {
                if let Some(unit) = pass.unit_mut(target) {
                    unit.fled_battle = true;
                }
                pass.log.push(ActionLogEntry::blue(format!("{} manages to flee the battle!", name)));
            } else {
                pass.log.push(ActionLogEntry::blue(format!("{} fails to flee the battle!", name)));
            }
        }
        EffectKind::OneHitKill => {
            if pass.is_prevented(target, EffectType::OneHitKill) {
                pass.log.push(ActionLogEntry::blue(format!("{} resisted being killed", name)));
            } else if pass.roll(power) {
                if let Some(unit) = pass.unit_mut(target) {
                    unit.pools.cur_health = 0.0;
                }
                pass.log.push(ActionLogEntry::red(format!("{} was killed", name)));
            } else {
                pass.log.push(ActionLogEntry::blue(format!("{} was lucky not to get killed!", name)));
            }
        }
        EffectKind::Rob => rob(pass, &ue.effect, target, times),
        EffectKind::Seal => {
            chance_status(
                pass,
                ue,
                target,
                format!("{}'s bloodline is sealed", name),
                format!("{} resisted being sealed", name),
            );
        }
        EffectKind::Stun => {
            chance_status(
                pass,
                ue,
                target,
                format!("{} is stunned", name),
                format!("{} resisted being stunned", name),
            );
        }
        EffectKind::Clear => {
            if pass.roll(power) {
                pass.cleared.push(target.clone());
                pass.kept
                    .retain(|kept| kept.target_unit() != Some(target) || kept.effect.is_new);
                pass.log.push(ActionLogEntry::blue(format!(
                    "{} was cleared of all status effects",
                    name
                )));
            }
        }
        EffectKind::Barrier
        | EffectKind::Clone
        | EffectKind::Summon { .. }
        | EffectKind::Move
        | EffectKind::Visual => {}
    }
}

/// Modifiers rewrite consequences only once they have settled in
fn is_resting_modifier(effect: &Effect) -> bool {
    !effect.is_new && !effect.cast_this_round
}

/// Amount an absorb or reflect takes out of a hit
fn converted_amount(effect: &Effect, c: &Consequence) -> f64 {
    let power = effect.effective_power();
    let base = match effect.calculation {
        Calculation::Percentage => c.damage * power / 100.0,
        _ => power.min(c.damage),
    };
    let ratio = c.selectors.efficiency_ratio(&effect.selectors);
    (base.ceil() * ratio).min(c.damage)
}

/// Amount after a damage/heal adjust modifier
fn adjusted(effect: &Effect, amount: f64, c: &Consequence) -> f64 {
    let power = effect.effective_power();
    let change = match effect.calculation {
        Calculation::Percentage => amount * power / 100.0,
        _ => power,
    };
    let ratio = c.selectors.efficiency_ratio(&effect.selectors);
    (amount + change * ratio).max(0.0)
}

fn prevent(pass: &mut EffectPass, ue: &mut UserEffect, target: &UnitId, text: String) {
    if !ue.effect.is_new {
        return;
    }
    if pass.roll(ue.effect.effective_power()) {
        pass.prevents.push(ActivePrevent {
            target: target.clone(),
            effect_type: ue.effect_type(),
            power: ue.effect.effective_power(),
        });
        pass.info(&ue.effect, text);
    } else {
        ue.effect.cancel();
    }
}

/// Stun and seal: fresh casts roll once; any failure cancels the effect
fn chance_status(
    pass: &mut EffectPass,
    ue: &mut UserEffect,
    target: &UnitId,
    success: String,
    resisted: String,
) {
    if !ue.effect.is_new {
        return;
    }
    if pass.is_prevented(target, ue.effect_type()) {
        ue.effect.cancel();
        pass.log.push(ActionLogEntry::blue(resisted));
    } else if pass.roll(ue.effect.effective_power()) {
        pass.info(&ue.effect, success);
    } else {
        ue.effect.cancel();
        pass.log.push(ActionLogEntry::blue(resisted));
    }
}

fn rob(pass: &mut EffectPass, effect: &Effect, target: &UnitId, times: u32) {
    let target_name = pass.name_of(target);
    if pass.is_prevented(target, EffectType::Rob) {
        pass.log
            .push(ActionLogEntry::blue(format!("{} resists being robbed", target_name)));
        return;
    }
    let Some(victim_money) = pass.unit(target).map(|u| u.money) else {
        return;
    };
    let power = effect.effective_power();
    let wanted = match effect.calculation {
        Calculation::Percentage => victim_money * power / 100.0,
        _ => power,
    } * times as f64;
    let stolen = wanted.min(victim_money).max(0.0);
    if stolen <= 0.0 {
        return;
    }
    if let Some(victim) = pass.unit_mut(target) {
        victim.money -= stolen;
    }
    let thief_name = pass.name_of(&effect.creator_id);
    if let Some(thief) = pass.unit_mut(&effect.creator_id) {
        thief.money += stolen;
    }
    pass.log.push(ActionLogEntry::blue(format!(
        "{} stole {} ryo from {}",
        thief_name,
        format_amount(stolen),
        target_name
    )));
}

fn damage(pass: &mut EffectPass, effect: &Effect, target: &UnitId, times: u32) {
    let Some(view) = pass.view_of(target) else {
        return;
    };
    let amount = damage_amount(effect, view, pass.config) * times as f64;
    record_defence_usage(pass, effect, target);
    let mut consequence = Consequence::new(effect.creator_id.clone(), target.clone());
    consequence.effect_id = Some(effect.id);
    consequence.selectors = effect.selectors.clone();
    consequence.damage = amount;
    pass.consequences.push(consequence);
}

fn heal(pass: &mut EffectPass, effect: &Effect, target: &UnitId, times: u32) {
    let Some(view) = pass.view_of(target) else {
        return;
    };
    let amount = heal_amount(effect, view) * times as f64;
    let mut consequence = Consequence::new(effect.creator_id.clone(), target.clone());
    consequence.effect_id = Some(effect.id);
    consequence.selectors = effect.selectors.clone();
    consequence.heal = amount;
    pass.consequences.push(consequence);
}

/// The defender trains the defence axes and generals it was hit through
fn record_defence_usage(pass: &mut EffectPass, effect: &Effect, target: &UnitId) {
    let Some(unit) = pass.unit_mut(target) else {
        return;
    };
    for stat in &effect.selectors.stat_types {
        let axis = match stat.axes() {
            Some((_, defence)) => defence,
            None => unit.stats.highest_defence_type,
        };
        if !unit.used_stats.contains(&axis) {
            unit.used_stats.push(axis);
        }
    }
    for general in &effect.selectors.general_types {
        if !unit.used_generals.contains(general) {
            unit.used_generals.push(*general);
        }
    }
}

// === CALCULATIONS ===

/// Damage of one application of `effect` against `target`
pub fn damage_amount(effect: &Effect, target: &BattleUnit, config: &CombatConfig) -> f64 {
    let power = effect.effective_power();
    match effect.calculation {
        Calculation::Static => power,
        Calculation::Percentage => target.pools.max_health * power / 100.0,
        Calculation::Formula => {
            let Some(caster) = &effect.caster else {
                return power;
            };
            let experience = (caster.experience + target.experience) / 2.0;
            let mut parts = Vec::new();
            for stat in &effect.selectors.stat_types {
                parts.push(power_effect(
                    caster.stats.offence(*stat),
                    target.stats.defence(*stat),
                    experience,
                    config,
                ));
            }
            for general in &effect.selectors.general_types {
                parts.push(
                    config.general_scaling
                        * power_effect(
                            caster.stats.general(*general),
                            target.stats.general(*general),
                            experience,
                            config,
                        ),
                );
            }
            let sum: f64 = parts.iter().sum();
            if sum <= 0.0 {
                return power;
            }
            let mean = sum / parts.len() as f64;
            let raw = (config.damage_base + mean * config.damage_scaling)
                * (1.0 + power * config.power_scaling);
            (raw - target.armor).max(0.0)
        }
    }
}

/// Stat comparison of one attack axis against its defence
pub fn power_effect(attack: f64, defence: f64, experience: f64, config: &CombatConfig) -> f64 {
    let attack = attack.max(0.0);
    let defence = defence.max(1.0);
    let experience = experience.max(1.0);
    attack.powf(config.attack_scaling) / defence.powf(config.defence_scaling)
        * experience.powf(config.experience_scaling)
}

/// Heal of one application of `effect` on `target`
pub fn heal_amount(effect: &Effect, target: &BattleUnit) -> f64 {
    let power = effect.effective_power();
    match effect.calculation {
        Calculation::Percentage => target.pools.max_health * power / 100.0,
        _ => power,
    }
}

/// Apply a stat adjust to a calculation view
pub fn adjust_stats(stats: &mut CombatStats, effect: &Effect) {
    let power = effect.effective_power();
    let adjust = |value: &mut f64| match effect.calculation {
        Calculation::Percentage => *value *= (100.0 + power) / 100.0,
        _ => *value += power,
    };
    for stat in &effect.selectors.stat_types {
        match (stat.axes(), effect.direction) {
            (Some((offence, _)), Direction::Offence) => adjust(stats.axis_mut(offence)),
            (Some((_, defence)), Direction::Defence) => adjust(stats.axis_mut(defence)),
            (None, Direction::Offence) => adjust(&mut stats.highest_offence),
            (None, Direction::Defence) => adjust(&mut stats.highest_defence),
        }
    }
    for general in &effect.selectors.general_types {
        adjust(stats.general_mut(*general));
    }
}

/// A unit's stats with its own active stat adjusts applied
pub fn effective_stats(unit: &BattleUnit, user_effects: &[UserEffect], round: Round) -> CombatStats {
    let mut stats = unit.stats.clone();
    for ue in user_effects.iter().filter(|ue| {
        ue.target_unit() == Some(&unit.user_id)
            && ue.effect_type() == EffectType::StatAdjust
            && !ue.effect.is_new
            && ue.effect.is_active(round)
    }) {
        adjust_stats(&mut stats, &ue.effect);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::effects::EffectTemplate;
    use crate::battle::units::{General, StatType};

    fn formula_hit(caster: &BattleUnit, power: f64) -> Effect {
        EffectTemplate::new(EffectKind::Damage, power)
            .calculation(Calculation::Formula)
            .stats(vec![StatType::Ninjutsu])
            .generals(vec![General::Strength])
            .realize(caster, &caster.stats, 0, 0, EffectId(1))
    }

    #[test]
    fn test_formula_damage_grows_with_offence() {
        let config = CombatConfig::default();
        let target = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let weak = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let strong = BattleUnit::new("a", "A", OffsetCoord::new(0, 0))
            .with_stats(CombatStats::uniform(40.0));
        let low = damage_amount(&formula_hit(&weak, 10.0), &target, &config);
        let high = damage_amount(&formula_hit(&strong, 10.0), &target, &config);
        assert!(low > 0.0);
        assert!(high > low);
    }

    #[test]
    fn test_armor_reduces_formula_damage() {
        let config = CombatConfig::default();
        let caster = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let mut target = BattleUnit::new("b", "B", OffsetCoord::new(1, 0));
        let effect = formula_hit(&caster, 10.0);
        let bare = damage_amount(&effect, &target, &config);
        target.armor = 2.0;
        assert!((damage_amount(&effect, &target, &config) - (bare - 2.0)).abs() < 1e-9);
        target.armor = 1000.0;
        assert_eq!(damage_amount(&effect, &target, &config), 0.0);
    }

    #[test]
    fn test_percentage_damage_uses_max_health() {
        let config = CombatConfig::default();
        let caster = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let target = BattleUnit::new("b", "B", OffsetCoord::new(1, 0)).with_pools(200.0, 10.0, 10.0);
        let effect = EffectTemplate::new(EffectKind::Damage, 10.0)
            .calculation(Calculation::Percentage)
            .realize(&caster, &caster.stats, 0, 0, EffectId(1));
        assert_eq!(damage_amount(&effect, &target, &config), 20.0);
    }

    #[test]
    fn test_stat_adjust_static_and_percentage() {
        let caster = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let mut stats = CombatStats::uniform(10.0);
        let add = EffectTemplate::new(EffectKind::StatAdjust, 5.0)
            .stats(vec![StatType::Taijutsu])
            .direction(Direction::Defence)
            .realize(&caster, &caster.stats, 0, 0, EffectId(1));
        adjust_stats(&mut stats, &add);
        assert_eq!(stats.taijutsu_defence, 15.0);
        assert_eq!(stats.taijutsu_offence, 10.0);

        let boost = EffectTemplate::new(EffectKind::StatAdjust, 50.0)
            .calculation(Calculation::Percentage)
            .generals(vec![General::Speed])
            .realize(&caster, &caster.stats, 0, 0, EffectId(2));
        adjust_stats(&mut stats, &boost);
        assert_eq!(stats.speed, 15.0);
    }

    #[test]
    fn test_effective_stats_skip_new_adjusts() {
        let unit = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let mut effect = EffectTemplate::new(EffectKind::StatAdjust, 5.0)
            .stats(vec![StatType::Ninjutsu])
            .rounds(3)
            .realize(&unit, &unit.stats, 0, 0, EffectId(1));
        let fresh = vec![UserEffect::on_unit(effect.clone(), unit.user_id.clone())];
        assert_eq!(effective_stats(&unit, &fresh, 0).ninjutsu_offence, 10.0);
        effect.is_new = false;
        let settled = vec![UserEffect::on_unit(effect, unit.user_id.clone())];
        assert_eq!(effective_stats(&unit, &settled, 1).ninjutsu_offence, 15.0);
    }
}
