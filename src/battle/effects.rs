//! Effect model: the closed catalogue of effect kinds and their shared
//! timing/strength attributes.
//!
//! Templates ([`EffectTemplate`]) live in the action catalogue. Casting an
//! action *realizes* each template into an [`Effect`] that captures the
//! caster's stats at that moment, then binds it either to a unit
//! ([`UserEffect`]) or to a tile ([`GroundEffect`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::actions::CombatAction;
use crate::battle::ai::profile::AiProfile;
use crate::battle::hex::OffsetCoord;
use crate::battle::log::format_amount;
use crate::battle::units::{BattleUnit, CombatStats, General, Pool, Pools, StatType};
use crate::core::types::{EffectId, Round, UnitId};

/// Fieldless effect discriminant, used for ordering and lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectType {
    Clear,
    ArmorAdjust,
    PoolCostAdjust,
    StatAdjust,
    Barrier,
    Clone,
    Damage,
    FleePrevent,
    Flee,
    Heal,
    OneHitKillPrevent,
    OneHitKill,
    RobPrevent,
    Rob,
    SealPrevent,
    Seal,
    StunPrevent,
    Stun,
    SummonPrevent,
    Summon,
    Absorb,
    DamageGivenAdjust,
    DamageTakenAdjust,
    HealAdjust,
    Reflect,
    Move,
    Visual,
}

/// The order in which effects resolve, within both the ground and user pass
///
/// Prevent tags precede their counterparts; post-modifiers follow raw
/// damage and heal; move and visual come last.
pub const RESOLUTION_ORDER: [EffectType; 27] = [
    EffectType::Clear,
    EffectType::ArmorAdjust,
    EffectType::PoolCostAdjust,
    EffectType::StatAdjust,
    EffectType::Barrier,
    EffectType::Clone,
    EffectType::Damage,
    EffectType::FleePrevent,
    EffectType::Flee,
    EffectType::Heal,
    EffectType::OneHitKillPrevent,
    EffectType::OneHitKill,
    EffectType::RobPrevent,
    EffectType::Rob,
    EffectType::SealPrevent,
    EffectType::Seal,
    EffectType::StunPrevent,
    EffectType::Stun,
    EffectType::SummonPrevent,
    EffectType::Summon,
    EffectType::Absorb,
    EffectType::DamageGivenAdjust,
    EffectType::DamageTakenAdjust,
    EffectType::HealAdjust,
    EffectType::Reflect,
    EffectType::Move,
    EffectType::Visual,
];

impl EffectType {
    /// Position in [`RESOLUTION_ORDER`]
    pub fn priority(self) -> u8 {
        match self {
            EffectType::Clear => 0,
            EffectType::ArmorAdjust => 1,
            EffectType::PoolCostAdjust => 2,
            EffectType::StatAdjust => 3,
            EffectType::Barrier => 4,
            EffectType::Clone => 5,
            EffectType::Damage => 6,
            EffectType::FleePrevent => 7,
            EffectType::Flee => 8,
            EffectType::Heal => 9,
            EffectType::OneHitKillPrevent => 10,
            EffectType::OneHitKill => 11,
            EffectType::RobPrevent => 12,
            EffectType::Rob => 13,
            EffectType::SealPrevent => 14,
            EffectType::Seal => 15,
            EffectType::StunPrevent => 16,
            EffectType::Stun => 17,
            EffectType::SummonPrevent => 18,
            EffectType::Summon => 19,
            EffectType::Absorb => 20,
            EffectType::DamageGivenAdjust => 21,
            EffectType::DamageTakenAdjust => 22,
            EffectType::HealAdjust => 23,
            EffectType::Reflect => 24,
            EffectType::Move => 25,
            EffectType::Visual => 26,
        }
    }

    /// Buffs/debuffs that resolve against every attack rather than once per
    /// round
    pub fn always_applies(self) -> bool {
        matches!(
            self,
            EffectType::Absorb
                | EffectType::ArmorAdjust
                | EffectType::DamageGivenAdjust
                | EffectType::DamageTakenAdjust
                | EffectType::HealAdjust
                | EffectType::PoolCostAdjust
                | EffectType::StatAdjust
                | EffectType::FleePrevent
                | EffectType::OneHitKillPrevent
                | EffectType::Reflect
                | EffectType::RobPrevent
                | EffectType::SealPrevent
                | EffectType::StunPrevent
                | EffectType::SummonPrevent
        )
    }

    /// The prevent tag guarding this effect, if any
    pub fn prevented_by(self) -> Option<EffectType> {
        match self {
            EffectType::Flee => Some(EffectType::FleePrevent),
            EffectType::OneHitKill => Some(EffectType::OneHitKillPrevent),
            EffectType::Rob => Some(EffectType::RobPrevent),
            EffectType::Seal => Some(EffectType::SealPrevent),
            EffectType::Stun => Some(EffectType::StunPrevent),
            EffectType::Summon => Some(EffectType::SummonPrevent),
            _ => None,
        }
    }

    pub fn is_prevent(self) -> bool {
        matches!(
            self,
            EffectType::FleePrevent
                | EffectType::OneHitKillPrevent
                | EffectType::RobPrevent
                | EffectType::SealPrevent
                | EffectType::StunPrevent
                | EffectType::SummonPrevent
        )
    }
}

/// Blueprint of a summoned unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonTemplate {
    pub username: String,
    pub pools: Pools,
    pub stats: CombatStats,
    pub level: u32,
    pub experience: f64,
    #[serde(default)]
    pub jutsus: Vec<CombatAction>,
    #[serde(default)]
    pub ai_profile: Option<AiProfile>,
}

fn default_pools() -> Vec<Pool> {
    vec![Pool::Health]
}

/// Closed catalogue of effect kinds, with kind-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EffectKind {
    Clear,
    ArmorAdjust,
    PoolCostAdjust {
        #[serde(default = "default_pools")]
        pools: Vec<Pool>,
    },
    StatAdjust,
    /// Power doubles as the barrier's remaining strength
    Barrier,
    /// Power is the percentage of the creator's stats the clone receives
    Clone,
    Damage,
    FleePrevent,
    Flee,
    Heal,
    OneHitKillPrevent,
    OneHitKill,
    RobPrevent,
    Rob,
    SealPrevent,
    Seal,
    StunPrevent,
    Stun,
    SummonPrevent,
    Summon {
        template: Box<SummonTemplate>,
    },
    Absorb {
        #[serde(default = "default_pools")]
        pools: Vec<Pool>,
    },
    DamageGivenAdjust,
    DamageTakenAdjust,
    HealAdjust,
    Reflect,
    Move,
    Visual,
}

impl EffectKind {
    pub fn effect_type(&self) -> EffectType {
        match self {
            EffectKind::Clear => EffectType::Clear,
            EffectKind::ArmorAdjust => EffectType::ArmorAdjust,
            EffectKind::PoolCostAdjust { .. } => EffectType::PoolCostAdjust,
            EffectKind::StatAdjust => EffectType::StatAdjust,
            EffectKind::Barrier => EffectType::Barrier,
            EffectKind::Clone => EffectType::Clone,
            EffectKind::Damage => EffectType::Damage,
            EffectKind::FleePrevent => EffectType::FleePrevent,
            EffectKind::Flee => EffectType::Flee,
            EffectKind::Heal => EffectType::Heal,
            EffectKind::OneHitKillPrevent => EffectType::OneHitKillPrevent,
            EffectKind::OneHitKill => EffectType::OneHitKill,
            EffectKind::RobPrevent => EffectType::RobPrevent,
            EffectKind::Rob => EffectType::Rob,
            EffectKind::SealPrevent => EffectType::SealPrevent,
            EffectKind::Seal => EffectType::Seal,
            EffectKind::StunPrevent => EffectType::StunPrevent,
            EffectKind::Stun => EffectType::Stun,
            EffectKind::SummonPrevent => EffectType::SummonPrevent,
            EffectKind::Summon { .. } => EffectType::Summon,
            EffectKind::Absorb { .. } => EffectType::Absorb,
            EffectKind::DamageGivenAdjust => EffectType::DamageGivenAdjust,
            EffectKind::DamageTakenAdjust => EffectType::DamageTakenAdjust,
            EffectKind::HealAdjust => EffectType::HealAdjust,
            EffectKind::Reflect => EffectType::Reflect,
            EffectKind::Move => EffectType::Move,
            EffectKind::Visual => EffectType::Visual,
        }
    }
}

/// How an effect's power is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calculation {
    #[default]
    Static,
    Percentage,
    Formula,
}

/// Whether the stats named by an effect are used offensively or defensively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Offence,
    Defence,
}

/// Animation hints for the rendering collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Hit,
    Smoke,
    Fire,
    Heal,
    Explosion,
    RisingSmoke,
}

/// Which units a ground or user effect may land on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendlyFire {
    #[default]
    All,
    Friendly,
    Enemies,
}

/// Target override on a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateTarget {
    /// Whoever the action targets
    #[default]
    Inherit,
    /// Always the caster
    #[serde(rename = "self")]
    SelfUnit,
}

/// Stats, generals and elements an effect is tied to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatSelectors {
    #[serde(default)]
    pub stat_types: Vec<StatType>,
    #[serde(default)]
    pub general_types: Vec<General>,
    #[serde(default)]
    pub elements: Vec<String>,
}

impl StatSelectors {
    pub fn is_empty(&self) -> bool {
        self.stat_types.is_empty() && self.general_types.is_empty() && self.elements.is_empty()
    }

    /// Share of `self`'s selectors matched by `other`, in [0, 1]
    ///
    /// Selector-less effects are fully matched.
    pub fn efficiency_ratio(&self, other: &StatSelectors) -> f64 {
        let mut attacks = 0usize;
        let mut defended = 0usize;
        for stat in &self.stat_types {
            attacks += 1;
            if other.stat_types.contains(stat) {
                defended += 1;
            }
        }
        for general in &self.general_types {
            attacks += 1;
            if other.general_types.contains(general) {
                defended += 1;
            }
        }
        for element in &self.elements {
            attacks += 1;
            if other.elements.contains(element) {
                defended += 1;
            }
        }
        if attacks == 0 {
            1.0
        } else {
            defended as f64 / attacks as f64
        }
    }
}

/// Caster values captured when an effect is realized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasterSnapshot {
    pub stats: CombatStats,
    pub experience: f64,
    pub level: u32,
}

/// Catalogue form of an effect, attached to a [`CombatAction`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTemplate {
    pub kind: EffectKind,
    /// `None` = permanent, `Some(0)` = instantaneous
    #[serde(default)]
    pub rounds: Option<u32>,
    pub power: f64,
    #[serde(default)]
    pub power_per_level: f64,
    #[serde(default)]
    pub calculation: Calculation,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub selectors: StatSelectors,
    #[serde(default)]
    pub friendly_fire: FriendlyFire,
    #[serde(default)]
    pub target: TemplateTarget,
    #[serde(default)]
    pub appear_animation: Option<Animation>,
    #[serde(default)]
    pub disappear_animation: Option<Animation>,
    #[serde(default)]
    pub from_bloodline: bool,
}

impl EffectTemplate {
    /// An instantaneous, static template
    pub fn new(kind: EffectKind, power: f64) -> Self {
        Self {
            kind,
            rounds: Some(0),
            power,
            power_per_level: 0.0,
            calculation: Calculation::Static,
            direction: Direction::Offence,
            selectors: StatSelectors::default(),
            friendly_fire: FriendlyFire::All,
            target: TemplateTarget::Inherit,
            appear_animation: None,
            disappear_animation: None,
            from_bloodline: false,
        }
    }

    pub fn rounds(mut self, rounds: u32) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn permanent(mut self) -> Self {
        self.rounds = None;
        self
    }

    pub fn calculation(mut self, calculation: Calculation) -> Self {
        self.calculation = calculation;
        self
    }

    pub fn power_per_level(mut self, power_per_level: f64) -> Self {
        self.power_per_level = power_per_level;
        self
    }

    pub fn stats(mut self, stat_types: Vec<StatType>) -> Self {
        self.selectors.stat_types = stat_types;
        self
    }

    pub fn generals(mut self, general_types: Vec<General>) -> Self {
        self.selectors.general_types = general_types;
        self
    }

    pub fn elements(mut self, elements: Vec<String>) -> Self {
        self.selectors.elements = elements;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn on_self(mut self) -> Self {
        self.target = TemplateTarget::SelfUnit;
        self
    }

    pub fn friendly_fire(mut self, friendly_fire: FriendlyFire) -> Self {
        self.friendly_fire = friendly_fire;
        self
    }

    pub fn appear(mut self, animation: Animation) -> Self {
        self.appear_animation = Some(animation);
        self
    }

    pub fn disappear(mut self, animation: Animation) -> Self {
        self.disappear_animation = Some(animation);
        self
    }

    pub fn bloodline(mut self) -> Self {
        self.from_bloodline = true;
        self
    }

    pub fn effect_type(&self) -> EffectType {
        self.kind.effect_type()
    }

    /// Instantiate against a caster at the given round
    ///
    /// `caster_stats` are the caster's effective stats right now; later
    /// changes to the caster do not affect the realized effect.
    pub fn realize(
        &self,
        caster: &BattleUnit,
        caster_stats: &CombatStats,
        level: u32,
        round: Round,
        id: EffectId,
    ) -> Effect {
        Effect {
            id,
            kind: self.kind.clone(),
            creator_id: caster.user_id.clone(),
            village_id: caster.village_id.clone(),
            rounds: self.rounds,
            created_round: round,
            power: self.power,
            power_per_level: self.power_per_level,
            level,
            calculation: self.calculation,
            direction: self.direction,
            selectors: self.selectors.clone(),
            friendly_fire: self.friendly_fire,
            appear_animation: self.appear_animation,
            disappear_animation: self.disappear_animation,
            is_new: true,
            cast_this_round: true,
            from_ground: false,
            from_bloodline: self.from_bloodline,
            time_tracker: BTreeMap::new(),
            caster: Some(CasterSnapshot {
                stats: caster_stats.clone(),
                experience: caster.experience,
                level: caster.level,
            }),
        }
    }
}

/// A realized effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub creator_id: UnitId,
    pub village_id: Option<String>,
    /// `None` = permanent, `Some(0)` = instantaneous
    pub rounds: Option<u32>,
    pub created_round: Round,
    pub power: f64,
    pub power_per_level: f64,
    pub level: u32,
    pub calculation: Calculation,
    pub direction: Direction,
    #[serde(default)]
    pub selectors: StatSelectors,
    #[serde(default)]
    pub friendly_fire: FriendlyFire,
    pub appear_animation: Option<Animation>,
    pub disappear_animation: Option<Animation>,
    pub is_new: bool,
    pub cast_this_round: bool,
    pub from_ground: bool,
    pub from_bloodline: bool,
    /// Last round this effect was applied to each target
    #[serde(default)]
    pub time_tracker: BTreeMap<String, Round>,
    pub caster: Option<CasterSnapshot>,
}

impl Effect {
    pub fn effect_type(&self) -> EffectType {
        self.kind.effect_type()
    }

    /// Power including the per-level bonus
    pub fn effective_power(&self) -> f64 {
        self.power + self.level as f64 * self.power_per_level
    }

    /// Still in force during `round`
    pub fn is_active(&self, round: Round) -> bool {
        match self.rounds {
            None => true,
            Some(rounds) => round < self.created_round + rounds,
        }
    }

    /// Still in force during the round after `round`
    pub fn survives(&self, round: Round) -> bool {
        match self.rounds {
            None => true,
            Some(rounds) => round + 1 < self.created_round + rounds,
        }
    }

    /// Whether the friendly-fire rule lets this effect land on `target`
    ///
    /// With several villages in play friendliness is by village, otherwise
    /// by the target being controlled by the effect's creator.
    pub fn lands_on(&self, target: &BattleUnit, multi_village: bool) -> bool {
        let friendly = if multi_village {
            self.village_id.is_some() && self.village_id == target.village_id
        } else {
            target.controller_id == self.creator_id
        };
        match self.friendly_fire {
            FriendlyFire::All => true,
            FriendlyFire::Friendly => friendly,
            FriendlyFire::Enemies => !friendly,
        }
    }

    /// Drop this effect at the end of the current pass
    pub fn cancel(&mut self) {
        self.rounds = Some(0);
    }

    /// How many times to apply this effect to `target` now
    ///
    /// Always-apply modifiers return 1. Timed effects apply once per round
    /// elapsed since their last application to the target (0 when already
    /// applied this round), recording the application.
    pub fn apply_times(&mut self, round: Round, target: &str) -> u32 {
        if self.effect_type().always_applies() {
            return 1;
        }
        if self.rounds.is_none() {
            return 1;
        }
        match self.time_tracker.get(target).copied() {
            Some(previous) if previous >= round => 0,
            Some(previous) => {
                self.time_tracker.insert(target.to_string(), round);
                round - previous
            }
            None => {
                self.time_tracker.insert(target.to_string(), round);
                1
            }
        }
    }

    /// "increased"/"decreased" wording for log lines
    pub fn adverb(&self) -> &'static str {
        if self.effective_power() > 0.0 {
            "increased"
        } else {
            "decreased"
        }
    }

    /// Power formatted with its unit for log lines
    pub fn qualifier(&self) -> String {
        let power = format_amount(self.effective_power());
        match self.calculation {
            Calculation::Percentage => format!("{}%", power),
            _ => power,
        }
    }
}

/// What a user effect is bound to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EffectTarget {
    Unit(UnitId),
    /// Damage aimed at a barrier ground effect
    Barrier(EffectId),
}

/// An effect bound to a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEffect {
    pub effect: Effect,
    pub target: EffectTarget,
    /// Precomputed application count for effects converted from the ground
    #[serde(skip)]
    pub ground_apply_times: Option<u32>,
}

impl UserEffect {
    pub fn new(effect: Effect, target: EffectTarget) -> Self {
        Self {
            effect,
            target,
            ground_apply_times: None,
        }
    }

    pub fn on_unit(effect: Effect, unit: UnitId) -> Self {
        Self::new(effect, EffectTarget::Unit(unit))
    }

    pub fn target_unit(&self) -> Option<&UnitId> {
        match &self.target {
            EffectTarget::Unit(id) => Some(id),
            EffectTarget::Barrier(_) => None,
        }
    }

    pub fn effect_type(&self) -> EffectType {
        self.effect.effect_type()
    }
}

/// An effect bound to a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundEffect {
    pub effect: Effect,
    pub position: OffsetCoord,
}

impl GroundEffect {
    pub fn new(effect: Effect, position: OffsetCoord) -> Self {
        Self { effect, position }
    }

    /// A one-shot animation marker
    pub fn visual(id: EffectId, position: OffsetCoord, animation: Animation, round: Round) -> Self {
        let effect = Effect {
            id,
            kind: EffectKind::Visual,
            creator_id: UnitId::new("system"),
            village_id: None,
            rounds: Some(0),
            created_round: round,
            power: 0.0,
            power_per_level: 0.0,
            level: 0,
            calculation: Calculation::Static,
            direction: Direction::Offence,
            selectors: StatSelectors::default(),
            friendly_fire: FriendlyFire::All,
            appear_animation: Some(animation),
            disappear_animation: None,
            is_new: true,
            cast_this_round: true,
            from_ground: false,
            from_bloodline: false,
            time_tracker: BTreeMap::new(),
            caster: None,
        };
        Self::new(effect, position)
    }

    pub fn effect_type(&self) -> EffectType {
        self.effect.effect_type()
    }

    pub fn is_barrier(&self) -> bool {
        self.effect_type() == EffectType::Barrier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_effect(rounds: Option<u32>, created: Round) -> Effect {
        let caster = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        let mut template = EffectTemplate::new(EffectKind::Damage, 5.0);
        template.rounds = rounds;
        template.realize(&caster, &caster.stats, 0, created, EffectId(1))
    }

    #[test]
    fn test_priority_matches_resolution_order() {
        for (index, effect_type) in RESOLUTION_ORDER.iter().enumerate() {
            assert_eq!(effect_type.priority() as usize, index);
        }
    }

    #[test]
    fn test_prevent_resolves_before_counterpart() {
        for effect_type in RESOLUTION_ORDER {
            if let Some(prevent) = effect_type.prevented_by() {
                assert!(prevent.priority() < effect_type.priority());
                assert!(prevent.is_prevent());
            }
        }
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let kind = EffectKind::Absorb {
            pools: vec![Pool::Chakra],
        };
        let json = serde_json::to_value(&kind).expect("serializable");
        assert_eq!(json["type"], "absorb");
        assert_eq!(json["pools"][0], "chakra");
        let damage = serde_json::to_value(EffectKind::DamageTakenAdjust).expect("serializable");
        assert_eq!(damage["type"], "damagetakenadjust");
    }

    #[test]
    fn test_instant_effect_does_not_survive() {
        let effect = sample_effect(Some(0), 3);
        assert!(!effect.is_active(3));
        assert!(!effect.survives(3));
        let one_round = sample_effect(Some(1), 3);
        assert!(one_round.is_active(3));
        assert!(!one_round.survives(3));
    }

    #[test]
    fn test_multi_round_effect_lifetime() {
        let effect = sample_effect(Some(3), 2);
        assert!(effect.survives(2));
        assert!(effect.survives(3));
        assert!(!effect.survives(4));
        assert!(effect.is_active(4));
        assert!(!effect.is_active(5));
    }

    #[test]
    fn test_permanent_effect() {
        let effect = sample_effect(None, 0);
        assert!(effect.is_active(1000));
        assert!(effect.survives(1000));
    }

    #[test]
    fn test_apply_times_tracks_rounds() {
        let mut effect = sample_effect(Some(5), 0);
        assert_eq!(effect.apply_times(0, "b"), 1);
        assert_eq!(effect.apply_times(0, "b"), 0);
        assert_eq!(effect.apply_times(2, "b"), 2);
        assert_eq!(effect.apply_times(2, "c"), 1);
    }

    #[test]
    fn test_efficiency_ratio() {
        let lhs = StatSelectors {
            stat_types: vec![StatType::Ninjutsu, StatType::Taijutsu],
            general_types: vec![],
            elements: vec![],
        };
        let rhs = StatSelectors {
            stat_types: vec![StatType::Ninjutsu],
            general_types: vec![],
            elements: vec![],
        };
        assert_eq!(lhs.efficiency_ratio(&rhs), 0.5);
        assert_eq!(StatSelectors::default().efficiency_ratio(&rhs), 1.0);
    }

    #[test]
    fn test_realize_captures_caster() {
        let mut caster = BattleUnit::new("a", "A", OffsetCoord::new(0, 0));
        caster.stats.ninjutsu_offence = 55.0;
        let template = EffectTemplate::new(EffectKind::Damage, 10.0).power_per_level(2.0);
        let effect = template.realize(&caster, &caster.stats, 3, 4, EffectId(9));
        caster.stats.ninjutsu_offence = 1.0;
        assert_eq!(effect.effective_power(), 16.0);
        assert_eq!(effect.created_round, 4);
        assert!(effect.is_new);
        assert_eq!(
            effect.caster.as_ref().map(|c| c.stats.ninjutsu_offence),
            Some(55.0)
        );
    }
}
