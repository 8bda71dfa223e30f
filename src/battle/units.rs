//! Combatants: pools, combat stats and per-battle bookkeeping

use serde::{Deserialize, Serialize};

use crate::battle::actions::{ActionKind, CombatAction};
use crate::battle::ai::profile::AiProfile;
use crate::battle::hex::OffsetCoord;
use crate::core::types::UnitId;

/// Health, chakra and stamina pools
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pools {
    pub cur_health: f64,
    pub max_health: f64,
    pub cur_chakra: f64,
    pub max_chakra: f64,
    pub cur_stamina: f64,
    pub max_stamina: f64,
}

impl Pools {
    pub fn full(health: f64, chakra: f64, stamina: f64) -> Self {
        Self {
            cur_health: health,
            max_health: health,
            cur_chakra: chakra,
            max_chakra: chakra,
            cur_stamina: stamina,
            max_stamina: stamina,
        }
    }

    /// Scale every pool (current and max) by a factor
    pub fn scale(&mut self, factor: f64) {
        self.cur_health *= factor;
        self.max_health *= factor;
        self.cur_chakra *= factor;
        self.max_chakra *= factor;
        self.cur_stamina *= factor;
        self.max_stamina *= factor;
    }
}

impl Default for Pools {
    fn default() -> Self {
        Self::full(100.0, 100.0, 100.0)
    }
}

/// Which pool an effect touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Health,
    Chakra,
    Stamina,
}

/// The eight offence/defence axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatAxis {
    NinjutsuOffence,
    NinjutsuDefence,
    GenjutsuOffence,
    GenjutsuDefence,
    TaijutsuOffence,
    TaijutsuDefence,
    BukijutsuOffence,
    BukijutsuDefence,
}

impl StatAxis {
    pub const ALL: [StatAxis; 8] = [
        StatAxis::NinjutsuOffence,
        StatAxis::NinjutsuDefence,
        StatAxis::GenjutsuOffence,
        StatAxis::GenjutsuDefence,
        StatAxis::TaijutsuOffence,
        StatAxis::TaijutsuDefence,
        StatAxis::BukijutsuOffence,
        StatAxis::BukijutsuDefence,
    ];

    pub fn is_offence(&self) -> bool {
        matches!(
            self,
            StatAxis::NinjutsuOffence
                | StatAxis::GenjutsuOffence
                | StatAxis::TaijutsuOffence
                | StatAxis::BukijutsuOffence
        )
    }
}

/// General attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum General {
    Strength,
    Intelligence,
    Willpower,
    Speed,
}

impl General {
    pub const ALL: [General; 4] = [
        General::Strength,
        General::Intelligence,
        General::Willpower,
        General::Speed,
    ];
}

/// Stat family selector used by effects
///
/// `Highest` resolves to whichever offence/defence axis is strongest for
/// the unit in question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Highest,
    Ninjutsu,
    Genjutsu,
    Taijutsu,
    Bukijutsu,
}

impl StatType {
    /// The (offence, defence) axes of this family, `None` for `Highest`
    pub fn axes(&self) -> Option<(StatAxis, StatAxis)> {
        match self {
            StatType::Highest => None,
            StatType::Ninjutsu => Some((StatAxis::NinjutsuOffence, StatAxis::NinjutsuDefence)),
            StatType::Genjutsu => Some((StatAxis::GenjutsuOffence, StatAxis::GenjutsuDefence)),
            StatType::Taijutsu => Some((StatAxis::TaijutsuOffence, StatAxis::TaijutsuDefence)),
            StatType::Bukijutsu => Some((StatAxis::BukijutsuOffence, StatAxis::BukijutsuDefence)),
        }
    }
}

/// Offence/defence axes, generals and the derived highest values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub ninjutsu_offence: f64,
    pub ninjutsu_defence: f64,
    pub genjutsu_offence: f64,
    pub genjutsu_defence: f64,
    pub taijutsu_offence: f64,
    pub taijutsu_defence: f64,
    pub bukijutsu_offence: f64,
    pub bukijutsu_defence: f64,
    pub strength: f64,
    pub intelligence: f64,
    pub willpower: f64,
    pub speed: f64,
    pub highest_offence: f64,
    pub highest_defence: f64,
    pub highest_offence_type: StatAxis,
    pub highest_defence_type: StatAxis,
}

impl CombatStats {
    /// Every axis and general set to the same value
    pub fn uniform(value: f64) -> Self {
        let mut stats = Self {
            ninjutsu_offence: value,
            ninjutsu_defence: value,
            genjutsu_offence: value,
            genjutsu_defence: value,
            taijutsu_offence: value,
            taijutsu_defence: value,
            bukijutsu_offence: value,
            bukijutsu_defence: value,
            strength: value,
            intelligence: value,
            willpower: value,
            speed: value,
            highest_offence: value,
            highest_defence: value,
            highest_offence_type: StatAxis::NinjutsuOffence,
            highest_defence_type: StatAxis::NinjutsuDefence,
        };
        stats.recompute_highest();
        stats
    }

    pub fn axis(&self, axis: StatAxis) -> f64 {
        match axis {
            StatAxis::NinjutsuOffence => self.ninjutsu_offence,
            StatAxis::NinjutsuDefence => self.ninjutsu_defence,
            StatAxis::GenjutsuOffence => self.genjutsu_offence,
            StatAxis::GenjutsuDefence => self.genjutsu_defence,
            StatAxis::TaijutsuOffence => self.taijutsu_offence,
            StatAxis::TaijutsuDefence => self.taijutsu_defence,
            StatAxis::BukijutsuOffence => self.bukijutsu_offence,
            StatAxis::BukijutsuDefence => self.bukijutsu_defence,
        }
    }

    pub fn axis_mut(&mut self, axis: StatAxis) -> &mut f64 {
        match axis {
            StatAxis::NinjutsuOffence => &mut self.ninjutsu_offence,
            StatAxis::NinjutsuDefence => &mut self.ninjutsu_defence,
            StatAxis::GenjutsuOffence => &mut self.genjutsu_offence,
            StatAxis::GenjutsuDefence => &mut self.genjutsu_defence,
            StatAxis::TaijutsuOffence => &mut self.taijutsu_offence,
            StatAxis::TaijutsuDefence => &mut self.taijutsu_defence,
            StatAxis::BukijutsuOffence => &mut self.bukijutsu_offence,
            StatAxis::BukijutsuDefence => &mut self.bukijutsu_defence,
        }
    }

    pub fn general(&self, general: General) -> f64 {
        match general {
            General::Strength => self.strength,
            General::Intelligence => self.intelligence,
            General::Willpower => self.willpower,
            General::Speed => self.speed,
        }
    }

    pub fn general_mut(&mut self, general: General) -> &mut f64 {
        match general {
            General::Strength => &mut self.strength,
            General::Intelligence => &mut self.intelligence,
            General::Willpower => &mut self.willpower,
            General::Speed => &mut self.speed,
        }
    }

    /// Offence value of a stat family
    pub fn offence(&self, stat: StatType) -> f64 {
        match stat.axes() {
            Some((offence, _)) => self.axis(offence),
            None => self.highest_offence,
        }
    }

    /// Defence value of a stat family
    pub fn defence(&self, stat: StatType) -> f64 {
        match stat.axes() {
            Some((_, defence)) => self.axis(defence),
            None => self.highest_defence,
        }
    }

    /// Refresh the derived highest offence/defence from the axes
    pub fn recompute_highest(&mut self) {
        let mut best_offence = (StatAxis::NinjutsuOffence, f64::MIN);
        let mut best_defence = (StatAxis::NinjutsuDefence, f64::MIN);
        for axis in StatAxis::ALL {
            let value = self.axis(axis);
            let best = if axis.is_offence() {
                &mut best_offence
            } else {
                &mut best_defence
            };
            if value > best.1 {
                *best = (axis, value);
            }
        }
        self.highest_offence_type = best_offence.0;
        self.highest_offence = best_offence.1;
        self.highest_defence_type = best_defence.0;
        self.highest_defence = best_defence.1;
    }

    /// Scale every stat by a factor (used for clones)
    pub fn scale(&mut self, factor: f64) {
        for axis in StatAxis::ALL {
            *self.axis_mut(axis) *= factor;
        }
        for general in General::ALL {
            *self.general_mut(general) *= factor;
        }
        self.highest_offence *= factor;
        self.highest_defence *= factor;
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

/// One entry of a unit's action history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedAction {
    pub id: String,
    pub kind: ActionKind,
}

fn default_elo() -> f64 {
    1000.0
}

/// A combatant in one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub user_id: UnitId,
    pub username: String,
    /// Who issues this unit's orders (itself, or the summoner/player)
    pub controller_id: UnitId,
    pub village_id: Option<String>,
    pub is_ai: bool,
    pub is_original: bool,
    pub is_summon: bool,
    pub position: OffsetCoord,
    pub pools: Pools,
    pub stats: CombatStats,
    pub experience: f64,
    pub level: u32,
    pub armor: f64,
    pub money: f64,
    pub original_money: f64,
    #[serde(default = "default_elo")]
    pub elo: f64,
    pub action_points: f64,
    #[serde(default)]
    pub used_stats: Vec<StatAxis>,
    #[serde(default)]
    pub used_generals: Vec<General>,
    #[serde(default)]
    pub used_actions: Vec<UsedAction>,
    #[serde(default)]
    pub fled_battle: bool,
    #[serde(default)]
    pub left_battle: bool,
    #[serde(default)]
    pub jutsus: Vec<CombatAction>,
    #[serde(default)]
    pub items: Vec<CombatAction>,
    #[serde(default)]
    pub ai_profile: Option<AiProfile>,
}

impl BattleUnit {
    /// A player-controlled original at full pools
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, position: OffsetCoord) -> Self {
        let user_id = UnitId::new(user_id);
        Self {
            controller_id: user_id.clone(),
            user_id,
            username: username.into(),
            village_id: None,
            is_ai: false,
            is_original: true,
            is_summon: false,
            position,
            pools: Pools::default(),
            stats: CombatStats::default(),
            experience: 100.0,
            level: 1,
            armor: 0.0,
            money: 0.0,
            original_money: 0.0,
            elo: default_elo(),
            action_points: 100.0,
            used_stats: Vec::new(),
            used_generals: Vec::new(),
            used_actions: Vec::new(),
            fled_battle: false,
            left_battle: false,
            jutsus: Vec::new(),
            items: Vec::new(),
            ai_profile: None,
        }
    }

    pub fn with_pools(mut self, health: f64, chakra: f64, stamina: f64) -> Self {
        self.pools = Pools::full(health, chakra, stamina);
        self
    }

    pub fn with_stats(mut self, stats: CombatStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_village(mut self, village: impl Into<String>) -> Self {
        self.village_id = Some(village.into());
        self
    }

    pub fn with_controller(mut self, controller: UnitId) -> Self {
        self.controller_id = controller;
        self
    }

    pub fn with_ai(mut self, profile: Option<AiProfile>) -> Self {
        self.is_ai = true;
        self.ai_profile = profile;
        self
    }

    pub fn with_jutsu(mut self, action: CombatAction) -> Self {
        self.jutsus.push(action);
        self
    }

    pub fn with_item(mut self, action: CombatAction) -> Self {
        self.items.push(action);
        self
    }

    pub fn with_money(mut self, money: f64) -> Self {
        self.money = money;
        self.original_money = money;
        self
    }

    pub fn with_elo(mut self, elo: f64) -> Self {
        self.elo = elo;
        self
    }

    pub fn with_level(mut self, level: u32, experience: f64) -> Self {
        self.level = level;
        self.experience = experience;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.pools.cur_health > 0.0
    }

    /// Alive and has not fled
    pub fn still_in_battle(&self) -> bool {
        self.is_alive() && !self.fled_battle
    }

    /// Still taking turns in this battle
    pub fn in_battle(&self) -> bool {
        self.still_in_battle() && !self.left_battle
    }

    pub fn health_percent(&self) -> f64 {
        if self.pools.max_health > 0.0 {
            self.pools.cur_health / self.pools.max_health * 100.0
        } else {
            0.0
        }
    }

    /// Ids of past actions, oldest first
    pub fn action_history(&self) -> Vec<String> {
        self.used_actions.iter().map(|a| a.id.clone()).collect()
    }
}
