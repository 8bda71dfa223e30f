//! Battle results for units leaving a battle
//!
//! An original unit leaves when it dies, flees, or no opposing original is
//! left standing. Leaving produces a [`BattleResult`]: outcome, ELO change,
//! experience, money and the stat gains experience is split into.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::targeting::{multiple_villages, same_faction};
use crate::battle::units::{BattleUnit, General, StatAxis};
use crate::core::config::CombatConfig;
use crate::core::types::UnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatOutcome {
    Won,
    Lost,
    Fled,
}

/// What a unit takes away from a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub user_id: UnitId,
    pub outcome: CombatOutcome,
    pub elo_change: f64,
    pub experience: f64,
    /// Reward plus anything robbed or lost during the battle
    pub money_delta: f64,
    pub stat_gains: Vec<(StatAxis, f64)>,
    pub general_gains: Vec<(General, f64)>,
    pub cur_health: f64,
    pub cur_chakra: f64,
    pub cur_stamina: f64,
    pub friends_left: usize,
    pub targets_left: usize,
}

/// Expected score of a side rated `own` against `opponent`
pub fn expected_score(own: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) / 400.0))
}

/// ELO change, floored to two decimals
pub fn elo_change(own: f64, opponent: f64, k_factor: f64, won: bool) -> f64 {
    let score = if won { 1.0 } else { 0.0 };
    (k_factor * (score - expected_score(own, opponent)) * 100.0).floor() / 100.0
}

fn mean_elo(units: &[&BattleUnit]) -> Option<f64> {
    if units.is_empty() {
        None
    } else {
        Some(units.iter().map(|u| u.elo).sum::<f64>() / units.len() as f64)
    }
}

fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// Produce results for every original unit that leaves the battle now and
/// mark it as having left
pub fn collect_results(
    units: &mut [BattleUnit],
    reward_scaling: f64,
    config: &CombatConfig,
    rng: &mut dyn RngCore,
) -> Vec<BattleResult> {
    let multi_village = multiple_villages(units);
    let mut results = Vec::new();

    for index in 0..units.len() {
        let unit = &units[index];
        if !unit.is_original || unit.left_battle {
            continue;
        }

        let originals: Vec<&BattleUnit> = units.iter().filter(|u| u.is_original).collect();
        let (friends, targets): (Vec<&BattleUnit>, Vec<&BattleUnit>) = originals
            .into_iter()
            .partition(|o| same_faction(o, unit, multi_village));
        let surviving_targets = targets.iter().filter(|t| t.still_in_battle()).count();
        if unit.still_in_battle() && surviving_targets > 0 {
            continue;
        }

        let fled = unit.fled_battle;
        let won = !fled && unit.is_alive() && surviving_targets == 0;
        let outcome = if fled {
            CombatOutcome::Fled
        } else if won {
            CombatOutcome::Won
        } else {
            CombatOutcome::Lost
        };

        let own_elo = mean_elo(&friends).unwrap_or(unit.elo);
        let opponent_elo = mean_elo(&targets).unwrap_or(own_elo);
        let k_factor = config.elo_k_factor * reward_scaling;
        let elo = elo_change(own_elo, opponent_elo, k_factor, won);

        let experience = if fled {
            config.fled_experience
        } else {
            let gain = elo.max(config.min_experience_gain);
            if won {
                gain
            } else {
                gain / 2.0
            }
        };

        let reward = if won {
            rng.gen_range(config.win_money_min..=config.win_money_max) as f64 + unit.level as f64
        } else {
            0.0
        };

        let (stat_gains, general_gains) = split_experience(unit, experience);

        let friends_left = friends
            .iter()
            .filter(|f| f.user_id != unit.user_id && !f.left_battle)
            .count();
        let targets_left = targets.iter().filter(|t| !t.left_battle).count();

        let result = BattleResult {
            user_id: unit.user_id.clone(),
            outcome,
            elo_change: elo,
            experience,
            money_delta: reward + unit.money - unit.original_money,
            stat_gains,
            general_gains,
            cur_health: unit.pools.cur_health,
            cur_chakra: unit.pools.cur_chakra,
            cur_stamina: unit.pools.cur_stamina,
            friends_left,
            targets_left,
        };
        info!(
            unit = %result.user_id,
            outcome = ?result.outcome,
            elo = result.elo_change,
            experience = result.experience,
            "Unit left battle"
        );
        results.push(result);
        units[index].left_battle = true;
    }
    results
}

/// Split experience evenly over the stats and generals a unit used
///
/// Units that used nothing spread it over every axis and general.
fn split_experience(unit: &BattleUnit, experience: f64) -> (Vec<(StatAxis, f64)>, Vec<(General, f64)>) {
    let (stats, generals): (Vec<StatAxis>, Vec<General>) =
        if unit.used_stats.is_empty() && unit.used_generals.is_empty() {
            (StatAxis::ALL.to_vec(), General::ALL.to_vec())
        } else {
            (unit.used_stats.clone(), unit.used_generals.clone())
        };
    let count = (stats.len() + generals.len()).max(1) as f64;
    let share = floor2(experience / count);
    (
        stats.into_iter().map(|s| (s, share)).collect(),
        generals.into_iter().map(|g| (g, share)).collect(),
    )
}
