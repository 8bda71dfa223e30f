//! Combat configuration with documented constants
//!
//! All tuning numbers for damage, rewards, action points and the AI live
//! here. Values can be overridden from TOML; missing keys keep defaults.

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};

/// Configuration for the combat simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === TURN SYSTEM ===
    /// Action points each unit receives at the start of a round
    ///
    /// Action costs are expressed as a share of this pool, so 100 lets a
    /// unit move three times (30 each) or attack once and move once.
    pub action_points_per_round: f64,

    // === DAMAGE FORMULA ===
    /// Exponent applied to the attacking stat
    pub attack_scaling: f64,

    /// Exponent applied to the defending stat
    ///
    /// Kept slightly below `attack_scaling` so that equal stats favour
    /// the attacker.
    pub defence_scaling: f64,

    /// Exponent applied to the mean experience of attacker and defender
    pub experience_scaling: f64,

    /// Multiplier for general (strength, intelligence, ...) comparisons
    ///
    /// At 0.5 a general stat contributes half as much as a combat axis.
    pub general_scaling: f64,

    /// Flat damage added to every formula hit before power scaling
    pub damage_base: f64,

    /// Multiplier turning the averaged stat comparison into damage
    ///
    /// Formula damage is `(damage_base + mean * damage_scaling) *
    /// (1 + power * power_scaling)` minus the target's armor.
    pub damage_scaling: f64,

    /// How strongly effect power amplifies formula damage
    ///
    /// Final damage is multiplied by `1 + power * power_scaling`.
    pub power_scaling: f64,

    // === REWARDS ===
    /// ELO K-factor, scaled by the battle's reward scaling
    pub elo_k_factor: f64,

    /// Minimum experience gained when a unit leaves a battle it did not flee
    pub min_experience_gain: f64,

    /// Experience awarded for fleeing
    pub fled_experience: f64,

    /// Inclusive range of money awarded for a win (before level bonus)
    pub win_money_min: u32,
    pub win_money_max: u32,

    // === AI ===
    /// Extra plies explored by the search engine after the first action
    pub ai_search_depth: usize,

    /// Fitness penalty for choosing to end the turn
    pub ai_wait_penalty: f64,

    /// Divisor for path length to each enemy in the fitness function
    ///
    /// At 10, walking one tile closer to an enemy is worth 0.1 fitness,
    /// enough to break ties without outweighing damage.
    pub ai_distance_divisor: f64,

    /// Movement cost of tiles occupied by units or barriers when the rule
    /// engine plans a route
    pub obstacle_cost: f64,

    /// Id prefix identifying NPCs
    ///
    /// AI-driven units without this prefix belong to a player on
    /// auto-combat and receive restricted, fallback-augmented behaviour.
    pub npc_id_prefix: String,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            // Turn
            action_points_per_round: 100.0,

            // Damage formula
            attack_scaling: 0.5,
            defence_scaling: 0.45,
            experience_scaling: 0.2,
            general_scaling: 0.5,
            damage_base: 5.0,
            damage_scaling: 5.0,
            power_scaling: 0.05,

            // Rewards
            elo_k_factor: 32.0,
            min_experience_gain: 0.02,
            fled_experience: 0.01,
            win_money_min: 30,
            win_money_max: 40,

            // AI
            ai_search_depth: 1,
            ai_wait_penalty: 10.0,
            ai_distance_divisor: 10.0,
            obstacle_cost: 100.0,
            npc_id_prefix: "npc_".to_string(),
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overrides from TOML and validate the result
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(contents)?;
        config.validate().map_err(CombatError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.action_points_per_round <= 0.0 {
            return Err("action_points_per_round must be positive".into());
        }

        if self.win_money_min > self.win_money_max {
            return Err(format!(
                "win_money_min ({}) should be <= win_money_max ({})",
                self.win_money_min, self.win_money_max
            ));
        }

        if self.ai_distance_divisor <= 0.0 {
            return Err("ai_distance_divisor must be positive".into());
        }

        if self.obstacle_cost < 1.0 {
            return Err(format!(
                "obstacle_cost ({}) should be >= the base tile cost of 1",
                self.obstacle_cost
            ));
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<CombatConfig> = OnceLock::new();

/// Get the global combat config (initializes with defaults if not set)
pub fn config() -> &'static CombatConfig {
    CONFIG.get_or_init(CombatConfig::default)
}

/// Set the global combat config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CombatConfig) -> std::result::Result<(), CombatConfig> {
    CONFIG.set(config)
}
