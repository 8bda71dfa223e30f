//! AI decision engines
//!
//! Architecture: Trait + Data hybrid
//! - BattleAi trait defines the interface both engines implement
//! - AiProfile holds TOML-loaded rules for the rule engine
//! - Engines emit the same (action, tile) pair a player would and apply it
//!   through the turn controller

pub mod combo;
pub mod profile;
pub mod rules;
pub mod scoring;
pub mod search;

use serde::{Deserialize, Serialize};

use crate::battle::battle_map::BattleMap;
use crate::battle::execution::{ActionOutcome, BattleState};
use crate::battle::hex::OffsetCoord;
use crate::core::config::CombatConfig;
use crate::core::error::Result;
use crate::core::types::UnitId;

pub use combo::{get_combo_status, ComboStatus};
pub use profile::{default_rules, load_named_profile, load_profile, AiProfile, Condition, Rule, RuleAction, RuleTarget};
pub use search::{SearchArena, SearchNode};

/// An action choice, as a player would make it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiDecision {
    pub action_id: String,
    pub target: OffsetCoord,
}

/// Trait for battle AI implementations
pub trait BattleAi {
    /// What the unit would do now, without doing it
    fn decide(&self, state: &BattleState, map: &BattleMap, unit_id: &UnitId, config: &CombatConfig)
        -> Result<Option<AiDecision>>;

    /// Decide and apply; `Ok(None)` when the unit takes no action
    fn perform(&self, state: &BattleState, map: &BattleMap, unit_id: &UnitId, config: &CombatConfig)
        -> Result<Option<ActionOutcome>>;
}

/// Tree search over the unit's options
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchAi {
    /// Extra plies; `None` uses the configured depth
    pub depth: Option<usize>,
}

impl BattleAi for SearchAi {
    fn decide(
        &self,
        state: &BattleState,
        map: &BattleMap,
        unit_id: &UnitId,
        config: &CombatConfig,
    ) -> Result<Option<AiDecision>> {
        let depth = self.depth.unwrap_or(config.ai_search_depth);
        Ok(search::decide(state, map, unit_id, depth, config))
    }

    fn perform(
        &self,
        state: &BattleState,
        map: &BattleMap,
        unit_id: &UnitId,
        config: &CombatConfig,
    ) -> Result<Option<ActionOutcome>> {
        match self.depth {
            Some(depth) => {
                let config = CombatConfig {
                    ai_search_depth: depth,
                    ..config.clone()
                };
                search::perform_ai_action(state, map, unit_id, &config)
            }
            None => search::perform_ai_action(state, map, unit_id, config),
        }
    }
}

/// Authored condition -> action rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleAi;

impl BattleAi for RuleAi {
    fn decide(
        &self,
        state: &BattleState,
        map: &BattleMap,
        unit_id: &UnitId,
        config: &CombatConfig,
    ) -> Result<Option<AiDecision>> {
        rules::decide(state, map, unit_id, config)
    }

    fn perform(
        &self,
        state: &BattleState,
        map: &BattleMap,
        unit_id: &UnitId,
        config: &CombatConfig,
    ) -> Result<Option<ActionOutcome>> {
        rules::perform_ai_action(state, map, unit_id, config).map(Some)
    }
}
