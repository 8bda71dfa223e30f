//! Battle system - turn-based hex-grid combat
//!
//! Key pieces:
//! - Hex grid with variable movement cost and cached A* paths
//! - Tagged effects resolved in one fixed order per pass
//! - Targeting decides which tiles an action may touch
//! - Turn controller applies actions from players and AI alike

pub mod actions;
pub mod ai;
pub mod battle_map;
pub mod effects;
pub mod execution;
pub mod hex;
pub mod log;
pub mod pathfinding;
pub mod resolution;
pub mod results;
pub mod store;
pub mod tags;
pub mod targeting;
pub mod units;

// Re-exports for convenient access
pub use actions::{
    available_actions, basic_actions, is_affordable, pool_cost, ActionCosts, ActionKind, ActionMethod, ActionTarget,
    CombatAction, PoolCost,
};
pub use battle_map::{BattleMap, HexTile};
pub use effects::{
    Animation, Calculation, Direction, Effect, EffectKind, EffectTarget, EffectTemplate, EffectType, FriendlyFire,
    GroundEffect, StatSelectors, SummonTemplate, TemplateTarget, UserEffect, RESOLUTION_ORDER,
};
pub use execution::{
    battle_rng, is_stunned, perform_action, perform_action_with, usable_actions, ActionOutcome, ActionRequest, BattlePhase,
    BattleState,
};
pub use hex::{AxialCoord, HexDirection, OffsetCoord};
pub use log::{ActionLogEntry, LogColor};
pub use pathfinding::{path_cost, ObstacleOverlay, Path, PathCalculator};
pub use resolution::{collapse, resolve, Consequence, Resolution, ResolutionInput};
pub use results::{collect_results, BattleResult, CombatOutcome};
pub use store::{BattleStore, InMemoryBattleStore};
pub use targeting::{possible_action_tiles, AffectedTiles, TargetingContext};
pub use units::{BattleUnit, CombatStats, General, Pool, Pools, StatAxis, StatType, UsedAction};
