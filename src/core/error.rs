use thiserror::Error;

use crate::core::types::{BattleId, UnitId};

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Unit is no longer in battle: {0}")]
    UnitNotInBattle(UnitId),

    #[error("Unit is not AI controlled: {0}")]
    NotAiControlled(UnitId),

    #[error("Action {action_id} is not available to {unit_id}")]
    ActionNotFound { unit_id: UnitId, action_id: String },

    #[error("Action {action_id} is not affordable for {unit_id}")]
    ActionNotAffordable { unit_id: UnitId, action_id: String },

    #[error("Action {action_id} is not possible on tile ({col}, {row})")]
    ActionNotPossible {
        action_id: String,
        col: i32,
        row: i32,
    },

    #[error("Tile not on battle map: ({col}, {row})")]
    TileNotFound { col: i32, row: i32 },

    #[error("Malformed effect: {0}")]
    MalformedEffect(String),

    #[error("Battle is already concluded: {0}")]
    BattleConcluded(BattleId),

    #[error("Battle not found: {0}")]
    BattleNotFound(BattleId),

    #[error("Version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("Battle already exists: {0}")]
    BattleExists(BattleId),

    #[error("Battle store lock poisoned")]
    LockPoisoned,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
