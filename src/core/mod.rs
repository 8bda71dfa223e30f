pub mod config;
pub mod error;
pub mod types;

pub use config::{config, set_config, CombatConfig};
pub use error::{CombatError, Result};
pub use types::{BattleId, EffectId, IdAllocator, Round, UnitId};
