//! Optimistically versioned battle storage
//!
//! Writers load a snapshot with its version, compute the next snapshot and
//! commit it against the version they loaded. A commit against a version
//! that has since moved fails with [`CombatError::VersionConflict`].

use std::sync::RwLock;

use ahash::AHashMap;
use tracing::warn;

use crate::battle::execution::BattleState;
use crate::core::error::{CombatError, Result};
use crate::core::types::BattleId;

/// Load/commit contract for battle snapshots
pub trait BattleStore: Send + Sync {
    /// Register a new battle at its current version
    fn insert(&self, state: BattleState) -> Result<()>;

    /// Current snapshot and its version
    fn load(&self, id: &BattleId) -> Result<(BattleState, u64)>;

    /// Replace the snapshot if the stored version still equals `expected`,
    /// returning the new version
    fn commit(&self, id: &BattleId, expected: u64, state: BattleState) -> Result<u64>;

    fn remove(&self, id: &BattleId) -> Result<Option<BattleState>>;
}

/// In-memory store for tests and the headless runner
#[derive(Default)]
pub struct InMemoryBattleStore {
    battles: RwLock<AHashMap<BattleId, BattleState>>,
}

impl InMemoryBattleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.battles.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BattleStore for InMemoryBattleStore {
    fn insert(&self, state: BattleState) -> Result<()> {
        let mut battles = self.battles.write().map_err(|_| CombatError::LockPoisoned)?;
        if battles.contains_key(&state.id) {
            return Err(CombatError::BattleExists(state.id));
        }
        battles.insert(state.id.clone(), state);
        Ok(())
    }

    fn load(&self, id: &BattleId) -> Result<(BattleState, u64)> {
        let battles = self.battles.read().map_err(|_| CombatError::LockPoisoned)?;
        let state = battles
            .get(id)
            .ok_or_else(|| CombatError::BattleNotFound(id.clone()))?;
        Ok((state.clone(), state.version))
    }

    fn commit(&self, id: &BattleId, expected: u64, state: BattleState) -> Result<u64> {
        let mut battles = self.battles.write().map_err(|_| CombatError::LockPoisoned)?;
        let current = battles
            .get_mut(id)
            .ok_or_else(|| CombatError::BattleNotFound(id.clone()))?;
        if current.version != expected {
            warn!(battle = %id, expected, found = current.version, "Stale battle commit rejected");
            return Err(CombatError::VersionConflict {
                expected,
                found: current.version,
            });
        }
        let version = state.version.max(expected + 1);
        *current = state;
        current.version = version;
        Ok(version)
    }

    fn remove(&self, id: &BattleId) -> Result<Option<BattleState>> {
        let mut battles = self.battles.write().map_err(|_| CombatError::LockPoisoned)?;
        Ok(battles.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::OffsetCoord;
    use crate::battle::units::BattleUnit;

    fn battle() -> BattleState {
        BattleState::new(
            "b1",
            7,
            vec![BattleUnit::new("a", "A", OffsetCoord::new(0, 0))],
        )
    }

    #[test]
    fn test_commit_bumps_version() {
        let store = InMemoryBattleStore::new();
        store.insert(battle()).unwrap();
        let id = BattleId::new("b1");
        let (mut state, version) = store.load(&id).unwrap();
        assert_eq!(version, 0);
        state.round = 3;
        assert_eq!(store.commit(&id, version, state).unwrap(), 1);
        let (reloaded, version) = store.load(&id).unwrap();
        assert_eq!(version, 1);
        assert_eq!(reloaded.round, 3);
    }

    #[test]
    fn test_stale_commit_conflicts() {
        let store = InMemoryBattleStore::new();
        store.insert(battle()).unwrap();
        let id = BattleId::new("b1");
        let (state, version) = store.load(&id).unwrap();
        store.commit(&id, version, state.clone()).unwrap();
        let err = store.commit(&id, version, state).unwrap_err();
        assert!(matches!(err, CombatError::VersionConflict { expected: 0, found: 1 }));
    }

    #[test]
    fn test_missing_and_duplicate_battles() {
        let store = InMemoryBattleStore::new();
        assert!(matches!(
            store.load(&BattleId::new("nope")),
            Err(CombatError::BattleNotFound(_))
        ));
        store.insert(battle()).unwrap();
        assert!(matches!(store.insert(battle()), Err(CombatError::BattleExists(_))));
        assert!(store.remove(&BattleId::new("b1")).unwrap().is_some());
        assert!(store.is_empty());
    }
}
