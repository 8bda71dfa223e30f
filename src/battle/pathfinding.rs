//! A* pathfinding for battle maps
//!
//! Each step costs `cost(to) + cost(from)`, so an expensive tile penalizes
//! both entering and leaving it. The heuristic is the hex distance from the
//! candidate tile back to the *origin*; existing path choices depend on it.
//!
//! Results are memoized per calculator. Callers that need different tile
//! costs (e.g. obstacle marking) build a fresh calculator with an
//! [`ObstacleOverlay`]; the map itself is never modified.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::battle::battle_map::BattleMap;
use crate::battle::hex::OffsetCoord;

/// Shared, cached path from origin to goal (both inclusive)
pub type Path = Rc<Vec<OffsetCoord>>;

/// Read-only movement cost overrides laid over a map
#[derive(Debug, Clone, Default)]
pub struct ObstacleOverlay {
    costs: AHashMap<OffsetCoord, f64>,
}

impl ObstacleOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the cost of a tile
    pub fn mark(&mut self, coord: OffsetCoord, cost: f64) {
        self.costs.insert(coord, cost);
    }

    pub fn cost_at(&self, coord: OffsetCoord) -> Option<f64> {
        self.costs.get(&coord).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: OffsetCoord,
    f_cost: OrderedFloat<f64>,
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier insertions win ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Memoizing shortest-path calculator bound to one map
pub struct PathCalculator<'a> {
    map: &'a BattleMap,
    overlay: Option<ObstacleOverlay>,
    cache: RefCell<AHashMap<(OffsetCoord, OffsetCoord), Option<Path>>>,
}

impl<'a> PathCalculator<'a> {
    pub fn new(map: &'a BattleMap) -> Self {
        Self {
            map,
            overlay: None,
            cache: RefCell::new(AHashMap::new()),
        }
    }

    /// Calculator that sees overlay costs instead of the map's own costs
    pub fn with_overlay(map: &'a BattleMap, overlay: ObstacleOverlay) -> Self {
        Self {
            map,
            overlay: Some(overlay),
            cache: RefCell::new(AHashMap::new()),
        }
    }

    pub fn map(&self) -> &BattleMap {
        self.map
    }

    /// Effective movement cost of a tile, `None` when off the map
    pub fn cost(&self, coord: OffsetCoord) -> Option<f64> {
        let tile = self.map.get(coord)?;
        let overridden = self.overlay.as_ref().and_then(|o| o.cost_at(coord));
        Some(overridden.unwrap_or(tile.movement_cost))
    }

    /// Shortest path from `origin` to `goal`, `None` when unreachable
    ///
    /// Repeated queries return the same shared path.
    pub fn shortest_path(&self, origin: OffsetCoord, goal: OffsetCoord) -> Option<Path> {
        let key = (origin, goal);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }
        let path = self.find_path(origin, goal).map(Rc::new);
        self.cache.borrow_mut().insert(key, path.clone());
        path
    }

    fn find_path(&self, origin: OffsetCoord, goal: OffsetCoord) -> Option<Vec<OffsetCoord>> {
        if !self.map.contains(origin) || !self.map.contains(goal) {
            return None;
        }
        if origin == goal {
            return Some(vec![origin]);
        }

        let mut open_set = BinaryHeap::new();
        let mut closed: AHashSet<OffsetCoord> = AHashSet::new();
        let mut came_from: AHashMap<OffsetCoord, OffsetCoord> = AHashMap::new();
        let mut g_scores: AHashMap<OffsetCoord, f64> = AHashMap::new();
        let mut seq = 0u64;

        g_scores.insert(origin, 0.0);
        open_set.push(PathNode {
            coord: origin,
            f_cost: OrderedFloat(0.0),
            seq,
        });

        while let Some(current) = open_set.pop() {
            if current.coord == goal {
                return Some(reconstruct_path(&came_from, current.coord));
            }
            if !closed.insert(current.coord) {
                continue;
            }

            let current_g = g_scores.get(&current.coord).copied().unwrap_or(f64::INFINITY);
            let from_cost = self.cost(current.coord).unwrap_or(f64::INFINITY);

            for neighbor in self.map.neighbors(current.coord) {
                if closed.contains(&neighbor) {
                    continue;
                }
                let Some(to_cost) = self.cost(neighbor) else {
                    continue;
                };
                let step = to_cost + from_cost;
                if step.is_infinite() {
                    continue;
                }

                let tentative_g = current_g + step;
                let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(f64::INFINITY);
                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.coord);
                    g_scores.insert(neighbor, tentative_g);

                    seq += 1;
                    let heuristic = neighbor.distance(&origin) as f64;
                    open_set.push(PathNode {
                        coord: neighbor,
                        f_cost: OrderedFloat(tentative_g + heuristic),
                        seq,
                    });
                }
            }
        }

        None // No path found
    }
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<OffsetCoord, OffsetCoord>,
    mut current: OffsetCoord,
) -> Vec<OffsetCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Calculate total cost of a path under a calculator's costs
pub fn path_cost(calculator: &PathCalculator, path: &[OffsetCoord]) -> f64 {
    path.windows(2)
        .map(|step| {
            calculator.cost(step[0]).unwrap_or(f64::INFINITY)
                + calculator.cost(step[1]).unwrap_or(f64::INFINITY)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_path() {
        let map = BattleMap::new(10, 10);
        let calc = PathCalculator::new(&map);
        let path = calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(5, 0))
            .expect("open map is connected");
        assert_eq!(path.first(), Some(&OffsetCoord::new(0, 0)));
        assert_eq!(path.last(), Some(&OffsetCoord::new(5, 0)));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_same_tile_path() {
        let map = BattleMap::new(3, 3);
        let calc = PathCalculator::new(&map);
        let path = calc.shortest_path(OffsetCoord::new(1, 1), OffsetCoord::new(1, 1));
        assert_eq!(path.as_deref(), Some(&vec![OffsetCoord::new(1, 1)]));
    }

    #[test]
    fn test_path_around_wall() {
        let mut map = BattleMap::new(5, 5);
        for row in 0..4 {
            map.set_movement_cost(OffsetCoord::new(2, row), f64::INFINITY);
        }
        let calc = PathCalculator::new(&map);
        let path = calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(4, 0))
            .expect("gap at the bottom");
        assert!(path.contains(&OffsetCoord::new(2, 4)));
        for pair in path.windows(2) {
            assert_eq!(pair[0].distance(&pair[1]), 1);
        }
    }

    #[test]
    fn test_unreachable_goal() {
        let mut map = BattleMap::new(5, 5);
        for row in 0..5 {
            map.set_movement_cost(OffsetCoord::new(2, row), f64::INFINITY);
        }
        let calc = PathCalculator::new(&map);
        assert!(calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(4, 4))
            .is_none());
    }

    #[test]
    fn test_off_map_goal() {
        let map = BattleMap::new(3, 3);
        let calc = PathCalculator::new(&map);
        assert!(calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(9, 9))
            .is_none());
    }

    #[test]
    fn test_cache_returns_same_path() {
        let map = BattleMap::new(8, 8);
        let calc = PathCalculator::new(&map);
        let first = calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(7, 7))
            .expect("reachable");
        let second = calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(7, 7))
            .expect("reachable");
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_overlay_routes_around_obstacle() {
        let map = BattleMap::new(6, 3);
        let plain = PathCalculator::new(&map);
        let direct = plain
            .shortest_path(OffsetCoord::new(0, 1), OffsetCoord::new(4, 1))
            .expect("reachable");
        assert!(direct.contains(&OffsetCoord::new(2, 1)));

        let mut overlay = ObstacleOverlay::new();
        overlay.mark(OffsetCoord::new(2, 1), 100.0);
        let avoiding = PathCalculator::with_overlay(&map, overlay);
        let detour = avoiding
            .shortest_path(OffsetCoord::new(0, 1), OffsetCoord::new(4, 1))
            .expect("reachable");
        assert!(!detour.contains(&OffsetCoord::new(2, 1)));
        // Base map untouched
        assert_eq!(map.get(OffsetCoord::new(2, 1)).map(|t| t.movement_cost), Some(1.0));
    }

    #[test]
    fn test_path_cost_counts_both_endpoints() {
        let mut map = BattleMap::new(4, 1);
        map.set_movement_cost(OffsetCoord::new(1, 0), 3.0);
        let calc = PathCalculator::new(&map);
        let path = calc
            .shortest_path(OffsetCoord::new(0, 0), OffsetCoord::new(2, 0))
            .expect("reachable");
        // (1 + 3) entering, (3 + 1) leaving
        assert_eq!(path_cost(&calc, &path), 8.0);
    }
}
