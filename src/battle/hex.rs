//! Hex coordinate system for battle maps
//!
//! Tiles are addressed by offset coordinates (col, row) in an "odd-r"
//! layout (pointy-top, odd rows shoved right). All geometry (distance,
//! neighbors, rings, lines) is done in axial coordinates (q, r).

use serde::{Deserialize, Serialize};

/// Offset coordinate of a tile on the battle map
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct OffsetCoord {
    pub col: i32,
    pub row: i32,
}

impl OffsetCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Convert to axial coordinates (odd-r layout)
    pub fn to_axial(&self) -> AxialCoord {
        let q = self.col - (self.row - (self.row & 1)) / 2;
        AxialCoord::new(q, self.row)
    }

    /// Hex distance between two tiles
    pub fn distance(&self, other: &Self) -> u32 {
        self.to_axial().distance(&other.to_axial())
    }
}

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AxialCoord {
    pub q: i32,
    pub r: i32,
}

impl AxialCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Convert back to offset coordinates (odd-r layout)
    pub fn to_offset(&self) -> OffsetCoord {
        let col = self.q + (self.r - (self.r & 1)) / 2;
        OffsetCoord::new(col, self.r)
    }

    /// Manhattan distance in hex space
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Neighbor in a given direction
    pub fn neighbor(&self, direction: HexDirection) -> Self {
        let offset = direction.offset();
        Self::new(self.q + offset.q, self.r + offset.r)
    }

    /// Get all 6 neighboring hex coordinates, in [`HexDirection::all`] order
    pub fn neighbors(&self) -> [AxialCoord; 6] {
        HexDirection::all().map(|direction| self.neighbor(direction))
    }

    /// All hexes at exactly `radius` steps, walking counter-clockwise from
    /// the south-west corner. Radius 0 yields the center itself.
    pub fn ring(&self, radius: u32) -> Vec<AxialCoord> {
        if radius == 0 {
            return vec![*self];
        }

        let mut results = Vec::with_capacity(6 * radius as usize);
        let start = HexDirection::SouthWest.offset();
        let mut current = AxialCoord::new(
            self.q + start.q * radius as i32,
            self.r + start.r * radius as i32,
        );
        for direction in RING_WALK {
            for _ in 0..radius {
                results.push(current);
                current = current.neighbor(direction);
            }
        }
        results
    }

    /// Center first, then rings 1 through `radius`
    pub fn spiral(&self, radius: u32) -> Vec<AxialCoord> {
        let mut results = vec![*self];
        for k in 1..=radius {
            results.extend(self.ring(k));
        }
        results
    }

    /// Get hex coordinates in a line from self to other (inclusive)
    pub fn line_to(&self, other: &Self) -> Vec<AxialCoord> {
        let n = self.distance(other) as i32;
        if n == 0 {
            return vec![*self];
        }

        // Nudge so that lines along tile edges resolve consistently
        const EPSILON: f64 = 1e-6;
        let mut results = Vec::with_capacity((n + 1) as usize);
        for i in 0..=n {
            let t = i as f64 / n as f64;
            let q = self.q as f64 + EPSILON + (other.q - self.q) as f64 * t;
            let r = self.r as f64 + EPSILON + (other.r - self.r) as f64 * t;
            results.push(Self::round(q, r));
        }
        results
    }

    /// Round floating point hex to nearest integer hex
    fn round(q: f64, r: f64) -> Self {
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }
}

/// Side order of a ring walk that starts on the south-west corner
const RING_WALK: [HexDirection; 6] = [
    HexDirection::East,
    HexDirection::NorthEast,
    HexDirection::NorthWest,
    HexDirection::West,
    HexDirection::SouthWest,
    HexDirection::SouthEast,
];

/// The six hex directions, clockwise starting east
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl HexDirection {
    /// Get the axial offset for this direction
    pub fn offset(&self) -> AxialCoord {
        match self {
            HexDirection::East => AxialCoord::new(1, 0),
            HexDirection::SouthEast => AxialCoord::new(0, 1),
            HexDirection::SouthWest => AxialCoord::new(-1, 1),
            HexDirection::West => AxialCoord::new(-1, 0),
            HexDirection::NorthWest => AxialCoord::new(0, -1),
            HexDirection::NorthEast => AxialCoord::new(1, -1),
        }
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::SouthEast,
            HexDirection::SouthWest,
            HexDirection::West,
            HexDirection::NorthWest,
            HexDirection::NorthEast,
        ]
    }
}
