//! Core types for the intersection simulation
//!
//! Directions, signal axes and the per-approach container shared by the
//! queue simulator, the metrics and the timing policies.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// Shortest green a policy may return, in seconds
pub const MIN_GREEN: f64 = 10.0;
/// Longest green a policy may return, in seconds
pub const MAX_GREEN: f64 = 90.0;
/// Green time of the fixed-time baseline
pub const DEFAULT_FIXED_GREEN: f64 = 40.0;
pub const YELLOW_TIME: f64 = 3.0;
pub const ALL_RED_TIME: f64 = 2.0;

/// Saturation flow of a green approach, in vehicles per second
pub const SATURATION_FLOW: f64 = 2.0;
/// Default simulation step, in seconds
pub const DEFAULT_DELTA: f64 = 1.0;
/// Longest simulation step accepted, in seconds
pub const MAX_DELTA: f64 = 60.0;
pub const DEFAULT_SEED: u64 = 42;

/// Density points contributed by each queued vehicle
pub const DENSITY_PER_VEHICLE: f64 = 2.0;
pub const MAX_DENSITY: f64 = 100.0;
/// Highest arrival rate a scenario may carry, in vehicles per minute per approach
pub const MAX_ARRIVAL_RATE: f64 = 600.0;
/// Waiting times above this are reported to the controller as this value
pub const MAX_WAITING: f64 = 300.0;

/// Comparisons never simulate more than this many seconds
pub const COMPARISON_DURATION_CAP: f64 = 1800.0;

/// One of the four approaches of the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Fixed iteration order used everywhere per-direction data is stored
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    /// The approach facing this one across the intersection
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// The two approaches on the crossing street
    pub fn perpendicular(self) -> [Direction; 2] {
        match self.axis() {
            Axis::NorthSouth => [Direction::East, Direction::West],
            Axis::EastWest => [Direction::North, Direction::South],
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A pair of opposing approaches that share a green phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn directions(self) -> [Direction; 2] {
        match self {
            Axis::NorthSouth => [Direction::North, Direction::South],
            Axis::EastWest => [Direction::East, Direction::West],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::NorthSouth => "N-S",
            Axis::EastWest => "E-W",
        }
    }
}

/// One value per approach, indexed by [`Direction`]
///
/// Serializes as a map keyed by direction name.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerDirection<T>(pub [T; 4]);

impl<T> PerDirection<T> {
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self(Direction::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerDirection<U> {
        PerDirection::from_fn(|direction| f(&self[direction]))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone> PerDirection<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        &self.0[direction.index()]
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        &mut self.0[direction.index()]
    }
}

impl<T: Serialize> Serialize for PerDirection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for (direction, value) in self.iter() {
            map.serialize_entry(direction.name(), value)?;
        }
        map.end()
    }
}
