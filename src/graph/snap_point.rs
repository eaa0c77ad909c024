//! # Snap Points
//!
//! Connection points owned by a block. Owners and peers are referenced by id, never by
//! pointer, so the graph tables hold every snap point exactly once.

use super::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A 2D position in canvas units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance, used to rank snap candidates.
    pub fn distance_to(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// True when both axes are within `radius` of `other`.
    pub fn within(self, other: Point, radius: f64) -> bool {
        let delta = self - other;
        delta.x.abs() <= radius && delta.y.abs() <= radius
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapPointKind {
    /// Accepts the next statement of the owning block's chain.
    PrimaryNotch,
    /// Attaches the owning block below a notch.
    PrimaryDivot,
    /// Opens a nested scope body.
    SecondaryNotch,
    Joint,
}

impl SnapPointKind {
    pub fn is_notch(self) -> bool {
        matches!(self, SnapPointKind::PrimaryNotch | SnapPointKind::SecondaryNotch)
    }

    pub fn is_divot(self) -> bool {
        self == SnapPointKind::PrimaryDivot
    }

    fn slug(self) -> &'static str {
        match self {
            SnapPointKind::PrimaryNotch | SnapPointKind::SecondaryNotch => "notch",
            SnapPointKind::PrimaryDivot => "divot",
            SnapPointKind::Joint => "joint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapPointId(String);

impl SnapPointId {
    /// Deterministic id: the same block id and segment slot always yields the same snap point id.
    pub fn derive(block: &BlockId, segment_index: usize, kind: SnapPointKind) -> Self {
        Self(format!("{}-{}-{}", kind.slug(), segment_index, block))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapPoint {
    pub id: SnapPointId,
    /// Owning block.
    pub block: BlockId,
    pub segment_id: String,
    pub segment_index: usize,
    pub kind: SnapPointKind,
    pub previous: Option<SnapPointId>,
    pub next: Option<SnapPointId>,
    /// Position relative to the owning block, supplied by the layout.
    pub position: Point,
}

impl SnapPoint {
    pub fn is_linked(&self) -> bool {
        self.previous.is_some() || self.next.is_some()
    }
}
