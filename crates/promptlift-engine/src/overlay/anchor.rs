//! Corner anchors the action control snaps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::page::{BoundingBox, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl AnchorCorner {
    pub const ALL: [AnchorCorner; 4] = [
        AnchorCorner::TopLeft,
        AnchorCorner::TopRight,
        AnchorCorner::BottomLeft,
        AnchorCorner::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorCorner::TopLeft => "top_left",
            AnchorCorner::TopRight => "top_right",
            AnchorCorner::BottomLeft => "bottom_left",
            AnchorCorner::BottomRight => "bottom_right",
        }
    }
}

impl fmt::Display for AnchorCorner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorCorner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnchorCorner::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown anchor corner '{s}'"))
    }
}

/// The four anchor points of an overlay, already inset so a control centered
/// on any of them stays inside the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSet {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl AnchorSet {
    pub fn from_box(bbox: &BoundingBox, inset: f64) -> Self {
        let left = bbox.x + inset;
        let right = bbox.right() - inset;
        let top = bbox.y + inset;
        let bottom = bbox.bottom() - inset;
        Self {
            top_left: Point::new(left, top),
            top_right: Point::new(right, top),
            bottom_left: Point::new(left, bottom),
            bottom_right: Point::new(right, bottom),
        }
    }

    pub fn get(&self, corner: AnchorCorner) -> Point {
        match corner {
            AnchorCorner::TopLeft => self.top_left,
            AnchorCorner::TopRight => self.top_right,
            AnchorCorner::BottomLeft => self.bottom_left,
            AnchorCorner::BottomRight => self.bottom_right,
        }
    }

    /// Anchor with the smallest Euclidean distance to `point`. Ties go to the
    /// earlier corner in [`AnchorCorner::ALL`].
    pub fn nearest(&self, point: Point) -> AnchorCorner {
        let mut best = AnchorCorner::TopLeft;
        let mut best_distance = f64::INFINITY;
        for corner in AnchorCorner::ALL {
            let distance = self.get(corner).distance_to(point);
            if distance < best_distance {
                best = corner;
                best_distance = distance;
            }
        }
        best
    }
}
