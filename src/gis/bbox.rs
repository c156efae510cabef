// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box `(x1, y1, x2, y2)` with `x1 <= x2` and
/// `y1 <= y2` for any non-degenerate box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Bbox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A box is valid when its max corner is not below its min corner.
    /// Point-sized boxes are valid.
    pub fn is_valid(&self) -> bool {
        self.x2 >= self.x1 && self.y2 >= self.y1
    }

    pub fn is_point(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Overlapping box of two boxes, or `None` when they are disjoint.
    /// Boxes that merely touch share a degenerate (zero-area) overlap.
    pub fn intersection(&self, other: &Bbox) -> Option<Bbox> {
        let candidate = Bbox::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        candidate.is_valid().then_some(candidate)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    pub fn contains(&self, other: &Bbox) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_overlapping_boxes() {
        let a = Bbox::new(0.0, 0.0, 10.0, 10.0);
        let b = Bbox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.intersection(&b), Some(Bbox::new(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn intersection_of_disjoint_boxes_is_none() {
        let a = Bbox::new(0.0, 0.0, 1.0, 1.0);
        let b = Bbox::new(2.0, 2.0, 3.0, 3.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn reversed_box_is_invalid() {
        assert!(!Bbox::new(10.0, 0.0, 0.0, 10.0).is_valid());
        assert!(Bbox::new(3.0, 3.0, 3.0, 3.0).is_valid());
    }

    #[test]
    fn union_covers_both() {
        let a = Bbox::new(0.0, 0.0, 1.0, 1.0);
        let b = Bbox::new(4.0, -1.0, 5.0, 0.5);
        assert_eq!(a.union(&b), Bbox::new(0.0, -1.0, 5.0, 1.0));
    }
}
