// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::Bbox;
use serde::{Deserialize, Serialize};

/// A geometry value as seen by the engine.
///
/// The underlying geometry engine here is rectangle-based: every shape is an
/// axis-aligned box or empty. Set operations are exact where the result is
/// again a box (containment, non-overlap, and full-width or full-height
/// slabs); in the remaining partial-overlap cases `difference` conservatively
/// returns the original shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    Empty,
    Rect(Bbox),
}

impl Geometry {
    pub fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Geometry::Rect(Bbox::new(x1, y1, x2, y2))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Geometry::Empty)
    }

    pub fn bounds(&self) -> Option<Bbox> {
        match self {
            Geometry::Empty => None,
            Geometry::Rect(b) => Some(*b),
        }
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.bounds().map(|b| b.center())
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => a.intersection(&b).is_some(),
            _ => false,
        }
    }

    pub fn intersection(&self, other: &Geometry) -> Geometry {
        match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => match a.intersection(&b) {
                Some(overlap) => Geometry::Rect(overlap),
                None => Geometry::Empty,
            },
            _ => Geometry::Empty,
        }
    }

    /// Subtract `other` from `self`.
    ///
    /// Exact when the overlap leaves a rectangular remainder: full coverage
    /// yields `Empty`, no overlap yields `self`, and an overlap spanning the
    /// full height (or width) and touching an edge yields the remaining
    /// slab. Other overlaps return `self` unchanged.
    pub fn difference(&self, other: &Geometry) -> Geometry {
        let (a, b) = match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => (a, b),
            (Some(_), None) => return self.clone(),
            (None, _) => return Geometry::Empty,
        };
        let overlap = match a.intersection(&b) {
            Some(overlap) => overlap,
            None => return self.clone(),
        };
        if b.contains(&a) {
            return Geometry::Empty;
        }
        let full_height = overlap.y1 <= a.y1 && overlap.y2 >= a.y2;
        let full_width = overlap.x1 <= a.x1 && overlap.x2 >= a.x2;
        if full_height && overlap.x1 <= a.x1 {
            return Geometry::Rect(Bbox::new(overlap.x2, a.y1, a.x2, a.y2));
        }
        if full_height && overlap.x2 >= a.x2 {
            return Geometry::Rect(Bbox::new(a.x1, a.y1, overlap.x1, a.y2));
        }
        if full_width && overlap.y1 <= a.y1 {
            return Geometry::Rect(Bbox::new(a.x1, overlap.y2, a.x2, a.y2));
        }
        if full_width && overlap.y2 >= a.y2 {
            return Geometry::Rect(Bbox::new(a.x1, a.y1, a.x2, overlap.y1));
        }
        self.clone()
    }
}
