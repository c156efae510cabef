// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Collaborator data model at the interface boundary of the engine.
//!
//! The evaluation core treats geometry and raster math as the business of an
//! external engine; this module supplies the minimal value types that cross
//! that boundary. Geometries are axis-aligned rectangles, which is enough to
//! exercise every request-shaping and response-combination rule without
//! pulling a full computational-geometry stack into the engine.

mod bbox;
mod features;
mod geometry;
mod grid;
mod series;

pub use bbox::Bbox;
pub use features::{Feature, FeatureCollection, PropertyValue};
pub use geometry::Geometry;
pub use grid::{Dtype, RasterGrid};
pub use series::Series;
