// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::Request;
use crate::errors::EvalError;
use crate::gis::{Bbox, FeatureCollection, Geometry, RasterGrid, Series};

/// A resolved response, shaped per the capability that produced it.
///
/// The literal carriers (`Geometry`, `Number`, `Text`, `Request`) exist for
/// planned inputs that are already in final form: a block may hand such a
/// value to the evaluator as a literal, and it reaches `combine` untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Feature rows (geometry request, `intersects`/`centroid` mode).
    Features(FeatureCollection),
    /// Bounding box of all matching features (geometry request, `extent`
    /// mode); `None` when no feature matched.
    Extent {
        projection: String,
        extent: Option<Bbox>,
    },
    /// Cell values (raster request, `vals` mode).
    Grid(RasterGrid),
    /// Temporal axis (raster request, `time` mode).
    Time(Vec<i64>),
    /// Per-band metadata (raster request, `meta` mode).
    Meta(Vec<Option<String>>),
    /// An index-aligned scalar series.
    Series(Series),

    // Literal carriers.
    Geometry(Geometry),
    Number(f64),
    Text(String),
    Request(Request),
}

impl Value {
    pub fn into_features(self, kind: &'static str) -> Result<FeatureCollection, EvalError> {
        match self {
            Value::Features(fc) => Ok(fc),
            other => Err(Self::mismatch(kind, "features", &other)),
        }
    }

    pub fn into_grid(self, kind: &'static str) -> Result<RasterGrid, EvalError> {
        match self {
            Value::Grid(grid) => Ok(grid),
            other => Err(Self::mismatch(kind, "grid", &other)),
        }
    }

    pub fn into_series(self, kind: &'static str) -> Result<Series, EvalError> {
        match self {
            Value::Series(series) => Ok(series),
            other => Err(Self::mismatch(kind, "series", &other)),
        }
    }

    pub fn into_geometry(self, kind: &'static str) -> Result<Geometry, EvalError> {
        match self {
            Value::Geometry(geometry) => Ok(geometry),
            other => Err(Self::mismatch(kind, "geometry", &other)),
        }
    }

    pub fn into_request(self, kind: &'static str) -> Result<Request, EvalError> {
        match self {
            Value::Request(request) => Ok(request),
            other => Err(Self::mismatch(kind, "request", &other)),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Features(_) => "features",
            Value::Extent { .. } => "extent",
            Value::Grid(_) => "grid",
            Value::Time(_) => "time",
            Value::Meta(_) => "meta",
            Value::Series(_) => "series",
            Value::Geometry(_) => "geometry",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Request(_) => "request",
        }
    }

    fn mismatch(kind: &'static str, wanted: &str, got: &Value) -> EvalError {
        EvalError::fault(
            kind,
            format!("expected a {} input, got {}", wanted, got.shape_name()),
        )
    }
}
