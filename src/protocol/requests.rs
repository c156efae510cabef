// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::EvalError;
use crate::gis::{Bbox, Geometry, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a geometry request wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryMode {
    /// Features whose geometry intersects the requested geometry.
    Intersects,
    /// Features whose centroid lies within the requested geometry.
    Centroid,
    /// Only the bounding box containing all matching features.
    Extent,
}

/// A request against a vector-feature block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRequest {
    pub mode: GeometryMode,
    pub geometry: Geometry,
    pub projection: String,
    pub limit: Option<usize>,
    /// Features whose bbox is smaller than this on all sides are left out.
    pub min_size: Option<f64>,
    pub start: Option<i64>,
    pub stop: Option<i64>,
    /// Equality filters on properties. Keys are plain field names; lookup
    /// syntax (`field__op`) is not supported.
    pub filters: BTreeMap<String, PropertyValue>,
}

impl GeometryRequest {
    pub fn new(mode: GeometryMode, geometry: Geometry, projection: impl Into<String>) -> Self {
        Self {
            mode,
            geometry,
            projection: projection.into(),
            limit: None,
            min_size: None,
            start: None,
            stop: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, field: &str, value: impl Into<PropertyValue>) -> Self {
        self.filters.insert(field.to_string(), value.into());
        self
    }

    /// Copy of this request asking for the extent instead of features.
    pub fn to_extent(&self) -> Self {
        Self {
            mode: GeometryMode::Extent,
            ..self.clone()
        }
    }
}

/// What a raster request wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterMode {
    /// Cell values for a bbox at a given resolution.
    Vals,
    /// The temporal axis.
    Time,
    /// Per-band metadata.
    Meta,
}

/// A request against a raster block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterRequest {
    pub mode: RasterMode,
    pub bbox: Option<Bbox>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub projection: Option<String>,
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

impl RasterRequest {
    pub fn vals(bbox: Bbox, width: usize, height: usize, projection: impl Into<String>) -> Self {
        Self {
            mode: RasterMode::Vals,
            bbox: Some(bbox),
            width: Some(width),
            height: Some(height),
            projection: Some(projection.into()),
            start: None,
            stop: None,
        }
    }

    pub fn time() -> Self {
        Self {
            mode: RasterMode::Time,
            bbox: None,
            width: None,
            height: None,
            projection: None,
            start: None,
            stop: None,
        }
    }

    pub fn meta() -> Self {
        Self {
            mode: RasterMode::Meta,
            ..Self::time()
        }
    }

    /// The `(bbox, width, height)` triple of a `vals` request, validated.
    /// A reversed bbox is a request error; a point-sized bbox is legal.
    pub fn resolution(&self, kind: &'static str) -> Result<(Bbox, usize, usize), EvalError> {
        let bbox = self
            .bbox
            .ok_or_else(|| EvalError::request(kind, "vals request is missing a bbox"))?;
        if !bbox.is_valid() {
            return Err(EvalError::request(
                kind,
                format!(
                    "invalid bbox ({}, {}, {}, {})",
                    bbox.x1, bbox.y1, bbox.x2, bbox.y2
                ),
            ));
        }
        let width = self
            .width
            .filter(|w| *w > 0)
            .ok_or_else(|| EvalError::request(kind, "vals request needs a positive width"))?;
        let height = self
            .height
            .filter(|h| *h > 0)
            .ok_or_else(|| EvalError::request(kind, "vals request needs a positive height"))?;
        Ok((bbox, width, height))
    }
}

/// A request to any block, shaped per the block's capability.
///
/// Scalar-series blocks carry no request shape of their own: they are
/// evaluated against the geometry request of the feature frame their rows
/// align with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Geometry(GeometryRequest),
    Raster(RasterRequest),
}

impl Request {
    pub fn as_geometry(&self, kind: &'static str) -> Result<&GeometryRequest, EvalError> {
        match self {
            Request::Geometry(r) => Ok(r),
            Request::Raster(_) => Err(EvalError::request(
                kind,
                "expected a geometry request, got a raster request",
            )),
        }
    }

    pub fn as_raster(&self, kind: &'static str) -> Result<&RasterRequest, EvalError> {
        match self {
            Request::Raster(r) => Ok(r),
            Request::Geometry(_) => Err(EvalError::request(
                kind,
                "expected a raster request, got a geometry request",
            )),
        }
    }

    /// Short label for log messages.
    pub fn label(&self) -> &'static str {
        match self {
            Request::Geometry(r) => match r.mode {
                GeometryMode::Intersects => "intersects",
                GeometryMode::Centroid => "centroid",
                GeometryMode::Extent => "extent",
            },
            Request::Raster(r) => match r.mode {
                RasterMode::Vals => "vals",
                RasterMode::Time => "time",
                RasterMode::Meta => "meta",
            },
        }
    }
}

impl From<GeometryRequest> for Request {
    fn from(r: GeometryRequest) -> Self {
        Request::Geometry(r)
    }
}

impl From<RasterRequest> for Request {
    fn from(r: RasterRequest) -> Self {
        Request::Raster(r)
    }
}

/// Canonical serialization of a request, used as the request half of a
/// cache key. Struct field order is fixed and filter maps are sorted, so
/// equal requests always canonicalize identically.
pub fn canonical_request(request: &Request) -> Result<String, EvalError> {
    // A serialization failure here is an engine defect, not bad input.
    serde_json::to_string(request)
        .map_err(|e| EvalError::fault("canonicalize", format!("request serialization: {e}")))
}
