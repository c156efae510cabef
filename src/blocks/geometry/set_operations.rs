// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Set operations over feature blocks.

use crate::engine::EvalScope;
use crate::errors::EvalError;
use crate::gis::{FeatureCollection, Geometry};
use crate::protocol::{GeometryMode, Request, Value};
use crate::traits::{Block, BlockToken, GeometryBlock, GeometryRef, PlannedInput};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Subtract the geometries of `other` from those of `source`, matched by
/// row id.
///
/// Extent requests pass straight through to `source`: the true extent
/// might be smaller, but computing it would require doing the subtraction.
/// Feature requests first resolve `source`'s extent so only the relevant
/// region of `other` is fetched; a row of `source` with no counterpart row
/// in `other` passes through unchanged (`A − missing = A`).
#[derive(Debug)]
pub struct Difference {
    source: GeometryRef,
    other: GeometryRef,
    token: BlockToken,
}

impl Difference {
    pub fn new(source: GeometryRef, other: GeometryRef) -> Arc<Self> {
        let token = BlockToken::compose(
            "difference",
            [source.token().as_str(), other.token().as_str()],
        );
        Arc::new(Self {
            source,
            other,
            token,
        })
    }
}

#[async_trait]
impl Block for Difference {
    fn kind(&self) -> &'static str {
        "difference"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        let geometry_request = request.as_geometry(self.kind())?;
        if geometry_request.mode == GeometryMode::Extent {
            return Ok(vec![PlannedInput::evaluate(
                self.source.clone(),
                request.clone(),
            )]);
        }

        // Resolve the source's extent to bound what we fetch from `other`.
        let extent_value = scope
            .resolve(
                self.source.clone(),
                Request::Geometry(geometry_request.to_extent()),
            )
            .await?;
        let extent = match extent_value {
            Value::Extent { extent, .. } => extent,
            other => {
                return Err(EvalError::fault(
                    self.kind(),
                    format!("extent request resolved to {}", other.shape_name()),
                ))
            }
        };

        let bbox = match extent {
            Some(bbox) => bbox,
            // No geometries at all: short-circuit with an empty frame.
            None => {
                let empty = FeatureCollection::empty(geometry_request.projection.clone());
                return Ok(vec![PlannedInput::literal(Value::Features(empty))]);
            }
        };

        let mut other_request = geometry_request.clone();
        other_request.geometry = Geometry::Rect(bbox);
        Ok(vec![
            PlannedInput::evaluate(self.source.clone(), request.clone()),
            PlannedInput::evaluate(self.other.clone(), Request::Geometry(other_request)),
        ])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let mut inputs = inputs.into_iter();
        let source = inputs
            .next()
            .ok_or_else(|| EvalError::fault(self.kind(), "expected at least one input"))?;
        let other = match inputs.next() {
            // Extent passthrough or the empty-extent shortcut.
            None => return Ok(source),
            Some(other) => other,
        };

        let mut a = source.into_features(self.kind())?;
        let b = other.into_features(self.kind())?;
        if a.is_empty() || b.is_empty() {
            return Ok(Value::Features(a));
        }
        for (id, feature) in a.features.iter_mut() {
            if let Some(counterpart) = b.features.get(id) {
                feature.geometry = feature.geometry.difference(&counterpart.geometry);
            }
        }
        Ok(Value::Features(a))
    }
}

impl GeometryBlock for Difference {
    fn columns(&self) -> BTreeSet<String> {
        self.source.columns()
    }
}

/// Clip features to the requested geometry.
///
/// The requested geometry is already fully resolved data, so it is planned
/// as a literal second input rather than something to evaluate. In extent
/// mode the two bounding boxes are intersected instead.
#[derive(Debug)]
pub struct Intersection {
    source: GeometryRef,
    token: BlockToken,
}

impl Intersection {
    pub fn new(source: GeometryRef) -> Arc<Self> {
        let token = BlockToken::compose("intersection", [source.token().as_str()]);
        Arc::new(Self { source, token })
    }
}

#[async_trait]
impl Block for Intersection {
    fn kind(&self) -> &'static str {
        "intersection"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        let geometry_request = request.as_geometry(self.kind())?;
        Ok(vec![
            PlannedInput::evaluate(self.source.clone(), request.clone()),
            PlannedInput::literal(Value::Geometry(geometry_request.geometry.clone())),
        ])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let kind = self.kind();
        let mut inputs = inputs.into_iter();
        let (source, geometry) = match (inputs.next(), inputs.next()) {
            (Some(source), Some(geometry)) => (source, geometry.into_geometry(kind)?),
            _ => return Err(EvalError::fault(kind, "expected exactly two inputs")),
        };
        match source {
            Value::Features(mut fc) => {
                for feature in fc.features.values_mut() {
                    feature.geometry = feature.geometry.intersection(&geometry);
                }
                Ok(Value::Features(fc))
            }
            Value::Extent { projection, extent } => {
                let clipped = match (extent, geometry.bounds()) {
                    (Some(a), Some(b)) => a.intersection(&b),
                    _ => None,
                };
                Ok(Value::Extent {
                    projection,
                    extent: clipped,
                })
            }
            other => Err(EvalError::fault(
                kind,
                format!("expected features or extent, got {}", other.shape_name()),
            )),
        }
    }
}

impl GeometryBlock for Intersection {
    fn columns(&self) -> BTreeSet<String> {
        self.source.columns()
    }
}
