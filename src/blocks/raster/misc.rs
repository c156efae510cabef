// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cell-wise raster operations and vector-to-raster conversion.
//!
//! All blocks here are single-store transforms except [`Clip`] (two raster
//! inputs) and [`Rasterize`] (a vector-feature input). `time` and `meta`
//! requests pass through the primary store untouched; only `vals` requests
//! transform cells. Derived grids use the declared dtype's maximum value as
//! their no-data sentinel unless documented otherwise.

use crate::engine::EvalScope;
use crate::errors::{ConstructionError, EvalError};
use crate::gis::{Bbox, Dtype, RasterGrid};
use crate::protocol::{GeometryMode, GeometryRequest, RasterMode, Request, Value};
use crate::traits::{Block, BlockToken, GeometryRef, PlannedInput, RasterBlock, RasterRef};
use async_trait::async_trait;
use std::sync::Arc;

/// Mask `store` by the data footprint of `source`: cells where `source`
/// has no data (or `false`, for a boolean source) become no-data.
#[derive(Debug)]
pub struct Clip {
    store: RasterRef,
    source: RasterRef,
    token: BlockToken,
}

impl Clip {
    pub fn new(store: RasterRef, source: RasterRef) -> Arc<Self> {
        let token = BlockToken::compose(
            "clip",
            [store.token().as_str(), source.token().as_str()],
        );
        Arc::new(Self {
            store,
            source,
            token,
        })
    }
}

#[async_trait]
impl Block for Clip {
    fn kind(&self) -> &'static str {
        "clip"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        let raster_request = request.as_raster(self.kind())?;
        let mut planned = vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )];
        if raster_request.mode == RasterMode::Vals {
            planned.push(PlannedInput::evaluate(self.source.clone(), request.clone()));
        }
        Ok(planned)
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let kind = self.kind();
        let mut inputs = inputs.into_iter();
        let store = inputs
            .next()
            .ok_or_else(|| EvalError::fault(kind, "expected at least one input"))?;
        let source = match inputs.next() {
            None => return Ok(store),
            Some(source) => source.into_grid(kind)?,
        };
        let mut grid = store.into_grid(kind)?;
        if grid.cell_count() != source.cell_count() {
            return Err(EvalError::fault(kind, "store and source grid shapes differ"));
        }
        let boolean_source = self.source.dtype() == Dtype::Bool;
        let no_data = grid.no_data_value;
        for (cell, &mask) in grid.values.iter_mut().zip(source.values.iter()) {
            if source.no_data_value == mask || (boolean_source && mask == 0.0) {
                *cell = no_data;
            }
        }
        Ok(Value::Grid(grid))
    }
}

impl RasterBlock for Clip {
    fn dtype(&self) -> Dtype {
        self.store.dtype()
    }

    fn fill_value(&self) -> f64 {
        self.store.fill_value()
    }

    fn extent(&self) -> Option<Bbox> {
        match (self.store.extent(), self.source.extent()) {
            (Some(a), Some(b)) => a.intersection(&b),
            _ => None,
        }
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Replace every data cell with a constant.
///
/// The sentinel flips to keep it distinguishable: masking to `0` fills with
/// `1` and anything else fills with `0`. Integer values yield a `u8` grid,
/// fractional ones an `f32` grid.
#[derive(Debug)]
pub struct Mask {
    store: RasterRef,
    value: f64,
    token: BlockToken,
}

impl Mask {
    pub fn new(store: RasterRef, value: f64) -> Arc<Self> {
        let token = BlockToken::compose("mask", [store.token().as_str(), &value.to_string()]);
        Arc::new(Self {
            store,
            value,
            token,
        })
    }
}

#[async_trait]
impl Block for Mask {
    fn kind(&self) -> &'static str {
        "mask"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        match single(self.kind(), inputs)? {
            Value::Grid(grid) => {
                let value = self.value;
                Ok(Value::Grid(grid.map_cells(self.fill_value(), |_| value)))
            }
            passthrough => Ok(passthrough),
        }
    }
}

impl RasterBlock for Mask {
    fn dtype(&self) -> Dtype {
        if self.value.fract() == 0.0 {
            Dtype::U8
        } else {
            Dtype::F32
        }
    }

    fn fill_value(&self) -> f64 {
        if self.value == 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn extent(&self) -> Option<Bbox> {
        self.store.extent()
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Turn every cell below a threshold into no-data; other cells pass
/// through unchanged.
#[derive(Debug)]
pub struct MaskBelow {
    store: RasterRef,
    value: f64,
    token: BlockToken,
}

impl MaskBelow {
    pub fn new(store: RasterRef, value: f64) -> Arc<Self> {
        let token =
            BlockToken::compose("mask_below", [store.token().as_str(), &value.to_string()]);
        Arc::new(Self {
            store,
            value,
            token,
        })
    }
}

#[async_trait]
impl Block for MaskBelow {
    fn kind(&self) -> &'static str {
        "mask_below"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        match single(self.kind(), inputs)? {
            Value::Grid(grid) => {
                let threshold = self.value;
                let no_data = grid.no_data_value;
                Ok(Value::Grid(grid.map_cells(no_data, |v| {
                    if v < threshold {
                        no_data
                    } else {
                        v
                    }
                })))
            }
            passthrough => Ok(passthrough),
        }
    }
}

impl RasterBlock for MaskBelow {
    fn dtype(&self) -> Dtype {
        self.store.dtype()
    }

    fn fill_value(&self) -> f64 {
        self.store.fill_value()
    }

    fn extent(&self) -> Option<Bbox> {
        self.store.extent()
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Apply a step function: cells below `location` become `left`, cells above
/// become `right`, cells exactly at it become `at` (the mean of `left` and
/// `right` unless given). No-data cells stay no-data.
#[derive(Debug)]
pub struct Step {
    store: RasterRef,
    left: f64,
    right: f64,
    location: f64,
    at: f64,
    token: BlockToken,
}

impl Step {
    pub fn new(
        store: RasterRef,
        left: f64,
        right: f64,
        location: f64,
        at: Option<f64>,
    ) -> Arc<Self> {
        let at = at.unwrap_or((left + right) / 2.0);
        let token = BlockToken::compose(
            "step",
            [
                store.token().as_str(),
                &left.to_string(),
                &right.to_string(),
                &location.to_string(),
                &at.to_string(),
            ],
        );
        Arc::new(Self {
            store,
            left,
            right,
            location,
            at,
            token,
        })
    }
}

#[async_trait]
impl Block for Step {
    fn kind(&self) -> &'static str {
        "step"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        match single(self.kind(), inputs)? {
            Value::Grid(grid) => {
                let (left, right, location, at) = (self.left, self.right, self.location, self.at);
                let no_data = grid.no_data_value;
                Ok(Value::Grid(grid.map_cells(no_data, |v| {
                    if v < location {
                        left
                    } else if v > location {
                        right
                    } else {
                        at
                    }
                })))
            }
            passthrough => Ok(passthrough),
        }
    }
}

impl RasterBlock for Step {
    fn dtype(&self) -> Dtype {
        Dtype::F32
    }

    fn extent(&self) -> Option<Bbox> {
        self.store.extent()
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Bin cells into indices, numpy-`digitize` style.
///
/// With `right = false` (the default convention) bin edges are left-closed:
/// a cell equal to an edge lands in the bin to its right. `right = true`
/// flips every edge. Output indices run from `0` (below all edges) to
/// `bins.len()` (above all edges); no-data cells map to the fill, which is
/// the maximum of the smallest unsigned dtype that can hold `bins.len() + 2`
/// distinct values.
#[derive(Debug)]
pub struct Classify {
    store: RasterRef,
    bins: Vec<f64>,
    right: bool,
    dtype: Dtype,
    token: BlockToken,
}

impl Classify {
    pub fn new(
        store: RasterRef,
        bins: Vec<f64>,
        right: bool,
    ) -> Result<Arc<Self>, ConstructionError> {
        if bins.is_empty() {
            return Err(ConstructionError::invalid("classify", "bins are empty"));
        }
        if bins.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConstructionError::invalid(
                "classify",
                "bins must be strictly increasing",
            ));
        }
        let dtype = Dtype::smallest_uint(bins.len() + 2);
        let mut parts = vec![store.token().as_str().to_string(), right.to_string()];
        parts.extend(bins.iter().map(|b| b.to_string()));
        let token = BlockToken::compose("classify", parts);
        Ok(Arc::new(Self {
            store,
            bins,
            right,
            dtype,
            token,
        }))
    }

    fn digitize(&self, value: f64) -> usize {
        if self.right {
            self.bins.partition_point(|&edge| edge < value)
        } else {
            self.bins.partition_point(|&edge| edge <= value)
        }
    }
}

#[async_trait]
impl Block for Classify {
    fn kind(&self) -> &'static str {
        "classify"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        match single(self.kind(), inputs)? {
            Value::Grid(grid) => Ok(Value::Grid(
                grid.map_cells(self.fill_value(), |v| self.digitize(v) as f64),
            )),
            passthrough => Ok(passthrough),
        }
    }
}

impl RasterBlock for Classify {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn extent(&self) -> Option<Bbox> {
        self.store.extent()
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Remap individual cell values through a lookup table.
///
/// Only integral (or boolean) stores can be reclassified. With
/// `select = false` unmapped values pass through unchanged; with
/// `select = true` they are discarded to the fill value. The store's
/// no-data value maps to the fill either way.
#[derive(Debug)]
pub struct Reclassify {
    store: RasterRef,
    mapping: Vec<(f64, f64)>,
    select: bool,
    token: BlockToken,
}

impl Reclassify {
    pub fn new(
        store: RasterRef,
        mut mapping: Vec<(f64, f64)>,
        select: bool,
    ) -> Result<Arc<Self>, ConstructionError> {
        if !store.dtype().is_integral() {
            return Err(ConstructionError::invalid(
                "reclassify",
                format!("store dtype {:?} is not integral", store.dtype()),
            ));
        }
        if let Some((source, _)) = mapping.iter().find(|(source, _)| source.fract() != 0.0) {
            return Err(ConstructionError::invalid(
                "reclassify",
                format!("source value {source} is not an integer"),
            ));
        }
        mapping.sort_by(|a, b| a.0.total_cmp(&b.0));
        if mapping.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(ConstructionError::invalid(
                "reclassify",
                "duplicate source values in mapping",
            ));
        }
        let mut parts = vec![store.token().as_str().to_string(), select.to_string()];
        parts.extend(mapping.iter().map(|(s, t)| format!("{s}:{t}")));
        let token = BlockToken::compose("reclassify", parts);
        Ok(Arc::new(Self {
            store,
            mapping,
            select,
            token,
        }))
    }

    fn remap(&self, value: f64) -> f64 {
        match self
            .mapping
            .binary_search_by(|(source, _)| source.total_cmp(&value))
        {
            Ok(index) => self.mapping[index].1,
            Err(_) if self.select => self.fill_value(),
            Err(_) => value,
        }
    }
}

#[async_trait]
impl Block for Reclassify {
    fn kind(&self) -> &'static str {
        "reclassify"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.store.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        match single(self.kind(), inputs)? {
            Value::Grid(grid) => Ok(Value::Grid(
                grid.map_cells(self.fill_value(), |v| self.remap(v)),
            )),
            passthrough => Ok(passthrough),
        }
    }
}

impl RasterBlock for Reclassify {
    fn dtype(&self) -> Dtype {
        Dtype::F64
    }

    fn extent(&self) -> Option<Bbox> {
        self.store.extent()
    }

    fn period(&self) -> Option<(i64, i64)> {
        self.store.period()
    }
}

/// Burn a vector-feature block onto a requested grid.
///
/// Without a column the result is a boolean presence grid (`1` where a
/// feature covers the cell center, `0` elsewhere). With a column the
/// covering feature's property value is burned in, features with higher
/// row ids painting over lower ones; a row whose properties lack the column
/// falls back to its row id, which covers sources that keep the id in the
/// index rather than in a property.
#[derive(Debug)]
pub struct Rasterize {
    source: GeometryRef,
    column: Option<String>,
    dtype: Dtype,
    limit: Option<usize>,
    token: BlockToken,
}

impl Rasterize {
    pub fn new(
        source: GeometryRef,
        column: Option<String>,
        dtype: Option<Dtype>,
        limit: Option<usize>,
    ) -> Result<Arc<Self>, ConstructionError> {
        if let Some(column) = &column {
            if !source.columns().contains(column) {
                return Err(ConstructionError::UnknownColumn {
                    kind: "rasterize",
                    column: column.clone(),
                });
            }
        }
        if column.is_none() && dtype.is_some_and(|d| d != Dtype::Bool) {
            return Err(ConstructionError::invalid(
                "rasterize",
                "a presence grid is always boolean; dtype only applies with a column",
            ));
        }
        if limit == Some(0) {
            return Err(ConstructionError::invalid("rasterize", "limit must be positive"));
        }
        let dtype = dtype.unwrap_or(if column.is_some() {
            Dtype::I32
        } else {
            Dtype::Bool
        });
        let token = BlockToken::compose(
            "rasterize",
            [
                source.token().as_str(),
                column.as_deref().unwrap_or(""),
                &format!("{dtype:?}"),
                &limit.map(|l| l.to_string()).unwrap_or_default(),
            ],
        );
        Ok(Arc::new(Self {
            source,
            column,
            dtype,
            limit,
            token,
        }))
    }

}

#[async_trait]
impl Block for Rasterize {
    fn kind(&self) -> &'static str {
        "rasterize"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        let raster_request = request.as_raster(self.kind())?;
        match raster_request.mode {
            // The result is a single nontemporal frame.
            RasterMode::Time => return Ok(vec![PlannedInput::literal(Value::Time(vec![0]))]),
            RasterMode::Meta => return Ok(vec![PlannedInput::literal(Value::Meta(vec![None]))]),
            RasterMode::Vals => {}
        }
        let (bbox, width, height) = raster_request.resolution(self.kind())?;
        let projection = raster_request.projection.clone().ok_or_else(|| {
            EvalError::request(self.kind(), "vals request needs a projection")
        })?;

        let mut geometry_request = GeometryRequest::new(
            GeometryMode::Intersects,
            crate::gis::Geometry::Rect(bbox),
            projection,
        );
        // Features smaller than one pixel cannot show up anyway.
        if !bbox.is_point() {
            geometry_request.min_size = Some(
                (bbox.width() / width as f64).min(bbox.height() / height as f64),
            );
        }
        geometry_request.limit =
            Some(self.limit.unwrap_or(scope.settings().geometry_limit));
        geometry_request.start = raster_request.start;
        geometry_request.stop = raster_request.stop;

        Ok(vec![
            PlannedInput::evaluate(self.source.clone(), geometry_request),
            PlannedInput::literal(Value::Request(request.clone())),
        ])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let kind = self.kind();
        let mut inputs = inputs.into_iter();
        let first = inputs
            .next()
            .ok_or_else(|| EvalError::fault(kind, "expected at least one input"))?;
        let request = match inputs.next() {
            // Literal time/meta answer.
            None => return Ok(first),
            Some(request) => request.into_request(kind)?,
        };
        let raster_request = request.as_raster(kind)?;
        let (bbox, width, height) = raster_request.resolution(kind)?;
        let rows = first.into_features(kind)?;

        let mut grid = RasterGrid::full(1, height, width, self.fill_value());
        for (id, feature) in rows.features.iter() {
            let value = match &self.column {
                None => 1.0,
                Some(column) => feature
                    .properties
                    .get(column)
                    .and_then(|v| v.as_number())
                    .unwrap_or(*id as f64),
            };
            let bounds = match feature.geometry.bounds() {
                Some(bounds) => bounds,
                None => continue,
            };
            for row in 0..height {
                let y = bbox.y2 - (row as f64 + 0.5) * bbox.height() / height as f64;
                for col in 0..width {
                    let x = bbox.x1 + (col as f64 + 0.5) * bbox.width() / width as f64;
                    if bounds.contains_point(x, y) {
                        grid.set(0, row, col, value);
                    }
                }
            }
        }
        Ok(Value::Grid(grid))
    }
}

impl RasterBlock for Rasterize {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn fill_value(&self) -> f64 {
        if self.dtype == Dtype::Bool {
            0.0
        } else {
            self.dtype.max_value()
        }
    }
}

fn single(kind: &'static str, inputs: Vec<Value>) -> Result<Value, EvalError> {
    let mut inputs = inputs.into_iter();
    match (inputs.next(), inputs.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(EvalError::fault(kind, "expected exactly one input")),
    }
}
