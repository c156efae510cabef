// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory raster leaf.

use crate::engine::EvalScope;
use crate::errors::{ConstructionError, EvalError};
use crate::gis::{Bbox, Dtype, RasterGrid};
use crate::protocol::{RasterMode, RasterRequest, Request, Value};
use crate::traits::{Block, BlockToken, PlannedInput, RasterBlock};
use async_trait::async_trait;
use std::sync::Arc;

const KIND: &str = "memory_source";

/// A raster leaf holding its cells in memory.
///
/// Each band is one temporal frame with a timestamp from the time axis.
/// `vals` requests are answered by nearest-neighbor sampling of the stored
/// cells onto the requested grid; cells outside the stored extent come back
/// as no-data.
#[derive(Debug)]
pub struct MemorySource {
    grid: RasterGrid,
    extent: Bbox,
    projection: String,
    time: Vec<i64>,
    meta: Vec<Option<String>>,
    dtype: Dtype,
    token: BlockToken,
}

impl MemorySource {
    pub fn new(
        grid: RasterGrid,
        extent: Bbox,
        projection: impl Into<String>,
        time: Vec<i64>,
        meta: Vec<Option<String>>,
        dtype: Dtype,
    ) -> Result<Arc<Self>, ConstructionError> {
        if !extent.is_valid() {
            return Err(ConstructionError::invalid(KIND, "extent box is reversed"));
        }
        if time.len() != grid.bands {
            return Err(ConstructionError::invalid(
                KIND,
                format!(
                    "time axis has {} entries for {} band(s)",
                    time.len(),
                    grid.bands
                ),
            ));
        }
        if meta.len() != grid.bands {
            return Err(ConstructionError::invalid(
                KIND,
                format!(
                    "meta has {} entries for {} band(s)",
                    meta.len(),
                    grid.bands
                ),
            ));
        }
        let projection = projection.into();

        let mut parts = vec![
            projection.clone(),
            format!("{:?}", dtype),
            format!(
                "{},{},{},{}",
                extent.x1, extent.y1, extent.x2, extent.y2
            ),
            format!("{}x{}x{}", grid.bands, grid.height, grid.width),
            format!("{}", grid.no_data_value),
        ];
        parts.extend(time.iter().map(|t| t.to_string()));
        parts.extend(grid.values.iter().map(|v| v.to_string()));
        let token = BlockToken::compose(KIND, parts);

        Ok(Arc::new(Self {
            grid,
            extent,
            projection,
            time,
            meta,
            dtype,
            token,
        }))
    }

    /// Band indices whose timestamp falls inside the request window.
    fn bands_for(&self, request: &RasterRequest) -> Vec<usize> {
        self.time
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                request.start.map_or(true, |s| **t >= s) && request.stop.map_or(true, |s| **t <= s)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn sample(&self, request: &RasterRequest) -> Result<RasterGrid, EvalError> {
        let (bbox, width, height) = request.resolution(KIND)?;
        if let Some(projection) = &request.projection {
            if *projection != self.projection {
                return Err(EvalError::request(
                    KIND,
                    format!(
                        "stored projection '{}' does not match requested '{}'",
                        self.projection, projection
                    ),
                ));
            }
        }
        let bands = self.bands_for(request);
        let mut out = RasterGrid::full(bands.len(), height, width, self.grid.no_data_value);
        for (out_band, &src_band) in bands.iter().enumerate() {
            for row in 0..height {
                for col in 0..width {
                    let x = bbox.x1 + (col as f64 + 0.5) * bbox.width() / width as f64;
                    let y = bbox.y2 - (row as f64 + 0.5) * bbox.height() / height as f64;
                    if !self.extent.contains_point(x, y) {
                        continue;
                    }
                    let src_col = (((x - self.extent.x1) / self.extent.width())
                        * self.grid.width as f64)
                        .floor()
                        .min(self.grid.width as f64 - 1.0)
                        .max(0.0) as usize;
                    let src_row = (((self.extent.y2 - y) / self.extent.height())
                        * self.grid.height as f64)
                        .floor()
                        .min(self.grid.height as f64 - 1.0)
                        .max(0.0) as usize;
                    out.set(out_band, row, col, self.grid.get(src_band, src_row, src_col));
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Block for MemorySource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_raster(KIND)?;
        Ok(vec![PlannedInput::literal(Value::Request(request.clone()))])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let request = inputs
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::fault(KIND, "expected one literal input"))?
            .into_request(KIND)?;
        let request = request.as_raster(KIND)?;
        match request.mode {
            RasterMode::Vals => Ok(Value::Grid(self.sample(request)?)),
            RasterMode::Time => {
                let bands = self.bands_for(request);
                Ok(Value::Time(bands.iter().map(|&i| self.time[i]).collect()))
            }
            RasterMode::Meta => {
                let bands = self.bands_for(request);
                Ok(Value::Meta(
                    bands.iter().map(|&i| self.meta[i].clone()).collect(),
                ))
            }
        }
    }
}

impl RasterBlock for MemorySource {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn fill_value(&self) -> f64 {
        self.grid.no_data_value
    }

    fn extent(&self) -> Option<Bbox> {
        Some(self.extent)
    }

    fn period(&self) -> Option<(i64, i64)> {
        match (self.time.first(), self.time.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }
}
