// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// The numeric type a raster block declares for its output cells.
///
/// Grids store `f64` internally; the declared dtype drives fill-value
/// selection and the integral-input checks of reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Bool,
    U8,
    U16,
    U32,
    I32,
    F32,
    F64,
}

impl Dtype {
    /// Largest representable value, used as the no-data sentinel for
    /// derived rasters.
    pub fn max_value(&self) -> f64 {
        match self {
            Dtype::Bool => 1.0,
            Dtype::U8 => u8::MAX as f64,
            Dtype::U16 => u16::MAX as f64,
            Dtype::U32 => u32::MAX as f64,
            Dtype::I32 => i32::MAX as f64,
            Dtype::F32 => f32::MAX as f64,
            Dtype::F64 => f64::MAX,
        }
    }

    /// Smallest unsigned dtype that can represent `n_values` distinct
    /// values.
    pub fn smallest_uint(n_values: usize) -> Dtype {
        if n_values <= u8::MAX as usize + 1 {
            Dtype::U8
        } else if n_values <= u16::MAX as usize + 1 {
            Dtype::U16
        } else {
            Dtype::U32
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, Dtype::F32 | Dtype::F64)
    }
}

/// A multi-band numeric grid with a no-data sentinel.
///
/// Shape is `(bands, height, width)`; bands are temporal frames. Cells are
/// stored row-major per band.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub bands: usize,
    pub height: usize,
    pub width: usize,
    pub values: Vec<f64>,
    pub no_data_value: f64,
}

impl RasterGrid {
    pub fn new(
        bands: usize,
        height: usize,
        width: usize,
        values: Vec<f64>,
        no_data_value: f64,
    ) -> Option<Self> {
        (values.len() == bands * height * width).then_some(Self {
            bands,
            height,
            width,
            values,
            no_data_value,
        })
    }

    /// A grid with every cell set to the no-data sentinel.
    pub fn full(bands: usize, height: usize, width: usize, no_data_value: f64) -> Self {
        Self {
            bands,
            height,
            width,
            values: vec![no_data_value; bands * height * width],
            no_data_value,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, band: usize, row: usize, col: usize) -> f64 {
        self.values[(band * self.height + row) * self.width + col]
    }

    pub fn set(&mut self, band: usize, row: usize, col: usize, value: f64) {
        self.values[(band * self.height + row) * self.width + col] = value;
    }

    pub fn is_no_data(&self, value: f64) -> bool {
        value == self.no_data_value
    }

    /// Elementwise transform into a new grid with its own sentinel. The
    /// closure receives each data cell; no-data cells map straight to the
    /// new sentinel.
    pub fn map_cells(&self, no_data_value: f64, f: impl Fn(f64) -> f64) -> RasterGrid {
        let values = self
            .values
            .iter()
            .map(|&v| if self.is_no_data(v) { no_data_value } else { f(v) })
            .collect();
        RasterGrid {
            bands: self.bands,
            height: self.height,
            width: self.width,
            values,
            no_data_value,
        }
    }
}
