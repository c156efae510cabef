// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Domain plug-ins satisfying the block operation contract.
//!
//! Every type here implements `plan`/`combine` plus one capability
//! subtrait; the evaluation engine in [`crate::engine`] knows nothing about
//! any of them.

pub mod geometry; // feature sources, set operations, tiled export
pub mod raster; // elementwise raster operations and rasterization
pub mod series; // the scalar-series expression algebra
