// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod block;

pub use block::{
    Block, BlockRef, BlockToken, GeometryBlock, GeometryRef, PlannedInput, RasterBlock, RasterRef,
    SeriesBlock, SeriesRef,
};
