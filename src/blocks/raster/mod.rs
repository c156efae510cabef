// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod misc;
mod sources;

pub use misc::{Classify, Clip, Mask, MaskBelow, Rasterize, Reclassify, Step};
pub use sources::MemorySource;
