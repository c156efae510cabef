// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod blocks; // domain plug-ins (geometry, raster, series)
pub mod config; // settings + path safety
pub mod engine; // the memoizing evaluator
pub mod errors; // error handling
pub mod gis; // collaborator data model
pub mod observability;
pub mod protocol; // request/value grammar
pub mod traits; // the block contract
