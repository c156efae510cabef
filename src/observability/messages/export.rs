// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for tiled file export events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// An export run was split into tiles and started.
pub struct ExportStarted<'a> {
    pub target: &'a str,
    pub tiles: usize,
}

impl Display for ExportStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting export to '{}' across {} tile(s)",
            self.target, self.tiles
        )
    }
}

impl StructuredLog for ExportStarted<'_> {
    fn log(&self) {
        tracing::info!(target_path = self.target, tiles = self.tiles, "{}", self);
    }
}

/// An export run finished and the merged file was moved into place.
pub struct ExportCompleted<'a> {
    pub target: &'a str,
    pub features: usize,
}

impl Display for ExportCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Export to '{}' completed with {} feature(s)",
            self.target, self.features
        )
    }
}

impl StructuredLog for ExportCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            target_path = self.target,
            features = self.features,
            "{}",
            self
        );
    }
}
