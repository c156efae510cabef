// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Evaluation settings threaded explicitly through every evaluation call.
//!
//! Nothing in the engine reads ambient global state: the result-cardinality
//! ceiling, the root for resolving source locations and the scratch space
//! for large exports all travel inside [`Settings`], which is handed to the
//! evaluator at construction and reaches block `plan` implementations
//! through the evaluation scope.
//!
//! Settings are typically loaded from a YAML file:
//!
//! ```yaml
//! geometry_limit: 10000
//! file_root: /data/sources
//! scratch_dir: /tmp/geoblocks
//! max_concurrency: 4
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default ceiling on the number of feature rows a single evaluation may
/// return when the request carries no explicit `limit`.
pub const DEFAULT_GEOMETRY_LIMIT: usize = 10_000;

/// Configuration for the evaluation engine and its collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Row-count ceiling applied when a feature request omits `limit`.
    #[serde(default = "default_geometry_limit")]
    pub geometry_limit: usize,

    /// Root directory that source urls are resolved against.
    #[serde(default = "default_file_root")]
    pub file_root: PathBuf,

    /// Scratch space for assembling large exports. Defaults to the system
    /// temporary directory.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Upper bound on concurrently processed export tiles.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
}

fn default_geometry_limit() -> usize {
    DEFAULT_GEOMETRY_LIMIT
}

fn default_file_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geometry_limit: default_geometry_limit(),
            file_root: default_file_root(),
            scratch_dir: default_scratch_dir(),
            max_concurrency: default_concurrency(),
        }
    }
}

impl Settings {
    /// Clamp degenerate values instead of erroring: a zero limit or zero
    /// concurrency would make every evaluation fail or stall.
    pub fn normalized(mut self) -> Self {
        self.geometry_limit = self.geometry_limit.max(1);
        self.max_concurrency = self.max_concurrency.max(1);
        self
    }
}

/// Load settings from a YAML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let settings: Settings = serde_yaml::from_str(&raw)?;
    Ok(settings.normalized())
}
