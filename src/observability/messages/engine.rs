// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for evaluator lifecycle and cache events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// A top-level evaluation call started.
pub struct EvaluationStarted<'a> {
    pub kind: &'a str,
    pub request: &'a str,
}

impl Display for EvaluationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting evaluation of '{}' for a '{}' request",
            self.kind, self.request
        )
    }
}

impl StructuredLog for EvaluationStarted<'_> {
    fn log(&self) {
        tracing::info!(kind = self.kind, request = self.request, "{}", self);
    }
}

/// A top-level evaluation call completed.
pub struct EvaluationCompleted<'a> {
    pub kind: &'a str,
    pub elapsed: Duration,
    pub cached_entries: usize,
}

impl Display for EvaluationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Evaluation of '{}' completed in {:?} ({} cached entries)",
            self.kind, self.elapsed, self.cached_entries
        )
    }
}

impl StructuredLog for EvaluationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            kind = self.kind,
            elapsed_ms = self.elapsed.as_millis() as u64,
            cached_entries = self.cached_entries,
            "{}",
            self
        );
    }
}

/// A top-level evaluation call failed.
pub struct EvaluationFailed<'a> {
    pub kind: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for EvaluationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Evaluation of '{}' failed: {}", self.kind, self.error)
    }
}

impl StructuredLog for EvaluationFailed<'_> {
    fn log(&self) {
        tracing::error!(kind = self.kind, error = %self.error, "{}", self);
    }
}

/// A cache slot was reused for a structurally equal `(block, request)` key.
pub struct CacheReuse<'a> {
    pub kind: &'a str,
}

impl Display for CacheReuse<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Reusing cached result for '{}'", self.kind)
    }
}

impl StructuredLog for CacheReuse<'_> {
    fn log(&self) {
        tracing::debug!(kind = self.kind, "{}", self);
    }
}
