// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while composing a block graph.
//!
//! Construction errors are always raised synchronously, before any
//! evaluation takes place. A graph that constructed successfully can still
//! fail at evaluation time, but never because of argument shapes: those are
//! checked here once and for all.

use thiserror::Error;

/// A block was built with invalid arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    /// A semantic constraint on a block argument was violated.
    #[error("block '{kind}': {reason}")]
    InvalidArgument {
        kind: &'static str,
        reason: String,
    },

    /// A named column is not part of the source block's declared column set.
    #[error("block '{kind}': column '{column}' is not available")]
    UnknownColumn {
        kind: &'static str,
        column: String,
    },

    /// A source location escapes the configured file root.
    #[error("source url '{url}' must be a relative path inside the file root")]
    UnsafePath { url: String },
}

impl ConstructionError {
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        ConstructionError::InvalidArgument {
            kind,
            reason: reason.into(),
        }
    }
}
